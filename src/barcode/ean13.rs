//! Scanline EAN-13 decoder
//!
//! Each sampled row is binarized, run-length encoded and searched for the
//! 59-run EAN-13 layout: start guard (3), six left digits (4 each), middle
//! guard (5), six right digits (4 each), end guard (3).

use image::GrayImage;

use crate::isbn::ean13_checksum_ok;

/// Module widths of the L-code digits, starting with a space.
/// G-codes are these reversed; R-codes share them but start with a bar.
const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// L/G parity of the six left digits, indexed by the implied first digit
const FIRST_DIGIT_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

const SYMBOL_RUNS: usize = 59;
const MIN_ROW_CONTRAST: u8 = 32;
const MAX_DIGIT_ERROR: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Run {
    dark: bool,
    len: u32,
}

/// Decode every distinct EAN-13 symbol visible in the image
pub fn decode(image: &GrayImage) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();

    for y in sample_rows(image.height()) {
        let mut row: Vec<u8> = (0..image.width())
            .map(|x| image.get_pixel(x, y).0[0])
            .collect();

        for _ in 0..2 {
            if let Some(code) = decode_row(&row) {
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
            // Upside-down symbols read correctly right to left
            row.reverse();
        }
    }

    codes
}

/// Row indices starting at the vertical centre and moving outwards
fn sample_rows(height: u32) -> Vec<u32> {
    if height == 0 {
        return Vec::new();
    }
    let centre = height / 2;
    let step = (height / 24).max(1);

    let mut rows = vec![centre];
    let mut offset = step;
    while offset <= centre {
        rows.push(centre - offset);
        if centre + offset < height {
            rows.push(centre + offset);
        }
        offset += step;
    }
    rows
}

fn decode_row(row: &[u8]) -> Option<String> {
    let runs = binarize(row)?;
    if runs.len() < SYMBOL_RUNS {
        return None;
    }

    for start in 0..=runs.len() - SYMBOL_RUNS {
        if !runs[start].dark {
            continue;
        }
        let segment = &runs[start..start + SYMBOL_RUNS];
        let Some(module) = guard_module(&segment[..3]) else {
            continue;
        };

        // A symbol needs some light quiet zone before its start guard
        if start > 0 && (runs[start - 1].len as f32) < 2.0 * module {
            continue;
        }
        if let Some(code) = decode_segment(segment, module) {
            return Some(code);
        }
    }
    None
}

/// Threshold the row at the midpoint of its luminance range and
/// run-length encode it
fn binarize(row: &[u8]) -> Option<Vec<Run>> {
    let min = *row.iter().min()?;
    let max = *row.iter().max()?;
    if max - min < MIN_ROW_CONTRAST {
        return None;
    }
    let threshold = ((min as u16 + max as u16 + 1) / 2) as u8;

    let mut runs: Vec<Run> = Vec::new();
    for &value in row {
        let dark = value < threshold;
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.len += 1,
            _ => runs.push(Run { dark, len: 1 }),
        }
    }
    Some(runs)
}

fn guard_module(guard: &[Run]) -> Option<f32> {
    let total: u32 = guard.iter().map(|r| r.len).sum();
    let module = total as f32 / guard.len() as f32;
    if module <= 0.0 {
        return None;
    }
    Some(module)
}

fn within(total: u32, modules: f32, module: f32) -> bool {
    let ratio = total as f32 / (modules * module);
    (0.6..=1.4).contains(&ratio)
}

/// Guard bars and spaces are one module wide, give or take a pixel of blur
fn guard_ok(runs: &[Run], module: f32) -> bool {
    runs.iter().all(|r| {
        let len = r.len as f32;
        len >= 0.5 * module - 1.0 && len <= 1.5 * module + 1.0
    })
}

fn decode_segment(segment: &[Run], module: f32) -> Option<String> {
    if !guard_ok(&segment[..3], module) {
        return None;
    }

    let mut digits = String::with_capacity(13);
    let mut parity = String::with_capacity(6);

    for i in 0..6 {
        let widths = &segment[3 + i * 4..7 + i * 4];
        if !within(widths.iter().map(|r| r.len).sum(), 7.0, module) {
            return None;
        }
        let (digit, is_g) = match_left_digit(widths)?;
        digits.push(char::from(b'0' + digit));
        parity.push(if is_g { 'G' } else { 'L' });
    }

    let middle: u32 = segment[27..32].iter().map(|r| r.len).sum();
    if !within(middle, 5.0, module) {
        return None;
    }

    for i in 0..6 {
        let widths = &segment[32 + i * 4..36 + i * 4];
        if !within(widths.iter().map(|r| r.len).sum(), 7.0, module) {
            return None;
        }
        let digit = best_match(widths, L_PATTERNS.iter().copied())?;
        digits.push(char::from(b'0' + digit));
    }

    if !guard_ok(&segment[56..59], module) {
        return None;
    }

    let first = FIRST_DIGIT_PARITY.iter().position(|p| *p == parity)?;
    let code = format!("{}{}", first, digits);

    if ean13_checksum_ok(&code) {
        Some(code)
    } else {
        None
    }
}

/// Returns the digit and whether it was G-coded
fn match_left_digit(widths: &[Run]) -> Option<(u8, bool)> {
    let l = best_match_with_error(widths, L_PATTERNS.iter().copied());
    let g = best_match_with_error(widths, L_PATTERNS.iter().map(reversed));

    match (l, g) {
        (Some((ld, le)), Some((gd, ge))) => {
            if le <= ge {
                Some((ld, false))
            } else {
                Some((gd, true))
            }
        }
        (Some((ld, _)), None) => Some((ld, false)),
        (None, Some((gd, _))) => Some((gd, true)),
        (None, None) => None,
    }
}

fn reversed(pattern: &[u8; 4]) -> [u8; 4] {
    [pattern[3], pattern[2], pattern[1], pattern[0]]
}

fn best_match(widths: &[Run], patterns: impl Iterator<Item = [u8; 4]>) -> Option<u8> {
    best_match_with_error(widths, patterns).map(|(digit, _)| digit)
}

/// Least-squared-error match of four run widths, scaled to 7 modules,
/// against each digit pattern
fn best_match_with_error(
    widths: &[Run],
    patterns: impl Iterator<Item = [u8; 4]>,
) -> Option<(u8, f32)> {
    let total: u32 = widths.iter().map(|r| r.len).sum();
    if total == 0 {
        return None;
    }
    let scale = 7.0 / total as f32;

    let mut best: Option<(u8, f32)> = None;
    for (digit, pattern) in patterns.enumerate() {
        let error: f32 = widths
            .iter()
            .zip(pattern.iter())
            .map(|(run, &p)| {
                let diff = run.len as f32 * scale - p as f32;
                diff * diff
            })
            .sum();
        if best.map_or(true, |(_, e)| error < e) {
            best = Some((digit as u8, error));
        }
    }

    best.filter(|(_, error)| *error <= MAX_DIGIT_ERROR)
}

/// Draw an EAN-13 symbol with a 10-module quiet zone on each side
#[cfg(test)]
pub(crate) fn render(code: &str, module: u32, height: u32, ink: u8, paper: u8) -> GrayImage {
    let digits: Vec<usize> = code
        .chars()
        .map(|c| c.to_digit(10).unwrap() as usize)
        .collect();
    assert_eq!(digits.len(), 13);

    let mut bits: Vec<bool> = Vec::new();
    let push_widths = |bits: &mut Vec<bool>, widths: [u8; 4], starts_dark: bool| {
        for (j, &w) in widths.iter().enumerate() {
            let dark = (j % 2 == 0) == starts_dark;
            bits.extend(std::iter::repeat(dark).take(w as usize));
        }
    };

    bits.extend([false; 10]);
    bits.extend([true, false, true]);
    let parity = FIRST_DIGIT_PARITY[digits[0]].as_bytes();
    for i in 0..6 {
        let pattern = L_PATTERNS[digits[i + 1]];
        let widths = if parity[i] == b'G' {
            reversed(&pattern)
        } else {
            pattern
        };
        push_widths(&mut bits, widths, false);
    }
    bits.extend([false, true, false, true, false]);
    for i in 0..6 {
        push_widths(&mut bits, L_PATTERNS[digits[i + 7]], true);
    }
    bits.extend([true, false, true]);
    bits.extend([false; 10]);

    GrayImage::from_fn(bits.len() as u32 * module, height, |x, _| {
        image::Luma([if bits[(x / module) as usize] { ink } else { paper }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops;

    #[test]
    fn test_rendered_symbol_is_95_modules() {
        let image = render("9780306406157", 1, 1, 0, 255);
        assert_eq!(image.width(), 95 + 20);
    }

    #[test]
    fn test_decode_clean_symbol() {
        let image = render("9780306406157", 3, 60, 0, 255);
        assert_eq!(decode(&image), vec!["9780306406157"]);
    }

    #[test]
    fn test_decode_every_first_digit() {
        // One valid code per leading digit exercises every parity pattern
        for body in [
            "012345678901", "123456789012", "234567890123", "345678901234",
            "456789012345", "567890123456", "678901234567", "789012345678",
            "890123456789", "901234567890",
        ] {
            let code = format!("{}{}", body, crate::isbn::ean13_check_digit(body));
            let image = render(&code, 2, 20, 0, 255);
            assert_eq!(decode(&image), vec![code.clone()], "failed for {}", code);
        }
    }

    #[test]
    fn test_decode_upside_down() {
        let image = render("9780441172719", 3, 40, 0, 255);
        let flipped = imageops::rotate180(&image);
        assert_eq!(decode(&flipped), vec!["9780441172719"]);
    }

    #[test]
    fn test_decode_with_margin_and_noise_rows() {
        let symbol = render("9781509804757", 2, 30, 20, 230);
        let mut canvas = GrayImage::from_pixel(symbol.width() + 80, 90, image::Luma([230]));
        imageops::overlay(&mut canvas, &symbol, 40, 30);
        assert_eq!(decode(&canvas), vec!["9781509804757"]);
    }

    #[test]
    fn test_blank_and_low_contrast_rows_decode_nothing() {
        assert!(decode(&GrayImage::from_pixel(200, 50, image::Luma([255]))).is_empty());
        let faint = render("9780306406157", 3, 30, 120, 140);
        assert!(decode(&faint).is_empty());
    }

    #[test]
    fn test_bad_checksum_is_rejected() {
        // Valid symbology, wrong check digit
        let image = render("9780306406158", 3, 30, 0, 255);
        assert!(decode(&image).is_empty());
    }

    #[test]
    fn test_sample_rows_start_at_centre() {
        let rows = sample_rows(48);
        assert_eq!(rows[0], 24);
        assert_eq!(rows[1], 22);
        assert_eq!(rows[2], 26);
        assert!(rows.iter().all(|&r| r < 48));
        assert!(sample_rows(0).is_empty());
        assert_eq!(sample_rows(1), vec![0]);
    }
}
