//! ISBN-10 / ISBN-13 validation and conversion

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IsbnError {
    #[error("Invalid ISBN: {0:?} is not 10 or 13 characters long")]
    BadLength(String),
    #[error("Invalid ISBN: {0:?} contains non-digit characters")]
    BadCharacters(String),
    #[error("Invalid ISBN: {0:?} fails its checksum")]
    BadChecksum(String),
    #[error("Invalid ISBN: {0:?} has no 978/979 prefix")]
    BadPrefix(String),
}

/// A checksum-validated ISBN in its normalized form (no hyphens or spaces)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Isbn {
    Ten(String),
    Thirteen(String),
}

impl Isbn {
    pub fn as_str(&self) -> &str {
        match self {
            Isbn::Ten(s) | Isbn::Thirteen(s) => s,
        }
    }

    /// Both forms of this ISBN as `(isbn10, isbn13)`.
    ///
    /// 979-prefixed ISBN-13s have no ISBN-10 counterpart.
    pub fn pair(&self) -> (Option<String>, Option<String>) {
        match self {
            Isbn::Ten(s) => (Some(s.clone()), Some(to_isbn13(s))),
            Isbn::Thirteen(s) => (to_isbn10(s), Some(s.clone())),
        }
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip whitespace and hyphens, uppercase the ISBN-10 `X` check digit
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Parse and validate an ISBN in either format
pub fn parse(raw: &str) -> Result<Isbn, IsbnError> {
    let s = normalize(raw);
    if !s.is_ascii() {
        return Err(IsbnError::BadCharacters(s));
    }
    match s.len() {
        10 => {
            let (body, check) = s.split_at(9);
            if !body.chars().all(|c| c.is_ascii_digit())
                || !(check == "X" || check.chars().all(|c| c.is_ascii_digit()))
            {
                return Err(IsbnError::BadCharacters(s));
            }
            if isbn10_check_digit(body) != check.chars().next().unwrap_or(' ') {
                return Err(IsbnError::BadChecksum(s));
            }
            Ok(Isbn::Ten(s))
        }
        13 => {
            if !s.chars().all(|c| c.is_ascii_digit()) {
                return Err(IsbnError::BadCharacters(s));
            }
            if !(s.starts_with("978") || s.starts_with("979")) {
                return Err(IsbnError::BadPrefix(s));
            }
            if !ean13_checksum_ok(&s) {
                return Err(IsbnError::BadChecksum(s));
            }
            Ok(Isbn::Thirteen(s))
        }
        _ => Err(IsbnError::BadLength(s)),
    }
}

/// Convert a valid ISBN-10 into its 978-prefixed ISBN-13
pub fn to_isbn13(isbn10: &str) -> String {
    let body = format!("978{}", &isbn10[..9]);
    let check = ean13_check_digit(&body);
    format!("{}{}", body, check)
}

/// Convert a valid ISBN-13 into an ISBN-10, if it has one
pub fn to_isbn10(isbn13: &str) -> Option<String> {
    if !isbn13.starts_with("978") || isbn13.len() != 13 {
        return None;
    }
    let body = &isbn13[3..12];
    Some(format!("{}{}", body, isbn10_check_digit(body)))
}

/// True for a 13-digit EAN with an ISBN prefix and a valid check digit
pub fn is_isbn13_barcode(code: &str) -> bool {
    matches!(parse(code), Ok(Isbn::Thirteen(ref s)) if s == code)
}

/// Check digit for the 12-digit body of an EAN-13
pub fn ean13_check_digit(body: &str) -> char {
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    char::from_digit((10 - sum % 10) % 10, 10).unwrap_or('0')
}

/// Verify the check digit of a 13-digit EAN
pub fn ean13_checksum_ok(code: &str) -> bool {
    code.len() == 13
        && code.chars().all(|c| c.is_ascii_digit())
        && code[12..].starts_with(ean13_check_digit(&code[..12]))
}

fn isbn10_check_digit(body: &str) -> char {
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| (10 - i as u32) * d)
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_noise() {
        assert_eq!(normalize(" 0-306-40615-2 "), "0306406152");
        assert_eq!(normalize("0-8044-2957-x"), "080442957X");
    }

    #[test]
    fn test_parse_isbn10() {
        assert_eq!(parse("0-306-40615-2"), Ok(Isbn::Ten("0306406152".to_string())));
        assert_eq!(parse("080442957x"), Ok(Isbn::Ten("080442957X".to_string())));
    }

    #[test]
    fn test_parse_isbn13() {
        assert_eq!(
            parse("978-0-306-40615-7"),
            Ok(Isbn::Thirteen("9780306406157".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(parse("12345"), Err(IsbnError::BadLength(_))));
        assert!(matches!(parse("0306406153"), Err(IsbnError::BadChecksum(_))));
        assert!(matches!(parse("9780306406158"), Err(IsbnError::BadChecksum(_))));
        assert!(matches!(parse("4006381333931"), Err(IsbnError::BadPrefix(_))));
        assert!(matches!(parse("03064X6152"), Err(IsbnError::BadCharacters(_))));
    }

    #[test]
    fn test_parse_rejects_non_ascii() {
        assert_eq!(
            parse("12345678é"),
            Err(IsbnError::BadCharacters("12345678é".to_string()))
        );
        assert!(matches!(parse("97803064061é"), Err(IsbnError::BadCharacters(_))));
        assert!(matches!(parse("０３０６４０６１５２"), Err(IsbnError::BadCharacters(_))));
    }

    #[test]
    fn test_convert_between_forms() {
        assert_eq!(to_isbn13("0306406152"), "9780306406157");
        assert_eq!(to_isbn10("9780306406157"), Some("0306406152".to_string()));
        assert_eq!(to_isbn13("080442957X"), "9780804429573");
        assert_eq!(to_isbn10("9780804429573"), Some("080442957X".to_string()));
    }

    #[test]
    fn test_979_has_no_isbn10() {
        let isbn = parse("9791090636071").unwrap();
        assert_eq!(isbn.pair(), (None, Some("9791090636071".to_string())));
    }

    #[test]
    fn test_pair_from_isbn10() {
        let isbn = parse("0306406152").unwrap();
        assert_eq!(
            isbn.pair(),
            (Some("0306406152".to_string()), Some("9780306406157".to_string()))
        );
    }

    #[test]
    fn test_is_isbn13_barcode() {
        assert!(is_isbn13_barcode("9780306406157"));
        assert!(!is_isbn13_barcode("4006381333931")); // EAN-13, not a book
        assert!(!is_isbn13_barcode("978-0306406157"));
    }
}
