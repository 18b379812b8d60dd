//! Reconciliation of candidates returned by different sources

use crate::isbn::Isbn;
use crate::lookup::BookCandidate;

/// Lowercase a title and drop everything that is neither a word character
/// nor whitespace, so "The Gruffalo's Child!" matches "the gruffalos child"
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// True when either normalized title contains the other
pub fn titles_match(found: &str, wanted: &str) -> bool {
    let found = normalize_title(found);
    let wanted = normalize_title(wanted);
    found.contains(&wanted) || wanted.contains(&found)
}

/// Force the candidate to carry the ISBN it was looked up with
pub fn stamp_isbn(candidate: &mut BookCandidate, isbn: &Isbn) {
    let (isbn10, isbn13) = isbn.pair();
    candidate.isbn10 = isbn10;
    candidate.isbn13 = isbn13;
}

fn dedupe_key(candidate: &BookCandidate) -> (String, Option<String>) {
    (
        normalize_title(candidate.title.trim()),
        candidate
            .isbn13
            .clone()
            .or_else(|| candidate.isbn10.clone()),
    )
}

/// Collapse duplicate candidates and order them by title.
///
/// Duplicates share a normalized title and an ISBN. The first occurrence
/// wins; its empty fields are filled from later ones and author/category
/// lists are unioned.
pub fn dedupe_and_sort(candidates: Vec<BookCandidate>) -> Vec<BookCandidate> {
    let mut merged: Vec<BookCandidate> = Vec::new();

    for candidate in candidates {
        let key = dedupe_key(&candidate);
        match merged.iter().position(|m| dedupe_key(m) == key) {
            Some(pos) => absorb(&mut merged[pos], candidate),
            None => merged.push(candidate),
        }
    }

    // stable sort: equal titles keep arrival order
    merged.sort_by_key(|b| b.title.to_lowercase());
    merged
}

fn absorb(into: &mut BookCandidate, from: BookCandidate) {
    fn fill(slot: &mut Option<String>, value: Option<String>) {
        if slot.is_none() {
            *slot = value;
        }
    }

    fill(&mut into.description, from.description);
    fill(&mut into.isbn10, from.isbn10);
    fill(&mut into.isbn13, from.isbn13);
    fill(&mut into.thumbnail_url, from.thumbnail_url);
    fill(&mut into.preview_url, from.preview_url);

    for author in from.authors {
        if !into.authors.contains(&author) {
            into.authors.push(author);
        }
    }
    for category in from.categories {
        if !into.categories.contains(&category) {
            into.categories.push(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isbn;

    fn candidate(title: &str, isbn13: Option<&str>) -> BookCandidate {
        BookCandidate {
            source: "test".to_string(),
            title: title.to_string(),
            isbn13: isbn13.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("The Gruffalo's Child!"), "the gruffalos child");
        assert_eq!(normalize_title("Stick-Man"), "stickman");
    }

    #[test]
    fn test_titles_match_both_directions() {
        assert!(titles_match("The Gruffalo", "gruffalo"));
        assert!(titles_match("Gruffalo", "The Gruffalo: 20th Anniversary"));
        assert!(!titles_match("Zog", "The Gruffalo"));
    }

    #[test]
    fn test_stamp_isbn_from_isbn10() {
        let mut book = candidate("Dune", Some("9999999999999"));
        let isbn = isbn::parse("0441172717").unwrap();
        stamp_isbn(&mut book, &isbn);
        assert_eq!(book.isbn10.as_deref(), Some("0441172717"));
        assert_eq!(book.isbn13.as_deref(), Some("9780441172719"));
    }

    #[test]
    fn test_dedupe_merges_fields() {
        let mut first = candidate("The Gruffalo", Some("9781509804757"));
        first.authors = vec!["Julia Donaldson".to_string()];

        let mut second = candidate("the gruffalo", Some("9781509804757"));
        second.description = Some("A mouse took a stroll.".to_string());
        second.authors = vec![
            "Julia Donaldson".to_string(),
            "Axel Scheffler".to_string(),
        ];

        let result = dedupe_and_sort(vec![first, second]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "The Gruffalo");
        assert_eq!(
            result[0].description.as_deref(),
            Some("A mouse took a stroll.")
        );
        assert_eq!(result[0].authors, vec!["Julia Donaldson", "Axel Scheffler"]);
    }

    #[test]
    fn test_dedupe_keeps_different_editions() {
        let result = dedupe_and_sort(vec![
            candidate("The Gruffalo", Some("9781509804757")),
            candidate("The Gruffalo", Some("9780333710937")),
        ]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_sorted_by_title_case_insensitive() {
        let result = dedupe_and_sort(vec![
            candidate("zog", None),
            candidate("Room on the Broom", None),
            candidate("Akimbo", None),
        ]);
        let titles: Vec<&str> = result.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Akimbo", "Room on the Broom", "zog"]);
    }
}
