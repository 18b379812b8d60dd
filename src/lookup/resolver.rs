//! Multi-source book resolution
//!
//! Given a noisy list of ISBNs and/or a title, query the bibliographic
//! sources in order of trust and fall back to weaker strategies (related
//! editions, title discovery) only when the direct lookups come up empty.

use anyhow::Result;
use tracing::{debug, info};

use crate::isbn::{self, Isbn};
use crate::lookup::merge::{dedupe_and_sort, stamp_isbn, titles_match};
use crate::lookup::BookCandidate;

/// The outside world as seen by the resolver
#[allow(async_fn_in_trait)]
pub trait BookSource {
    /// Primary volume search by ISBN and/or title
    async fn search_volumes(
        &self,
        isbn: Option<&str>,
        title: Option<&str>,
    ) -> Result<Vec<BookCandidate>>;

    /// Second direct source consulted when the primary has nothing for an ISBN
    async fn search_secondary(&self, isbn: &str) -> Result<Vec<BookCandidate>>;

    /// ISBNs of other editions of the same work
    async fn related_isbns(&self, isbn: &str) -> Result<Vec<String>>;

    /// A plausible title for an ISBN, discovered from listings
    async fn title_for_isbn(&self, isbn: &str) -> Result<Option<String>>;
}

/// Books found plus the per-ISBN failures that did not stop the search
#[derive(Debug, Default)]
pub struct FindOutcome {
    pub books: Vec<BookCandidate>,
    pub errors: Vec<String>,
}

pub struct BookFinder<S> {
    source: S,
}

impl<S: BookSource> BookFinder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Look up books by candidate ISBNs and an optional title.
    ///
    /// With `direct_search_only`, related-edition and title-discovery
    /// fallbacks are skipped for ISBNs.
    pub async fn find_books(
        &self,
        isbns: &[String],
        title: Option<&str>,
        direct_search_only: bool,
    ) -> FindOutcome {
        let mut outcome = FindOutcome::default();
        let mut found = Vec::new();

        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            match self.lookup_by_title(title).await {
                Ok(books) => found.extend(books),
                Err(e) => outcome.errors.push(timestamped(&format!("{:#}", e))),
            }
        }

        let mut seen = Vec::new();
        for raw in isbns {
            if raw.trim().is_empty() {
                continue;
            }
            let isbn = match isbn::parse(raw) {
                Ok(isbn) => isbn,
                Err(e) => {
                    outcome.errors.push(timestamped(&e.to_string()));
                    continue;
                }
            };
            if seen.contains(&isbn) {
                continue;
            }
            seen.push(isbn.clone());

            match self.resolve_isbn(&isbn, direct_search_only).await {
                Ok(books) => found.extend(books),
                Err(e) => outcome
                    .errors
                    .push(timestamped(&format!("{}: {:#}", isbn, e))),
            }
        }

        outcome.books = dedupe_and_sort(found);
        outcome
    }

    async fn resolve_isbn(&self, isbn: &Isbn, direct_search_only: bool) -> Result<Vec<BookCandidate>> {
        let code = isbn.as_str();

        let mut results = self.source.search_volumes(Some(code), None).await?;

        if results.is_empty() {
            debug!("{}: nothing from primary source, trying secondary", code);
            results = self.source.search_secondary(code).await?;
        }

        if !direct_search_only && results.is_empty() {
            results = self.lookup_by_related_isbn(isbn).await?;

            if results.is_empty() {
                if let Some(title) = self.source.title_for_isbn(code).await? {
                    info!("{}: searching by discovered title {:?}", code, title);
                    results = self.lookup_by_title(&title).await?;
                }
            }
        }

        for book in &mut results {
            stamp_isbn(book, isbn);
        }
        Ok(results)
    }

    /// Search the primary source for each related edition, stopping at the
    /// first one that yields results
    async fn lookup_by_related_isbn(&self, isbn: &Isbn) -> Result<Vec<BookCandidate>> {
        let related = self.source.related_isbns(isbn.as_str()).await?;
        let (isbn10, isbn13) = isbn.pair();

        for candidate in related {
            let candidate = isbn::normalize(&candidate);
            if Some(&candidate) == isbn10.as_ref() || Some(&candidate) == isbn13.as_ref() {
                continue;
            }
            let results = self.source.search_volumes(Some(&candidate), None).await?;
            if !results.is_empty() {
                debug!("{}: found via related ISBN {}", isbn, candidate);
                return Ok(results);
            }
        }

        Ok(Vec::new())
    }

    /// Search by title and drop results whose title does not match the query
    pub async fn lookup_by_title(&self, title: &str) -> Result<Vec<BookCandidate>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.source.search_volumes(None, Some(title)).await?;
        Ok(results
            .into_iter()
            .filter(|book| titles_match(&book.title, title))
            .collect())
    }
}

fn timestamped(message: &str) -> String {
    format!(
        "{} - {}",
        chrono::Local::now().format("%Y-%m-%d_%H:%M:%S"),
        message
    )
}
