use anyhow::{bail, Context, Result};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::LibraryDb;
use crate::circulation::BookLocation;
use crate::lookup::BookCandidate;

pub(super) const BOOK_SELECT: &str = r#"
    SELECT b.id, b.isbn10, b.isbn13, b.title, b.description,
           b.thumbnail_url, b.preview_url, r.level, b.current_location
    FROM books b
    LEFT JOIN reading_levels r ON r.id = b.reading_level_id
"#;

/// A book held by the library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
    pub id: i64,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub preview_url: Option<String>,
    pub reading_level: Option<String>,
    pub location: BookLocation,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingLevel {
    pub id: i64,
    pub level: String,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
}

impl LibraryDb {
    /// Store a resolved book, creating its authors and categories as needed
    pub fn add_book(&mut self, book: &BookCandidate) -> Result<i64> {
        if book.title.trim().is_empty() {
            bail!("A book needs a title");
        }
        for isbn in [&book.isbn10, &book.isbn13].into_iter().flatten() {
            if let Some(existing) = self.find_book_by_isbn(isbn)? {
                bail!(
                    "ISBN {} is already in the library as book {} ({})",
                    isbn,
                    existing.id,
                    existing.title
                );
            }
        }

        self.transaction(|db| {
            let now = chrono::Utc::now().to_rfc3339();
            db.conn
                .execute(
                    r#"
                INSERT INTO books (isbn10, isbn13, title, description,
                                   thumbnail_url, preview_url, current_location, added_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                    params![
                        book.isbn10,
                        book.isbn13,
                        book.title.trim(),
                        book.description,
                        book.thumbnail_url,
                        book.preview_url,
                        BookLocation::Library,
                        now,
                    ],
                )
                .context("Failed to insert book")?;
            let book_id = db.conn.last_insert_rowid();

            for (position, name) in book.authors.iter().enumerate() {
                let author_id = db.get_or_create("authors", name)?;
                db.conn.execute(
                    "INSERT OR IGNORE INTO book_authors (book_id, author_id, position) VALUES (?1, ?2, ?3)",
                    params![book_id, author_id, position as i64],
                )?;
            }
            for (position, name) in book.categories.iter().enumerate() {
                let category_id = db.get_or_create("categories", name)?;
                db.conn.execute(
                    "INSERT OR IGNORE INTO book_categories (book_id, category_id, position) VALUES (?1, ?2, ?3)",
                    params![book_id, category_id, position as i64],
                )?;
            }

            Ok(book_id)
        })
    }

    fn get_or_create(&self, table: &str, name: &str) -> Result<i64> {
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table),
            params![name],
        )?;
        self.conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", table),
                params![name],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to look up {} entry {:?}", table, name))
    }

    pub fn get_book(&self, id: i64) -> Result<Option<BookRecord>> {
        let sql = format!("{} WHERE b.id = ?1", BOOK_SELECT);
        let book = self
            .conn
            .query_row(&sql, params![id], row_to_book)
            .optional()
            .context("Failed to query book")?;
        book.map(|b| self.with_people(b)).transpose()
    }

    /// Find a book by either of its ISBNs
    pub fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>> {
        let sql = format!("{} WHERE b.isbn10 = ?1 OR b.isbn13 = ?1", BOOK_SELECT);
        let book = self
            .conn
            .query_row(&sql, params![isbn], row_to_book)
            .optional()
            .context("Failed to query book by ISBN")?;
        book.map(|b| self.with_people(b)).transpose()
    }

    /// One page of the catalogue, ordered by title
    pub fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<BookRecord>> {
        let sql = format!(
            "{} ORDER BY b.title COLLATE NOCASE, b.id LIMIT ?1 OFFSET ?2",
            BOOK_SELECT
        );
        self.collect_books(&sql, params![limit, offset])
    }

    pub fn count_books(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .context("Failed to count books")
    }

    /// Free-text search over titles, descriptions, ISBNs, authors and categories
    pub fn search_books(&self, text: &str) -> Result<Vec<BookRecord>> {
        let sql = format!(
            r#"{}
            WHERE b.title LIKE ?1 OR b.description LIKE ?1
               OR b.isbn10 LIKE ?1 OR b.isbn13 LIKE ?1
               OR b.id IN (SELECT ba.book_id FROM book_authors ba
                           JOIN authors a ON a.id = ba.author_id WHERE a.name LIKE ?1)
               OR b.id IN (SELECT bc.book_id FROM book_categories bc
                           JOIN categories c ON c.id = bc.category_id WHERE c.name LIKE ?1)
            ORDER BY b.title COLLATE NOCASE, b.id
            "#,
            BOOK_SELECT
        );
        let pattern = format!("%{}%", text.trim());
        self.collect_books(&sql, params![pattern])
    }

    /// Every title, category and author name, for search suggestions
    pub fn search_terms(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title FROM books
            UNION SELECT name FROM categories
            UNION SELECT name FROM authors
            ORDER BY 1 COLLATE NOCASE
            "#,
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>()
            .context("Failed to collect search terms")
    }

    pub fn set_book_location(&self, book_id: i64, location: BookLocation) -> Result<()> {
        self.conn
            .execute(
                "UPDATE books SET current_location = ?1 WHERE id = ?2",
                params![location, book_id],
            )
            .context("Failed to update book location")?;
        Ok(())
    }

    pub fn set_reading_level(&self, book_id: i64, level: &str) -> Result<()> {
        let level_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM reading_levels WHERE level = ?1",
                params![level],
                |row| row.get(0),
            )
            .optional()?;
        let Some(level_id) = level_id else {
            bail!("Unknown reading level: {}", level);
        };

        let updated = self.conn.execute(
            "UPDATE books SET reading_level_id = ?1 WHERE id = ?2",
            params![level_id, book_id],
        )?;
        if updated == 0 {
            bail!("No book with id {}", book_id);
        }
        Ok(())
    }

    pub fn add_reading_level(
        &self,
        level: &str,
        age_min: Option<i64>,
        age_max: Option<i64>,
    ) -> Result<i64> {
        if let (Some(min), Some(max)) = (age_min, age_max) {
            if min > max {
                bail!("Minimum age {} is above maximum age {}", min, max);
            }
        }
        self.conn
            .execute(
                "INSERT INTO reading_levels (level, age_min, age_max) VALUES (?1, ?2, ?3)",
                params![level, age_min, age_max],
            )
            .with_context(|| format!("Failed to add reading level {:?}", level))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_reading_levels(&self) -> Result<Vec<ReadingLevel>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, level, age_min, age_max FROM reading_levels ORDER BY age_min, level",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReadingLevel {
                id: row.get(0)?,
                level: row.get(1)?,
                age_min: row.get(2)?,
                age_max: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to collect reading levels")
    }

    pub(super) fn collect_books(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let books = stmt
            .query_map(params, row_to_book)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect books")?;
        books.into_iter().map(|b| self.with_people(b)).collect()
    }

    fn with_people(&self, mut book: BookRecord) -> Result<BookRecord> {
        book.authors = self.names_for(
            "SELECT a.name FROM book_authors ba JOIN authors a ON a.id = ba.author_id
             WHERE ba.book_id = ?1 ORDER BY ba.position",
            book.id,
        )?;
        book.categories = self.names_for(
            "SELECT c.name FROM book_categories bc JOIN categories c ON c.id = bc.category_id
             WHERE bc.book_id = ?1 ORDER BY bc.position",
            book.id,
        )?;
        Ok(book)
    }

    fn names_for(&self, sql: &str, book_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![book_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>()
            .context("Failed to collect names")
    }
}

/// Columns as laid out in `BOOK_SELECT`; authors and categories are filled later
pub(super) fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        id: row.get(0)?,
        isbn10: row.get(1)?,
        isbn13: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        thumbnail_url: row.get(5)?,
        preview_url: row.get(6)?,
        reading_level: row.get(7)?,
        location: row.get(8)?,
        authors: Vec::new(),
        categories: Vec::new(),
    })
}
