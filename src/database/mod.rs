//! SQLite storage for the catalogue, classrooms, users and loans

mod books;
mod loans;
mod people;

pub use books::BookRecord;
pub use loans::OnLoan;
pub use people::UserRecord;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Database handle for the school library
pub struct LibraryDb {
    conn: Connection,
}

impl LibraryDb {
    /// Open or create the database file, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS classrooms (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                year INTEGER NOT NULL,
                user_id INTEGER UNIQUE REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS pupils (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                classroom_id INTEGER NOT NULL REFERENCES classrooms(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS reading_levels (
                id INTEGER PRIMARY KEY,
                level TEXT NOT NULL UNIQUE,
                age_min INTEGER,
                age_max INTEGER
            );

            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY,
                isbn10 TEXT UNIQUE,
                isbn13 TEXT UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                thumbnail_url TEXT,
                preview_url TEXT,
                reading_level_id INTEGER REFERENCES reading_levels(id),
                current_location TEXT NOT NULL DEFAULT 'LIBRARY',
                added_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS book_authors (
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES authors(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (book_id, author_id)
            );

            CREATE TABLE IF NOT EXISTS book_categories (
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (book_id, category_id)
            );

            CREATE TABLE IF NOT EXISTS loans (
                id INTEGER PRIMARY KEY,
                book_id INTEGER NOT NULL REFERENCES books(id),
                pupil_id INTEGER NOT NULL REFERENCES pupils(id),
                start_date TEXT NOT NULL,
                end_date TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_open_loan ON loans(book_id) WHERE end_date IS NULL;
            CREATE INDEX IF NOT EXISTS idx_book_title ON books(title);
            CREATE INDEX IF NOT EXISTS idx_pupil_classroom ON pupils(classroom_id);
            "#,
            )
            .context("Failed to initialise database schema")?;
        Ok(())
    }

    /// Run `f` inside a transaction, committing only if it succeeds
    pub fn transaction<T>(&mut self, f: impl FnOnce(&LibraryDb) -> Result<T>) -> Result<T> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("Failed to begin transaction")?;
        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .context("Failed to commit transaction")?;
                Ok(value)
            }
            Err(e) => {
                // Keep the original error even if rollback also fails
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}
