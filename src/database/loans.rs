use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::LibraryDb;

#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub id: i64,
    pub pupil_id: i64,
    pub start_date: NaiveDate,
}

/// An open loan joined with its book, pupil and classroom
#[derive(Debug, Clone, PartialEq)]
pub struct OnLoan {
    pub book_id: i64,
    pub title: String,
    pub pupil: String,
    pub classroom: String,
    pub start_date: NaiveDate,
}

impl LibraryDb {
    pub fn insert_loan(&self, book_id: i64, pupil_id: i64, start_date: NaiveDate) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO loans (book_id, pupil_id, start_date) VALUES (?1, ?2, ?3)",
                params![book_id, pupil_id, start_date],
            )
            .with_context(|| format!("Failed to record loan of book {}", book_id))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The loan currently holding a book, if it is out
    pub fn open_loan_for_book(&self, book_id: i64) -> Result<Option<LoanRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT id, pupil_id, start_date
                FROM loans WHERE book_id = ?1 AND end_date IS NULL
                "#,
                params![book_id],
                |row| {
                    Ok(LoanRecord {
                        id: row.get(0)?,
                        pupil_id: row.get(1)?,
                        start_date: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query open loan")
    }

    pub fn close_loan(&self, loan_id: i64, end_date: NaiveDate) -> Result<()> {
        self.conn
            .execute(
                "UPDATE loans SET end_date = ?1 WHERE id = ?2",
                params![end_date, loan_id],
            )
            .context("Failed to close loan")?;
        Ok(())
    }

    /// Open loans, optionally only those lent to pupils of one classroom
    pub fn books_on_loan(
        &self,
        classroom_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnLoan>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT b.id, b.title, p.name, c.name, l.start_date
            FROM loans l
            JOIN books b ON b.id = l.book_id
            JOIN pupils p ON p.id = l.pupil_id
            JOIN classrooms c ON c.id = p.classroom_id
            WHERE l.end_date IS NULL AND (?1 IS NULL OR c.id = ?1)
            ORDER BY l.start_date, b.title COLLATE NOCASE
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![classroom_id, limit, offset], |row| {
            Ok(OnLoan {
                book_id: row.get(0)?,
                title: row.get(1)?,
                pupil: row.get(2)?,
                classroom: row.get(3)?,
                start_date: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to collect loans")
    }

    pub fn count_books_on_loan(&self, classroom_id: Option<i64>) -> Result<i64> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*)
                FROM loans l
                JOIN pupils p ON p.id = l.pupil_id
                WHERE l.end_date IS NULL AND (?1 IS NULL OR p.classroom_id = ?1)
                "#,
                params![classroom_id],
                |row| row.get(0),
            )
            .context("Failed to count loans")
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_support::temp_db;
    use crate::lookup::BookCandidate;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_one_open_loan_per_book() {
        let (_dir, mut db) = temp_db();
        let book = db
            .add_book(&BookCandidate {
                title: "Dune".to_string(),
                isbn13: Some("9780441172719".to_string()),
                ..Default::default()
            })
            .unwrap();
        let oak = db.add_classroom("Oak", 3).unwrap();
        let amir = db.add_pupil(oak, "Amir").unwrap();
        let zara = db.add_pupil(oak, "Zara").unwrap();

        let loan = db.insert_loan(book, amir, day(1)).unwrap();
        assert!(db.insert_loan(book, zara, day(2)).is_err());

        let open = db.open_loan_for_book(book).unwrap().unwrap();
        assert_eq!(open.id, loan);
        assert_eq!(open.start_date, day(1));
        assert_eq!(open.pupil_id, amir);

        db.close_loan(loan, day(5)).unwrap();
        assert!(db.open_loan_for_book(book).unwrap().is_none());
        db.insert_loan(book, zara, day(6)).unwrap();
    }

    #[test]
    fn test_books_on_loan_by_classroom() {
        let (_dir, mut db) = temp_db();
        let dune = db
            .add_book(&BookCandidate {
                title: "Dune".to_string(),
                ..Default::default()
            })
            .unwrap();
        let matilda = db
            .add_book(&BookCandidate {
                title: "Matilda".to_string(),
                ..Default::default()
            })
            .unwrap();
        let oak = db.add_classroom("Oak", 3).unwrap();
        let ash = db.add_classroom("Ash", 1).unwrap();
        let amir = db.add_pupil(oak, "Amir").unwrap();
        let zara = db.add_pupil(ash, "Zara").unwrap();

        db.insert_loan(dune, amir, day(1)).unwrap();
        db.insert_loan(matilda, zara, day(2)).unwrap();

        let all = db.books_on_loan(None, 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Dune");
        assert_eq!(all[0].pupil, "Amir");

        let oak_loans = db.books_on_loan(Some(oak), 10, 0).unwrap();
        assert_eq!(oak_loans.len(), 1);
        assert_eq!(oak_loans[0].classroom, "Oak");
        assert_eq!(db.count_books_on_loan(Some(ash)).unwrap(), 1);
        assert_eq!(db.count_books_on_loan(None).unwrap(), 2);

        assert_eq!(db.books_on_loan(None, 1, 1).unwrap()[0].title, "Matilda");
    }
}
