//! Lending books to pupils and taking them back, verified by barcode

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::info;

use crate::access::CurrentUser;
use crate::database::{BookRecord, LibraryDb, OnLoan};
use crate::isbn;
use crate::pagination::{calculate_pagination, Pagination};

/// Where a physical copy currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookLocation {
    Library,
    Loan,
    Classroom,
}

impl BookLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            BookLocation::Library => "LIBRARY",
            BookLocation::Loan => "LOAN",
            BookLocation::Classroom => "CLASSROOM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LIBRARY" => Some(BookLocation::Library),
            "LOAN" => Some(BookLocation::Loan),
            "CLASSROOM" => Some(BookLocation::Classroom),
            _ => None,
        }
    }
}

impl fmt::Display for BookLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for BookLocation {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BookLocation {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        BookLocation::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown book location {:?}", text).into()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CirculationError {
    #[error("Invalid entries! Book: {book}; Pupil: {pupil}")]
    InvalidEntries { book: String, pupil: String },
    #[error("You can only lend books to pupils in your own classroom.")]
    NotYourPupil,
    #[error("No ISBN found in provided image.")]
    NoIsbnFound,
    #[error("Barcode does not match selected book.")]
    BarcodeMismatch,
    #[error("'{0}' is already on loan.")]
    AlreadyOnLoan(String),
    #[error("No loans found for this book.")]
    NoOpenLoan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub loan_id: i64,
    pub title: String,
    pub pupil: String,
}

/// The barcode printed on a copy: its ISBN-13, or the one derived from
/// its ISBN-10 for books catalogued without one
fn expected_barcode(book: &BookRecord) -> Option<String> {
    if let Some(ref isbn13) = book.isbn13 {
        return Some(isbn13.clone());
    }
    let isbn10 = isbn::parse(book.isbn10.as_deref()?).ok()?;
    isbn10.pair().1
}

/// The scanned barcodes must include the book's ISBN-13
fn check_barcode(book: &BookRecord, scanned_isbns: &[String]) -> Result<(), CirculationError> {
    if scanned_isbns.is_empty() {
        return Err(CirculationError::NoIsbnFound);
    }
    match expected_barcode(book) {
        Some(ref isbn13) if scanned_isbns.contains(isbn13) => Ok(()),
        _ => Err(CirculationError::BarcodeMismatch),
    }
}

fn describe<T>(found: &Option<T>, id: i64, name: impl Fn(&T) -> String) -> String {
    match found {
        Some(item) => name(item),
        None => format!("#{} (not found)", id),
    }
}

/// Lend a book to a pupil once its barcode has been checked
pub fn record_loan(
    db: &mut LibraryDb,
    user: &CurrentUser,
    book_id: i64,
    pupil_id: i64,
    scanned_isbns: &[String],
    today: NaiveDate,
) -> Result<Receipt> {
    let book = db.get_book(book_id)?;
    let pupil = db.get_pupil(pupil_id)?;
    let user_exists = db.find_user(&user.username)?.is_some();

    let (Some(book), Some(pupil), true) = (&book, &pupil, user_exists) else {
        return Err(CirculationError::InvalidEntries {
            book: describe(&book, book_id, |b| b.title.clone()),
            pupil: describe(&pupil, pupil_id, |p| format!("{} ({})", p.name, p.classroom)),
        }
        .into());
    };

    if !user.is_admin && user.classroom_id != Some(pupil.classroom_id) {
        return Err(CirculationError::NotYourPupil.into());
    }
    check_barcode(book, scanned_isbns)?;
    if db.open_loan_for_book(book.id)?.is_some() {
        return Err(CirculationError::AlreadyOnLoan(book.title.clone()).into());
    }

    let loan_id = db.transaction(|db| {
        let loan_id = db.insert_loan(book.id, pupil.id, today)?;
        db.set_book_location(book.id, BookLocation::Loan)?;
        Ok(loan_id)
    })?;
    info!("Loan {} of book {} to pupil {}", loan_id, book.id, pupil.id);

    Ok(Receipt {
        loan_id,
        title: book.title.clone(),
        pupil: pupil.name.clone(),
    })
}

/// Close the open loan of a book once its barcode has been checked
pub fn record_return(
    db: &mut LibraryDb,
    book_id: i64,
    scanned_isbns: &[String],
    today: NaiveDate,
) -> Result<Receipt> {
    let Some(book) = db.get_book(book_id)? else {
        return Err(CirculationError::InvalidEntries {
            book: format!("#{} (not found)", book_id),
            pupil: "-".to_string(),
        }
        .into());
    };
    check_barcode(&book, scanned_isbns)?;

    let Some(loan) = db.open_loan_for_book(book.id)? else {
        return Err(CirculationError::NoOpenLoan.into());
    };
    let pupil = db
        .get_pupil(loan.pupil_id)?
        .map(|p| p.name)
        .unwrap_or_default();

    db.transaction(|db| {
        db.close_loan(loan.id, today)?;
        db.set_book_location(book.id, BookLocation::Library)
    })?;
    info!("Return of book {} from loan {}", book.id, loan.id);

    Ok(Receipt {
        loan_id: loan.id,
        title: book.title,
        pupil,
    })
}

/// Open loans visible to `user`: everything for admins, their own
/// classroom's loans otherwise
pub fn books_on_loan(
    db: &LibraryDb,
    user: &CurrentUser,
    page: i64,
    per_page: i64,
) -> Result<(Vec<OnLoan>, Pagination)> {
    let classroom = if user.is_admin {
        None
    } else {
        match user.classroom_id {
            Some(id) => Some(id),
            None => return Ok((Vec::new(), calculate_pagination(0, page, per_page))),
        }
    };

    let total = db.count_books_on_loan(classroom)?;
    let pagination = calculate_pagination(total, page, per_page);
    let loans = db.books_on_loan(classroom, pagination.per_page, pagination.offset)?;
    Ok((loans, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{authenticate, grant_access};
    use crate::database::test_support::temp_db;
    use crate::lookup::BookCandidate;
    use tempfile::TempDir;

    const DUNE: &str = "9780441172719";

    struct Fixture {
        _dir: TempDir,
        db: LibraryDb,
        book: i64,
        oak_pupil: i64,
        ash_pupil: i64,
        admin: CurrentUser,
        oak_teacher: CurrentUser,
    }

    fn fixture() -> Fixture {
        let (dir, mut db) = temp_db();
        let book = db
            .add_book(&BookCandidate {
                title: "Dune".to_string(),
                isbn13: Some(DUNE.to_string()),
                ..Default::default()
            })
            .unwrap();
        let oak = db.add_classroom("Oak", 3).unwrap();
        let ash = db.add_classroom("Ash", 1).unwrap();
        let oak_pupil = db.add_pupil(oak, "Amir").unwrap();
        let ash_pupil = db.add_pupil(ash, "Zara").unwrap();

        grant_access(&mut db, "head", "pw", true, None).unwrap();
        grant_access(&mut db, "oak", "acorn", false, Some("Oak")).unwrap();
        let admin = authenticate(&db, "head", "pw").unwrap();
        let oak_teacher = authenticate(&db, "oak", "acorn").unwrap();

        Fixture {
            _dir: dir,
            db,
            book,
            oak_pupil,
            ash_pupil,
            admin,
            oak_teacher,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn scanned(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn circulation_error(err: anyhow::Error) -> CirculationError {
        err.downcast::<CirculationError>().unwrap()
    }

    #[test]
    fn test_location_round_trips_through_text() {
        for location in [
            BookLocation::Library,
            BookLocation::Loan,
            BookLocation::Classroom,
        ] {
            assert_eq!(BookLocation::parse(location.as_str()), Some(location));
        }
        assert_eq!(BookLocation::parse("ATTIC"), None);
    }

    #[test]
    fn test_loan_and_return() {
        let mut f = fixture();
        let receipt = record_loan(
            &mut f.db,
            &f.oak_teacher,
            f.book,
            f.oak_pupil,
            &scanned(&[DUNE]),
            day(1),
        )
        .unwrap();
        assert_eq!(receipt.title, "Dune");
        assert_eq!(receipt.pupil, "Amir");

        let book = f.db.get_book(f.book).unwrap().unwrap();
        assert_eq!(book.location, BookLocation::Loan);
        let loan = f.db.open_loan_for_book(f.book).unwrap().unwrap();
        assert_eq!(loan.start_date, day(1));

        let returned = record_return(&mut f.db, f.book, &scanned(&[DUNE]), day(9)).unwrap();
        assert_eq!(returned.loan_id, receipt.loan_id);
        assert_eq!(returned.pupil, "Amir");
        let book = f.db.get_book(f.book).unwrap().unwrap();
        assert_eq!(book.location, BookLocation::Library);
        assert!(f.db.open_loan_for_book(f.book).unwrap().is_none());
    }

    #[test]
    fn test_missing_entities_are_invalid() {
        let mut f = fixture();
        let err = record_loan(&mut f.db, &f.admin, f.book + 50, f.oak_pupil, &scanned(&[DUNE]), day(1))
            .unwrap_err();
        let err = circulation_error(err);
        assert!(matches!(err, CirculationError::InvalidEntries { .. }));
        assert!(err.to_string().starts_with("Invalid entries!"));

        let ghost = CurrentUser {
            id: 999,
            username: "ghost".to_string(),
            is_admin: true,
            classroom_id: None,
        };
        let err = record_loan(&mut f.db, &ghost, f.book, f.oak_pupil, &scanned(&[DUNE]), day(1))
            .unwrap_err();
        assert!(matches!(circulation_error(err), CirculationError::InvalidEntries { .. }));
    }

    #[test]
    fn test_teacher_limited_to_own_classroom() {
        let mut f = fixture();
        let err = record_loan(
            &mut f.db,
            &f.oak_teacher,
            f.book,
            f.ash_pupil,
            &scanned(&[DUNE]),
            day(1),
        )
        .unwrap_err();
        assert_eq!(circulation_error(err), CirculationError::NotYourPupil);

        // Admins may lend to anyone
        record_loan(&mut f.db, &f.admin, f.book, f.ash_pupil, &scanned(&[DUNE]), day(1)).unwrap();
    }

    #[test]
    fn test_barcode_checks() {
        let mut f = fixture();
        let err = record_loan(&mut f.db, &f.admin, f.book, f.oak_pupil, &[], day(1)).unwrap_err();
        assert_eq!(circulation_error(err).to_string(), "No ISBN found in provided image.");

        let err = record_loan(
            &mut f.db,
            &f.admin,
            f.book,
            f.oak_pupil,
            &scanned(&["9780306406157"]),
            day(1),
        )
        .unwrap_err();
        assert_eq!(
            circulation_error(err).to_string(),
            "Barcode does not match selected book."
        );

        let err = record_return(&mut f.db, f.book, &scanned(&["9780306406157"]), day(2)).unwrap_err();
        assert_eq!(circulation_error(err), CirculationError::BarcodeMismatch);
        assert!(f.db.open_loan_for_book(f.book).unwrap().is_none());
    }

    #[test]
    fn test_isbn10_only_book_matches_derived_barcode() {
        let mut f = fixture();
        let old = f
            .db
            .add_book(&BookCandidate {
                title: "Data Reduction".to_string(),
                isbn10: Some("0306406152".to_string()),
                ..Default::default()
            })
            .unwrap();

        let err = record_loan(&mut f.db, &f.admin, old, f.oak_pupil, &scanned(&[DUNE]), day(1))
            .unwrap_err();
        assert_eq!(circulation_error(err), CirculationError::BarcodeMismatch);

        record_loan(
            &mut f.db,
            &f.admin,
            old,
            f.oak_pupil,
            &scanned(&["9780306406157"]),
            day(1),
        )
        .unwrap();
        record_return(&mut f.db, old, &scanned(&["9780306406157"]), day(3)).unwrap();

        let untagged = f
            .db
            .add_book(&BookCandidate {
                title: "No Barcode".to_string(),
                ..Default::default()
            })
            .unwrap();
        let err = record_loan(&mut f.db, &f.admin, untagged, f.oak_pupil, &scanned(&[DUNE]), day(4))
            .unwrap_err();
        assert_eq!(circulation_error(err), CirculationError::BarcodeMismatch);
    }

    #[test]
    fn test_double_loan_and_return_without_loan() {
        let mut f = fixture();
        let err = record_return(&mut f.db, f.book, &scanned(&[DUNE]), day(1)).unwrap_err();
        assert_eq!(
            circulation_error(err).to_string(),
            "No loans found for this book."
        );

        record_loan(&mut f.db, &f.admin, f.book, f.oak_pupil, &scanned(&[DUNE]), day(1)).unwrap();
        let err = record_loan(&mut f.db, &f.admin, f.book, f.ash_pupil, &scanned(&[DUNE]), day(2))
            .unwrap_err();
        assert_eq!(
            circulation_error(err),
            CirculationError::AlreadyOnLoan("Dune".to_string())
        );
    }

    #[test]
    fn test_books_on_loan_visibility() {
        let mut f = fixture();
        record_loan(&mut f.db, &f.admin, f.book, f.ash_pupil, &scanned(&[DUNE]), day(1)).unwrap();

        let (all, pagination) = books_on_loan(&f.db, &f.admin, 1, 15).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(pagination.total_pages, 1);

        // Lent to an Ash pupil, so the Oak teacher sees nothing
        let (oak, _) = books_on_loan(&f.db, &f.oak_teacher, 1, 15).unwrap();
        assert!(oak.is_empty());

        let loner = CurrentUser {
            id: 42,
            username: "loner".to_string(),
            is_admin: false,
            classroom_id: None,
        };
        let (none, pagination) = books_on_loan(&f.db, &loner, 3, 15).unwrap();
        assert!(none.is_empty());
        assert_eq!(pagination.page, 1);
    }
}
