//! Loan commands - lending, returns and the on-loan list

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::Session;
use crate::barcode::scan_for_isbn;
use crate::circulation::{books_on_loan, record_loan, record_return};
use crate::upload::{check_upload, FileType};

fn scan_barcode(session: &Session, image: &Path) -> Result<Vec<String>> {
    check_upload(image, FileType::Image)?;
    scan_for_isbn(image, &session.config.scanner)
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn record(session: &Session, book: i64, pupil: i64, barcode: &Path) -> Result<()> {
    let mut db = session.open_db()?;
    let user = session.login(&db)?;

    let scanned = scan_barcode(session, barcode)?;
    let receipt = record_loan(&mut db, &user, book, pupil, &scanned, today())?;
    println!(
        "Loan has been recorded for '{}' to {} {}",
        receipt.title.bold(),
        receipt.pupil,
        format!("(loan #{})", receipt.loan_id).dimmed()
    );
    Ok(())
}

pub fn return_book(session: &Session, book: i64, barcode: &Path) -> Result<()> {
    let mut db = session.open_db()?;
    session.login(&db)?;

    let scanned = scan_barcode(session, barcode)?;
    let receipt = record_return(&mut db, book, &scanned, today())?;
    println!(
        "Book return has been recorded for '{}' by {}",
        receipt.title.bold(),
        receipt.pupil
    );
    Ok(())
}

pub fn list(session: &Session, page: i64) -> Result<()> {
    let db = session.open_db()?;
    let user = session.login(&db)?;

    let (loans, pagination) = books_on_loan(&db, &user, page, session.per_page())?;
    if loans.is_empty() {
        println!("No books are on loan.");
        return Ok(());
    }

    for loan in &loans {
        println!(
            "[{}] {} - {} ({}) since {}",
            loan.book_id,
            loan.title.bold(),
            loan.pupil.cyan(),
            loan.classroom,
            loan.start_date
        );
    }
    if !session.quiet {
        println!(
            "{}",
            format!("Page {} of {}", pagination.page, pagination.total_pages).dimmed()
        );
    }
    Ok(())
}
