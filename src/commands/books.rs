//! Book commands - online lookup, cataloguing and browsing

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;

use super::{confirm, runtime, Session};
use crate::database::BookRecord;
use crate::lookup::{BookCandidate, BookFinder, FindOutcome, HttpBookSource};
use crate::pagination::calculate_pagination;

/// Run the resolver against the live services
fn resolve(
    session: &Session,
    isbns: &[String],
    title: Option<&str>,
    direct: bool,
) -> Result<FindOutcome> {
    let has_title = title.is_some_and(|t| !t.trim().is_empty());
    if isbns.iter().all(|i| i.trim().is_empty()) && !has_title {
        bail!("Please provide at least one --isbn or a --title");
    }

    let finder = BookFinder::new(HttpBookSource::new(&session.config.api)?);
    let rt = runtime()?;
    Ok(rt.block_on(finder.find_books(isbns, title, direct)))
}

pub fn find(
    session: &Session,
    isbns: &[String],
    title: Option<&str>,
    direct: bool,
    json: bool,
) -> Result<()> {
    let outcome = resolve(session, isbns, title, direct)?;

    if json {
        #[derive(Serialize)]
        struct JsonOutcome<'a> {
            books: &'a [BookCandidate],
            errors: &'a [String],
        }
        let json = serde_json::to_string_pretty(&JsonOutcome {
            books: &outcome.books,
            errors: &outcome.errors,
        })?;
        println!("{}", json);
        return Ok(());
    }

    print_errors(&outcome.errors);
    if outcome.books.is_empty() {
        println!("No books found.");
        return Ok(());
    }

    println!();
    println!("Found {} book(s):", outcome.books.len());
    println!();
    for (index, candidate) in outcome.books.iter().enumerate() {
        print_candidate(index + 1, candidate);
    }
    Ok(())
}

pub fn add(
    session: &Session,
    isbns: &[String],
    title: Option<&str>,
    pick: Option<usize>,
    direct: bool,
    yes: bool,
) -> Result<()> {
    let mut db = session.open_db()?;
    session.login_admin(&db)?;

    let outcome = resolve(session, isbns, title, direct)?;
    print_errors(&outcome.errors);
    if outcome.books.is_empty() {
        bail!("No books found to add");
    }

    let choice = pick.unwrap_or(1);
    let Some(candidate) = choice.checked_sub(1).and_then(|i| outcome.books.get(i)) else {
        bail!(
            "--pick {} is out of range (found {} book(s))",
            choice,
            outcome.books.len()
        );
    };

    print_candidate(choice, candidate);
    if !yes && !confirm("Add this book to the library?")? {
        println!("Aborted.");
        return Ok(());
    }

    let id = db.add_book(candidate)?;
    println!("{} book {}: {}", "Added".green(), id, candidate.title.bold());
    Ok(())
}

pub fn list(session: &Session, page: i64, json: bool) -> Result<()> {
    let db = session.open_db()?;
    let total = db.count_books()?;
    let pagination = calculate_pagination(total, page, session.per_page());
    let books = db.list_books(pagination.per_page, pagination.offset)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("The library has no books yet.");
        return Ok(());
    }
    for book in &books {
        print_book_summary(book);
    }
    if !session.quiet {
        println!(
            "{}",
            format!(
                "Page {} of {} ({} books)",
                pagination.page, pagination.total_pages, total
            )
            .dimmed()
        );
    }
    Ok(())
}

pub fn show(session: &Session, id: i64, json: bool) -> Result<()> {
    let db = session.open_db()?;
    let Some(book) = db.get_book(id)? else {
        bail!("No book with id {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&book)?);
        return Ok(());
    }

    print_book_summary(&book);
    if !book.categories.is_empty() {
        println!("  Categories: {}", book.categories.join(", "));
    }
    if let Some(ref description) = book.description {
        println!();
        println!("{}", description);
        println!();
    }
    if let Some(ref url) = book.thumbnail_url {
        println!("  Cover:   {}", url.dimmed());
    }
    if let Some(ref url) = book.preview_url {
        println!("  Preview: {}", url.dimmed());
    }
    Ok(())
}

pub fn search(session: &Session, text: &str, json: bool) -> Result<()> {
    let db = session.open_db()?;
    let books = db.search_books(text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    println!("Found {} result(s):", books.len());
    println!();
    for book in &books {
        print_book_summary(book);
    }
    Ok(())
}

pub fn terms(session: &Session) -> Result<()> {
    let db = session.open_db()?;
    for term in db.search_terms()? {
        println!("{}", term);
    }
    Ok(())
}

pub fn set_level(session: &Session, id: i64, level: &str) -> Result<()> {
    let db = session.open_db()?;
    session.login_admin(&db)?;

    db.set_reading_level(id, level)?;
    println!("Book {} is now reading level {}", id, level.yellow());
    Ok(())
}

fn print_errors(errors: &[String]) {
    for error in errors {
        eprintln!("{} {}", "error:".red(), error);
    }
}

fn print_candidate(number: usize, candidate: &BookCandidate) {
    println!("{}. {}", number, candidate.title.bold());
    if !candidate.authors.is_empty() {
        println!("   by {}", candidate.authors.join(", ").cyan());
    }
    let isbns: Vec<&str> = [&candidate.isbn13, &candidate.isbn10]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if !isbns.is_empty() {
        println!("   ISBN {}", isbns.join(" / "));
    }
    if !candidate.categories.is_empty() {
        println!("   {}", candidate.categories.join(", ").yellow());
    }
    println!("   {}", format!("from {}", candidate.source).dimmed());
    println!();
}

fn print_book_summary(book: &BookRecord) {
    println!("[{}] {}", book.id, book.title.bold());
    if !book.authors.is_empty() {
        println!("  by {}", book.authors.join(", ").cyan());
    }
    let isbns: Vec<&str> = [&book.isbn13, &book.isbn10]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if !isbns.is_empty() {
        println!("  ISBN {}", isbns.join(" / ").dimmed());
    }
    match book.reading_level {
        Some(ref level) => println!("  Level {} - {}", level.yellow(), book.location),
        None => println!("  {}", book.location),
    }
}
