use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, Write};
use tracing::info;

use super::Session;
use crate::access::{grant_access, needs_bootstrap};

pub fn add(
    session: &Session,
    username: &str,
    new_password: Option<&str>,
    classroom: Option<&str>,
    admin: bool,
) -> Result<()> {
    let mut db = session.open_db()?;

    // The very first login is created without credentials and is always an admin
    let bootstrap = needs_bootstrap(&db)?;
    if bootstrap {
        info!("No users yet; creating {} as administrator", username);
    } else {
        session.login_admin(&db)?;
    }

    let password = match new_password {
        Some(p) => p.to_string(),
        None => prompt_password(username)?,
    };

    let outcome = grant_access(&mut db, username, &password, admin || bootstrap, classroom)?;
    println!("{}", outcome.message().green());
    Ok(())
}

fn prompt_password(username: &str) -> Result<String> {
    print!("Password for {}: ", username);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read password")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub fn list(session: &Session) -> Result<()> {
    let db = session.open_db()?;
    session.login_admin(&db)?;

    for user in db.list_users()? {
        let classroom = db.classroom_for_user(user.id)?.map(|c| c.name);
        let role = if user.is_admin { "admin" } else { "teacher" };
        match classroom {
            Some(name) => println!("{} ({}, {})", user.username.bold(), role, name),
            None => println!("{} ({})", user.username.bold(), role),
        }
    }
    Ok(())
}

pub fn whoami(session: &Session) -> Result<()> {
    let db = session.open_db()?;
    let user = session.login(&db)?;

    let role = if user.is_admin { "administrator" } else { "teacher" };
    println!("{} ({})", user.username.bold(), role);
    if let Some(classroom) = db.classroom_for_user(user.id)? {
        println!("  Classroom: {} (year {})", classroom.name, classroom.year);
    }
    Ok(())
}
