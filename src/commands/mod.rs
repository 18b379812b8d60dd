pub mod books;
pub mod classrooms;
pub mod levels;
pub mod loans;
pub mod scan;
pub mod users;

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::access::{self, AccessError, CurrentUser};
use crate::config::Config;
use crate::database::LibraryDb;

/// Settings and credentials shared by every command
pub struct Session {
    pub config: Config,
    pub db_path: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
    pub quiet: bool,
}

impl Session {
    pub fn open_db(&self) -> Result<LibraryDb> {
        LibraryDb::open(&self.db_path)
    }

    /// Authenticate the `--user` given on the command line
    pub fn login(&self, db: &LibraryDb) -> Result<CurrentUser> {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(AccessError::LoginRequired.into());
        };
        access::authenticate(db, username, password)
    }

    pub fn login_admin(&self, db: &LibraryDb) -> Result<CurrentUser> {
        let user = self.login(db)?;
        access::require_admin(&user)?;
        Ok(user)
    }

    pub fn per_page(&self) -> i64 {
        self.config.library.per_page
    }
}

/// Ask a yes/no question on stdin, defaulting to no
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read confirmation")?;

    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Build a runtime for the async lookup pipeline
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}
