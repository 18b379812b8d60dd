//! Logins, password hashing and permission checks

use anyhow::Result;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::database::{LibraryDb, UserRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Invalid login details.")]
    InvalidLogin,
    #[error("You need to log in first (--user, with SCHOOLSHELF_PASSWORD or --password).")]
    LoginRequired,
    #[error("You are not authorised to access this page.")]
    NotAuthorised,
    #[error("This username is already in use, please choose a different username.")]
    UsernameTaken,
    #[error("Username and password must not be empty.")]
    EmptyCredentials,
    #[error("No classroom named {0:?}.")]
    UnknownClassroom(String),
}

/// The authenticated user a command runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    /// Classroom this login is linked to, if any
    pub classroom_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Created,
    Updated,
}

impl GrantOutcome {
    pub fn message(self) -> &'static str {
        match self {
            GrantOutcome::Created => "Access has been created successfully!",
            GrantOutcome::Updated => "Login details have been updated!",
        }
    }
}

/// Hex SHA-256 of `salt || password`
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn new_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn password_matches(user: &UserRecord, password: &str) -> bool {
    hash_password(&user.salt, password) == user.password_hash
}

/// Check a username (any case) and password against the users table
pub fn authenticate(db: &LibraryDb, username: &str, password: &str) -> Result<CurrentUser> {
    let Some(user) = db.find_user(username.trim())? else {
        debug!("Login attempt for unknown user {:?}", username);
        return Err(AccessError::InvalidLogin.into());
    };
    if !password_matches(&user, password) {
        debug!("Wrong password for {:?}", user.username);
        return Err(AccessError::InvalidLogin.into());
    }

    let classroom_id = db.classroom_for_user(user.id)?.map(|c| c.id);
    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
        classroom_id,
    })
}

pub fn require_admin(user: &CurrentUser) -> Result<(), AccessError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AccessError::NotAuthorised)
    }
}

/// True until the first login has been created
pub fn needs_bootstrap(db: &LibraryDb) -> Result<bool> {
    Ok(db.count_users()? == 0)
}

/// Create a login, or reset an existing one when a classroom is named.
///
/// An existing username without a classroom is refused so individual
/// logins are never silently overwritten.
pub fn grant_access(
    db: &mut LibraryDb,
    username: &str,
    password: &str,
    is_admin: bool,
    classroom: Option<&str>,
) -> Result<GrantOutcome> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AccessError::EmptyCredentials.into());
    }

    let classroom = match classroom {
        Some(name) => Some(
            db.find_classroom(name)?
                .ok_or_else(|| AccessError::UnknownClassroom(name.to_string()))?,
        ),
        None => None,
    };
    let existing = db.find_user(username)?;

    let salt = new_salt();
    let hash = hash_password(&salt, password);

    match (existing, classroom) {
        (Some(_), None) => Err(AccessError::UsernameTaken.into()),
        (Some(user), Some(classroom)) => {
            db.transaction(|db| {
                db.update_user_credentials(user.id, &hash, &salt, is_admin)?;
                db.link_classroom_user(classroom.id, user.id)
            })?;
            info!("Updated login {} for classroom {}", user.username, classroom.name);
            Ok(GrantOutcome::Updated)
        }
        (None, classroom) => {
            db.transaction(|db| {
                let user_id = db.add_user(username, &hash, &salt, is_admin)?;
                if let Some(ref classroom) = classroom {
                    db.link_classroom_user(classroom.id, user_id)?;
                }
                Ok(())
            })?;
            info!("Created login {}", username);
            Ok(GrantOutcome::Created)
        }
    }
}
