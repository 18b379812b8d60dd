use anyhow::{bail, Context, Result};
use rusqlite::{params, OptionalExtension};

use super::LibraryDb;

const CLASSROOM_SELECT: &str = r#"
    SELECT c.id, c.name, c.year, u.username,
           (SELECT COUNT(*) FROM pupils p WHERE p.classroom_id = c.id)
    FROM classrooms c
    LEFT JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassroomRecord {
    pub id: i64,
    pub name: String,
    pub year: i64,
    /// Login linked to this classroom, if any
    pub username: Option<String>,
    pub pupil_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PupilRecord {
    pub id: i64,
    pub name: String,
    pub classroom_id: i64,
    pub classroom: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub is_admin: bool,
}

impl LibraryDb {
    pub fn add_classroom(&self, name: &str, year: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO classrooms (name, year) VALUES (?1, ?2)",
                params![name, year],
            )
            .with_context(|| format!("Failed to add classroom {:?}", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_classroom(&self, name: &str) -> Result<Option<ClassroomRecord>> {
        let sql = format!("{} WHERE c.name = ?1", CLASSROOM_SELECT);
        self.conn
            .query_row(&sql, params![name], row_to_classroom)
            .optional()
            .context("Failed to query classroom")
    }

    /// The classroom a user is responsible for
    pub fn classroom_for_user(&self, user_id: i64) -> Result<Option<ClassroomRecord>> {
        let sql = format!("{} WHERE c.user_id = ?1", CLASSROOM_SELECT);
        self.conn
            .query_row(&sql, params![user_id], row_to_classroom)
            .optional()
            .context("Failed to query classroom for user")
    }

    pub fn list_classrooms(&self) -> Result<Vec<ClassroomRecord>> {
        let sql = format!("{} ORDER BY c.year, c.name", CLASSROOM_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_classroom)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to collect classrooms")
    }

    pub fn set_classroom_year(&self, classroom_id: i64, year: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE classrooms SET year = ?1 WHERE id = ?2",
            params![year, classroom_id],
        )?;
        Ok(())
    }

    /// Make `user_id` the login for a classroom, detaching it from any other
    pub fn link_classroom_user(&self, classroom_id: i64, user_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE classrooms SET user_id = NULL WHERE user_id = ?1",
            params![user_id],
        )?;
        let updated = self.conn.execute(
            "UPDATE classrooms SET user_id = ?1 WHERE id = ?2",
            params![user_id, classroom_id],
        )?;
        if updated == 0 {
            bail!("No classroom with id {}", classroom_id);
        }
        Ok(())
    }

    pub fn add_pupil(&self, classroom_id: i64, name: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO pupils (name, classroom_id) VALUES (?1, ?2)",
                params![name, classroom_id],
            )
            .with_context(|| format!("Failed to add pupil {:?}", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_pupil(&self, id: i64) -> Result<Option<PupilRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT p.id, p.name, p.classroom_id, c.name
                FROM pupils p JOIN classrooms c ON c.id = p.classroom_id
                WHERE p.id = ?1
                "#,
                params![id],
                row_to_pupil,
            )
            .optional()
            .context("Failed to query pupil")
    }

    pub fn list_pupils(&self, classroom_id: i64) -> Result<Vec<PupilRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.classroom_id, c.name
            FROM pupils p JOIN classrooms c ON c.id = p.classroom_id
            WHERE p.classroom_id = ?1
            ORDER BY p.name, p.id
            "#,
        )?;
        let rows = stmt.query_map(params![classroom_id], row_to_pupil)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to collect pupils")
    }

    pub fn add_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
        is_admin: bool,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO users (username, password_hash, salt, is_admin) VALUES (?1, ?2, ?3, ?4)",
                params![username, password_hash, salt, is_admin],
            )
            .with_context(|| format!("Failed to add user {:?}", username))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Case-insensitive username lookup
    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        self.conn
            .query_row(
                "SELECT id, username, password_hash, salt, is_admin FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()
            .context("Failed to query user")
    }

    pub fn update_user_credentials(
        &self,
        user_id: i64,
        password_hash: &str,
        salt: &str,
        is_admin: bool,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?1, salt = ?2, is_admin = ?3 WHERE id = ?4",
            params![password_hash, salt, is_admin, user_id],
        )?;
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, salt, is_admin FROM users ORDER BY username",
        )?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to collect users")
    }

    pub fn count_users(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("Failed to count users")
    }
}

fn row_to_classroom(row: &rusqlite::Row) -> rusqlite::Result<ClassroomRecord> {
    Ok(ClassroomRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        year: row.get(2)?,
        username: row.get(3)?,
        pupil_count: row.get(4)?,
    })
}

fn row_to_pupil(row: &rusqlite::Row) -> rusqlite::Result<PupilRecord> {
    Ok(PupilRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        classroom_id: row.get(2)?,
        classroom: row.get(3)?,
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        salt: row.get(3)?,
        is_admin: row.get(4)?,
    })
}
