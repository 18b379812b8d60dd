use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

use super::Session;
use crate::roster::import_roster;

pub fn import(session: &Session, file: &Path) -> Result<()> {
    let mut db = session.open_db()?;
    session.login_admin(&db)?;

    let summary = import_roster(&mut db, file)?;
    println!("Classroom details have been updated successfully!");
    if !session.quiet {
        println!(
            "  {} classroom(s), {} pupil(s) added, {} already present",
            summary.classrooms, summary.pupils, summary.already_present
        );
    }
    Ok(())
}

pub fn list(session: &Session) -> Result<()> {
    let db = session.open_db()?;
    session.login(&db)?;

    let classrooms = db.list_classrooms()?;
    if classrooms.is_empty() {
        println!("No classrooms yet. Import a roster with 'schoolshelf classrooms import'.");
        return Ok(());
    }
    for classroom in classrooms {
        let login = classroom
            .username
            .map(|u| format!("login: {}", u))
            .unwrap_or_else(|| "no login".to_string());
        println!(
            "{} (year {}) - {} pupil(s), {}",
            classroom.name.bold(),
            classroom.year,
            classroom.pupil_count,
            login.dimmed()
        );
    }
    Ok(())
}

pub fn pupils(session: &Session, name: &str) -> Result<()> {
    let db = session.open_db()?;
    session.login(&db)?;

    let Some(classroom) = db.find_classroom(name)? else {
        bail!("No classroom named {:?}", name);
    };
    let pupils = db.list_pupils(classroom.id)?;
    if pupils.is_empty() {
        println!("{} has no pupils.", classroom.name);
        return Ok(());
    }
    for pupil in pupils {
        println!("[{}] {}", pupil.id, pupil.name);
    }
    Ok(())
}
