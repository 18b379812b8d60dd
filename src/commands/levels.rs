use anyhow::Result;
use colored::Colorize;

use super::Session;

pub fn add(session: &Session, level: &str, age_min: Option<i64>, age_max: Option<i64>) -> Result<()> {
    let db = session.open_db()?;
    session.login_admin(&db)?;

    db.add_reading_level(level, age_min, age_max)?;
    println!("{} reading level {}", "Added".green(), level.yellow());
    Ok(())
}

pub fn list(session: &Session) -> Result<()> {
    let db = session.open_db()?;
    let levels = db.list_reading_levels()?;

    if levels.is_empty() {
        println!("No reading levels defined.");
        return Ok(());
    }
    for level in levels {
        let ages = match (level.age_min, level.age_max) {
            (Some(min), Some(max)) => format!("ages {}-{}", min, max),
            (Some(min), None) => format!("ages {}+", min),
            (None, Some(max)) => format!("up to age {}", max),
            (None, None) => String::new(),
        };
        println!("{} {}", level.level.yellow(), ages.dimmed());
    }
    Ok(())
}
