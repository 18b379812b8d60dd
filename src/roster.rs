//! Classroom roster import from `classroom,year,pupil` CSV files

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::database::LibraryDb;
use crate::upload::{check_upload, FileType};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RosterRow {
    line: u64,
    classroom: String,
    year: i64,
    pupil: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Distinct classrooms created or updated
    pub classrooms: usize,
    /// Pupils added
    pub pupils: usize,
    /// Pupils already present in their classroom
    pub already_present: usize,
}

/// Import a roster file; nothing is stored unless every row is valid
pub fn import_roster(db: &mut LibraryDb, path: &Path) -> Result<ImportSummary> {
    check_upload(path, FileType::Csv)?;
    let file =
        std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let rows = read_rows(file).with_context(|| format!("Failed to read roster {:?}", path))?;
    import_rows(db, &rows)
}

fn read_rows(reader: impl Read) -> Result<Vec<RosterRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Row {} could not be parsed", index + 1))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 1);

        let field = |i: usize| record.get(i).filter(|v| !v.is_empty());
        let (Some(classroom), Some(year), Some(pupil)) = (field(0), field(1), field(2)) else {
            bail!("Line {}: expected classroom,year,pupil", line);
        };
        let year: i64 = year
            .parse()
            .with_context(|| format!("Line {}: year {:?} is not a number", line, year))?;

        rows.push(RosterRow {
            line,
            classroom: classroom.to_string(),
            year,
            pupil: pupil.to_string(),
        });
    }
    Ok(rows)
}

fn import_rows(db: &mut LibraryDb, rows: &[RosterRow]) -> Result<ImportSummary> {
    db.transaction(|db| {
        let mut summary = ImportSummary::default();
        let mut touched: Vec<i64> = Vec::new();
        // (name, id, pupil names already in it)
        let mut current: Option<(String, i64, Vec<String>)> = None;

        for row in rows {
            let switch = match current {
                Some((ref name, _, _)) => name != &row.classroom,
                None => true,
            };
            if switch {
                let id = match db.find_classroom(&row.classroom)? {
                    Some(existing) => {
                        if existing.year != row.year {
                            db.set_classroom_year(existing.id, row.year)?;
                        }
                        existing.id
                    }
                    None => db
                        .add_classroom(&row.classroom, row.year)
                        .with_context(|| format!("Line {}", row.line))?,
                };
                if !touched.contains(&id) {
                    touched.push(id);
                }
                let names = db.list_pupils(id)?.into_iter().map(|p| p.name).collect();
                debug!("Roster switched to classroom {} (line {})", row.classroom, row.line);
                current = Some((row.classroom.clone(), id, names));
            }

            let Some((_, classroom_id, ref mut names)) = current else {
                continue;
            };
            if names.contains(&row.pupil) {
                summary.already_present += 1;
                continue;
            }
            db.add_pupil(classroom_id, &row.pupil)
                .with_context(|| format!("Line {}", row.line))?;
            names.push(row.pupil.clone());
            summary.pupils += 1;
        }

        summary.classrooms = touched.len();
        info!(
            "Roster import: {} classrooms, {} pupils added",
            summary.classrooms, summary.pupils
        );
        Ok(summary)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::temp_db;
    use crate::upload::UploadError;
    use tempfile::TempDir;

    fn write_roster(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_rows_trims_and_unquotes() {
        let rows = read_rows(" Oak , 3,\"Smith, Amir\"\nAsh,1,Zara\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].classroom, "Oak");
        assert_eq!(rows[0].year, 3);
        assert_eq!(rows[0].pupil, "Smith, Amir");
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn test_read_rows_reports_bad_line() {
        let err = read_rows("Oak,3,Amir\nOak,three,Zara\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Line 2"));

        let err = read_rows("Oak,3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected classroom,year,pupil"));
    }

    #[test]
    fn test_import_groups_consecutive_rows() {
        let temp = TempDir::new().unwrap();
        let (_dir, mut db) = temp_db();
        let path = write_roster(&temp, "roster.csv", "Oak,3,Amir\nOak,3,Zara\nAsh,1,Bea\n");

        let summary = import_roster(&mut db, &path).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                classrooms: 2,
                pupils: 3,
                already_present: 0
            }
        );

        let oak = db.find_classroom("Oak").unwrap().unwrap();
        assert_eq!(oak.year, 3);
        assert_eq!(oak.pupil_count, 2);
        assert_eq!(db.find_classroom("Ash").unwrap().unwrap().pupil_count, 1);
    }

    #[test]
    fn test_reimport_reuses_classroom_and_updates_year() {
        let temp = TempDir::new().unwrap();
        let (_dir, mut db) = temp_db();
        let first = write_roster(&temp, "a.csv", "Oak,3,Amir\n");
        let second = write_roster(&temp, "b.csv", "Oak,4,Amir\nOak,4,Zara\n");

        import_roster(&mut db, &first).unwrap();
        let summary = import_roster(&mut db, &second).unwrap();
        assert_eq!(summary.pupils, 1);
        assert_eq!(summary.already_present, 1);

        let oak = db.find_classroom("Oak").unwrap().unwrap();
        assert_eq!(oak.year, 4);
        assert_eq!(oak.pupil_count, 2);
        assert_eq!(db.list_classrooms().unwrap().len(), 1);
    }

    #[test]
    fn test_bad_row_rolls_back_everything() {
        let temp = TempDir::new().unwrap();
        let (_dir, mut db) = temp_db();
        let path = write_roster(&temp, "roster.csv", "Oak,3,Amir\nAsh,x,Bea\n");

        assert!(import_roster(&mut db, &path).is_err());
        assert!(db.list_classrooms().unwrap().is_empty());
    }

    #[test]
    fn test_non_csv_rejected() {
        let temp = TempDir::new().unwrap();
        let (_dir, mut db) = temp_db();
        let path = write_roster(&temp, "roster.txt", "Oak,3,Amir\n");

        let err = import_roster(&mut db, &path).unwrap_err();
        assert_eq!(
            err.downcast::<UploadError>().unwrap(),
            UploadError::NotPermitted
        );
    }
}
