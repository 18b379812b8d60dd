use anyhow::Result;
use std::path::Path;

use super::Session;
use crate::barcode::scan_for_isbn;
use crate::upload::{check_upload, FileType};

pub fn run(session: &Session, image: &Path, json: bool) -> Result<()> {
    check_upload(image, FileType::Image)?;
    let isbns = scan_for_isbn(image, &session.config.scanner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&isbns)?);
    } else if isbns.is_empty() {
        println!("No ISBN found in provided image.");
    } else {
        for isbn in isbns {
            println!("{}", isbn);
        }
    }
    Ok(())
}
