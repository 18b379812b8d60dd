//! Checks applied to files handed to the library (barcode photos, rosters)

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("No files have been selected.")]
    NoneSelected,
    #[error("Could not find the file! ({0})")]
    NotFound(String),
    #[error("This file type is not permitted.")]
    NotPermitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Image,
    Csv,
}

impl FileType {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            FileType::Image => &["jpg", "jpeg", "png", "bmp"],
            FileType::Csv => &["csv"],
        }
    }
}

/// The file must exist and carry one of the extensions allowed for its type
pub fn check_upload(path: &Path, file_type: FileType) -> Result<(), UploadError> {
    if path.as_os_str().is_empty() {
        return Err(UploadError::NoneSelected);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or(UploadError::NotPermitted)?;
    if !file_type.allowed_extensions().contains(&extension.as_str()) {
        return Err(UploadError::NotPermitted);
    }

    if !path.is_file() {
        return Err(UploadError::NotFound(path.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allowed_extensions_any_case() {
        let temp = TempDir::new().unwrap();
        for name in ["cover.jpg", "cover.JPEG", "cover.Png", "cover.bmp"] {
            let path = temp.path().join(name);
            std::fs::write(&path, b"x").unwrap();
            assert_eq!(check_upload(&path, FileType::Image), Ok(()), "{}", name);
        }
    }

    #[test]
    fn test_wrong_type_rejected_before_existence() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            check_upload(&temp.path().join("roster.txt"), FileType::Csv),
            Err(UploadError::NotPermitted)
        );
        assert_eq!(
            check_upload(&temp.path().join("roster"), FileType::Csv),
            Err(UploadError::NotPermitted)
        );
        assert_eq!(
            check_upload(&temp.path().join("cover.gif"), FileType::Image),
            Err(UploadError::NotPermitted)
        );
    }

    #[test]
    fn test_missing_and_empty_paths() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            check_upload(&temp.path().join("roster.csv"), FileType::Csv),
            Err(UploadError::NotFound(_))
        ));
        assert_eq!(
            check_upload(Path::new(""), FileType::Csv),
            Err(UploadError::NoneSelected)
        );
    }
}
