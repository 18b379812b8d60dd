use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("schoolshelf").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("schoolshelf"));
}

#[test]
fn test_books_find_help() {
    let mut cmd = Command::cargo_bin("schoolshelf").unwrap();
    cmd.args(["books", "find", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Look up book details online"))
        .stdout(predicate::str::contains("--isbn"))
        .stdout(predicate::str::contains("--title"))
        .stdout(predicate::str::contains("--direct"));
}

#[test]
fn test_loans_record_help() {
    let mut cmd = Command::cargo_bin("schoolshelf").unwrap();
    cmd.args(["loans", "record", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--book"))
        .stdout(predicate::str::contains("--pupil"))
        .stdout(predicate::str::contains("--barcode"));
}

#[test]
fn test_books_find_requires_isbn_or_title() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("schoolshelf").unwrap();
    cmd.arg("--db")
        .arg(temp.path().join("library.db"))
        .arg("--config")
        .arg(temp.path().join("config.toml"))
        .args(["books", "find"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--isbn or a --title"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "[library]\nper_page = \"lots\"\n").unwrap();

    let mut cmd = Command::cargo_bin("schoolshelf").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["books", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}
