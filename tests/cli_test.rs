use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn console() -> Command {
    let mut cmd = Command::new(cargo_bin!("car-rental"));
    cmd.env("JWT_SECRET", "cli-test-secret")
        .env("BCRYPT_COST", "4")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = console();
    cmd.arg("tests/fixtures/requests.csv")
        .arg("--fixtures")
        .arg("tests/fixtures/seed.json");

    cmd.assert()
        .success()
        .stdout(
            "user,email,deposit,rentals\n\
             1,ops@example.com,0,0\n\
             2,rafi@example.com,50,1\n\
             3,mia@example.com,0.5,0\n",
        )
        .stderr(predicate::str::contains("Error reading request"))
        .stderr(predicate::str::contains("Error processing request"))
        .stderr(predicate::str::contains("product deleted"));

    Ok(())
}

#[test]
fn test_cli_without_fixtures_prints_empty_ledger() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type, user, product, amount, days").unwrap();
    writeln!(csv, "topup, 1, , 10.0,").unwrap();

    console()
        .arg(csv.path())
        .assert()
        .success()
        .stdout("user,email,deposit,rentals\n")
        .stderr(predicate::str::contains("user 1 not found"));
}

#[test]
fn test_cli_requires_jwt_secret() {
    let mut cmd = Command::new(cargo_bin!("car-rental"));
    cmd.env_remove("JWT_SECRET")
        .arg("tests/fixtures/requests.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("jwt-secret"));
}

#[test]
fn test_cli_missing_input_fails() {
    console()
        .arg("tests/fixtures/does-not-exist.csv")
        .assert()
        .failure();
}

#[test]
fn test_cli_bad_fixtures_fail() {
    let mut fixtures = tempfile::NamedTempFile::new().unwrap();
    write!(fixtures, "{{ not json").unwrap();

    console()
        .arg("tests/fixtures/requests.csv")
        .arg("--fixtures")
        .arg(fixtures.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed fixtures"));
}
