#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use car_rental::application::catalog::CatalogService;
use car_rental::application::rental::RentalService;
use car_rental::domain::ports::Repository;
use car_rental::domain::user::Role;
use car_rental::infrastructure::rocksdb::RocksDbRepository;
use common::{accounts, seed_product, seed_user};
use rust_decimal_macros::dec;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rental_db");

    let (user_id, record_id) = {
        let repo = RocksDbRepository::open(&path).unwrap();
        let user = seed_user(&repo, "renter@example.com", dec!(100.0), Role::Customer).await;
        let product = seed_product(&repo, "Sedan", dec!(10.0)).await;
        let receipt = RentalService::new(Arc::new(repo.clone()))
            .rent_product(user.id, product.id, 5)
            .await
            .unwrap();
        (user.id, receipt.record.id)
    };

    let repo = RocksDbRepository::open(&path).unwrap();
    let user = repo.get_user(user_id).await.unwrap();
    assert_eq!(user.deposit.value(), dec!(50.0));
    assert_eq!(
        repo.find_user_by_email("renter@example.com").await.unwrap(),
        Some(user)
    );
    let records = repo.records_for_user(user_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record_id);

    // Id allocation resumes after what is already stored.
    let next = seed_product(&repo, "Van", dec!(20.0)).await;
    assert_eq!(next.id, 2);
}

#[tokio::test]
async fn test_cascade_delete_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RocksDbRepository::open(dir.path()).unwrap();
    let user = seed_user(&repo, "renter@example.com", dec!(100.0), Role::Customer).await;
    let sedan = seed_product(&repo, "Sedan", dec!(10.0)).await;
    let van = seed_product(&repo, "Van", dec!(10.0)).await;
    let rentals = RentalService::new(Arc::new(repo.clone()));
    for product in [sedan.id, sedan.id, van.id] {
        rentals.rent_product(user.id, product, 1).await.unwrap();
    }

    let catalog = CatalogService::new(Arc::new(repo.clone()));
    assert_eq!(catalog.delete_product(sedan.id).await.unwrap(), 2);
    assert!(repo.get_product(sedan.id).await.is_err());
    assert!(repo.records_for_product(sedan.id).await.unwrap().is_empty());
    assert_eq!(repo.records_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rentals_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RocksDbRepository::open(dir.path()).unwrap();
    let user_id = seed_user(&repo, "renter@example.com", dec!(100.0), Role::Customer)
        .await
        .id;
    let product_id = seed_product(&repo, "Sedan", dec!(10.0)).await.id;
    let rentals = RentalService::new(Arc::new(repo.clone()));
    let accounts = accounts(Arc::new(repo.clone()));

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let rentals = rentals.clone();
        tasks.spawn(async move { rentals.rent_product(user_id, product_id, 4).await.is_ok() });
    }
    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 2);

    let receipt = accounts.top_up(user_id, dec!(5)).await.unwrap();
    assert_eq!(receipt.balance.value(), dec!(25.0));
    assert_eq!(repo.records_for_user(user_id).await.unwrap().len(), 2);
}

#[test]
fn test_cli_persists_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cli_db");

    let run = |args: &[&std::ffi::OsStr]| {
        let mut cmd = Command::new(cargo_bin!("car-rental"));
        cmd.env("JWT_SECRET", "secret")
            .env("BCRYPT_COST", "4")
            .args(args)
            .arg("--db-path")
            .arg(&db_path);
        cmd.assert().success()
    };

    run(&[
        "tests/fixtures/requests.csv".as_ref(),
        "--fixtures".as_ref(),
        "tests/fixtures/seed.json".as_ref(),
    ]);

    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type, user, product, amount, days").unwrap();
    writeln!(csv, "topup, 2, , 10,").unwrap();
    let output = run(&[csv.path().as_os_str()]).get_output().stdout.clone();

    let ledger = String::from_utf8(output).unwrap();
    assert!(ledger.contains("2,rafi@example.com,60,1"), "{ledger}");
    assert!(ledger.contains("3,mia@example.com,0.5,0"), "{ledger}");
}
