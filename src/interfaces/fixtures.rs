//! Seed data for the operator console.
//!
//! ```json
//! {
//!   "users": [
//!     { "name": "Ops", "email": "ops@example.com", "password": "pw", "role": "admin" },
//!     { "name": "Rafi", "email": "rafi@example.com", "password": "pw", "deposit": "100.0" }
//!   ],
//!   "products": [
//!     { "name": "Sedan", "rental_price": "10.0", "stock": 2, "category": "car" }
//!   ]
//! }
//! ```

use crate::domain::product::NewProduct;
use crate::domain::user::Role;
use crate::error::{RentalError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    /// Opening deposit, credited as a top-up after the account exists.
    #[serde(default)]
    pub deposit: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

impl Fixtures {
    pub fn from_reader(source: impl Read) -> Result<Self> {
        serde_json::from_reader(source)
            .map_err(|e| RentalError::InvalidInput(format!("malformed fixtures: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_with_defaults() {
        let json = r#"{
            "users": [
                { "name": "Ops", "email": "ops@example.com", "password": "pw", "role": "admin" },
                { "name": "Rafi", "email": "rafi@example.com", "password": "pw", "deposit": "100.0" }
            ],
            "products": [{ "name": "Sedan", "rental_price": "10.0" }]
        }"#;
        let fixtures = Fixtures::from_reader(json.as_bytes()).unwrap();

        assert_eq!(fixtures.users[0].role, Role::Admin);
        assert_eq!(fixtures.users[0].deposit, Decimal::ZERO);
        assert_eq!(fixtures.users[1].role, Role::Customer);
        assert_eq!(fixtures.users[1].deposit, dec!(100.0));
        assert_eq!(fixtures.products[0].stock, 0);
        assert_eq!(fixtures.products[0].rental_price.value(), dec!(10.0));
    }

    #[test]
    fn test_negative_price_rejected() {
        let json = r#"{ "products": [{ "name": "Sedan", "rental_price": "-1" }] }"#;
        assert!(matches!(
            Fixtures::from_reader(json.as_bytes()),
            Err(RentalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Fixtures::load("does/not/exist.json"),
            Err(RentalError::IoError(_))
        ));
    }
}
