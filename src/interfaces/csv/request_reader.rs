use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::error::{RentalError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Topup,
    Rent,
    Delete,
}

/// One row of an operator request file.
///
/// Which columns must be filled depends on `type`:
/// `topup` needs `user` and `amount`, `rent` needs `user`, `product` and
/// `days`, `delete` needs `product`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LedgerRequest {
    pub r#type: RequestType,
    pub user: Option<UserId>,
    pub product: Option<ProductId>,
    pub amount: Option<Decimal>,
    pub days: Option<i64>,
}

impl LedgerRequest {
    pub fn user(&self) -> Result<UserId> {
        self.user.ok_or_else(|| missing("user"))
    }

    pub fn product(&self) -> Result<ProductId> {
        self.product.ok_or_else(|| missing("product"))
    }

    pub fn amount(&self) -> Result<Decimal> {
        self.amount.ok_or_else(|| missing("amount"))
    }

    pub fn days(&self) -> Result<i64> {
        self.days.ok_or_else(|| missing("days"))
    }
}

fn missing(column: &str) -> RentalError {
    RentalError::InvalidInput(format!("missing '{column}' column"))
}

/// Reads ledger requests from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing empty columns may be left out.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes the rows, one `Result` per row.
    pub fn requests(self) -> impl Iterator<Item = Result<LedgerRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(RentalError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, user, product, amount, days\n\
                    topup, 1, , 100.0,\n\
                    rent, 1, 2, , 5\n\
                    delete, , 2";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<LedgerRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 3);
        let topup = results[0].as_ref().unwrap();
        assert_eq!(topup.r#type, RequestType::Topup);
        assert_eq!(topup.amount().unwrap(), dec!(100.0));
        assert!(topup.product.is_none());

        let rent = results[1].as_ref().unwrap();
        assert_eq!(rent.days().unwrap(), 5);
        assert_eq!(rent.product().unwrap(), 2);

        let delete = results[2].as_ref().unwrap();
        assert_eq!(delete.r#type, RequestType::Delete);
        assert!(matches!(delete.user(), Err(RentalError::InvalidInput(_))));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, user, product, amount, days\nrefund, 1, , 1.0,\nrent, x, 1, , 1";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<LedgerRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(RentalError::CsvError(_))));
        assert!(results[1].is_err());
    }
}
