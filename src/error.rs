use crate::domain::money::Balance;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RentalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("total price {required} is larger than user deposit {available}")]
    InsufficientFunds { required: Balance, available: Balance },
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),
    #[error("Notification delivery failed: {0}")]
    DeliveryError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl RentalError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
