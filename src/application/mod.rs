//! Application layer: the services that orchestrate domain rules against the
//! repository port.
//!
//! Every multi-write operation follows the same shape. Reads and validation
//! happen first and fail without side effects. Then the writes are staged on
//! one repository transaction and [`settle`]d: committed together, or rolled
//! back and reported as a `TransactionFailure`. Notifications go out only
//! after a commit and can never undo it.

pub mod accounts;
pub mod catalog;
pub mod notifications;
pub mod rental;

use crate::domain::ports::TxBox;
use crate::error::{RentalError, Result};
use tracing::error;

/// Commits `tx` if `outcome` succeeded, otherwise rolls it back.
///
/// Errors from inside the transaction come back as `TransactionFailure`,
/// except a failed balance re-check, which stays `InsufficientFunds`, and an
/// amount that went out of range, which stays `InvalidInput`.
pub(crate) async fn settle<T>(tx: TxBox, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(transaction_failure)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "rollback failed");
            }
            Err(transaction_failure(e))
        }
    }
}

fn transaction_failure(e: RentalError) -> RentalError {
    match e {
        RentalError::TransactionFailure(_)
        | RentalError::InsufficientFunds { .. }
        | RentalError::InvalidInput(_) => e,
        other => RentalError::TransactionFailure(other.to_string()),
    }
}
