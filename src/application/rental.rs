use super::settle;
use crate::domain::money::{Balance, RentalLength};
use crate::domain::ports::{RepositoryTx, SharedRepository};
use crate::domain::pricing;
use crate::domain::product::ProductId;
use crate::domain::record::{NewRecord, Record};
use crate::domain::user::UserId;
use crate::error::{RentalError, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

/// What a successful rental hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentalReceipt {
    #[serde(rename = "rental_record")]
    pub record: Record,
    #[serde(rename = "user_balance")]
    pub balance: Balance,
    /// Where to send the confirmation.
    #[serde(skip)]
    pub email: String,
}

/// The rental workflow.
///
/// A rental creates a record and debits the renter's deposit. Both writes
/// share one repository transaction, and the deposit check is repeated under
/// the user's row lock inside that transaction, so concurrent rentals for
/// one user can never overdraw it.
#[derive(Clone)]
pub struct RentalService {
    repository: SharedRepository,
}

impl RentalService {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    pub async fn rent_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rent_length_days: i64,
    ) -> Result<RentalReceipt> {
        let user = self.repository.get_user(user_id).await?;
        let product = self.repository.get_product(product_id).await?;
        let length = RentalLength::new(rent_length_days)?;
        let total_price = pricing::total_price(product.rental_price, length)?;
        let new_record = NewRecord::starting_at(user_id, product_id, Utc::now(), length)?;

        if user.deposit.checked_debit(total_price).is_none() {
            warn!(user_id, product_id, %total_price, deposit = %user.deposit, "rental rejected");
            return Err(RentalError::InsufficientFunds {
                required: total_price,
                available: user.deposit,
            });
        }

        let mut tx = self.repository.begin().await?;
        let outcome = stage_rental(tx.as_mut(), new_record, total_price).await;
        let (record, balance) = settle(tx, outcome).await.inspect_err(|e| {
            warn!(user_id, product_id, error = %e, "rental aborted");
        })?;

        info!(
            user_id,
            product_id,
            record_id = record.id,
            days = length.days(),
            %total_price,
            %balance,
            "rental committed"
        );
        Ok(RentalReceipt {
            record,
            balance,
            email: user.email,
        })
    }

    /// Rental history of one user, oldest first.
    pub async fn user_rents(&self, user_id: UserId) -> Result<Vec<Record>> {
        self.repository.records_for_user(user_id).await
    }
}

async fn stage_rental(
    tx: &mut dyn RepositoryTx,
    new_record: NewRecord,
    total_price: Balance,
) -> Result<(Record, Balance)> {
    let user_id = new_record.user_id;
    let user = tx.lock_user(user_id).await?;
    let balance = user
        .deposit
        .checked_debit(total_price)
        .ok_or(RentalError::InsufficientFunds {
            required: total_price,
            available: user.deposit,
        })?;

    let record = tx.create_record(new_record).await?;
    tx.update_user_deposit(user_id, balance).await?;
    Ok((record, balance))
}
