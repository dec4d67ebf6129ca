use super::money::RentalLength;
use super::product::ProductId;
use super::user::UserId;
use crate::error::{RentalError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type RecordId = u32;

/// One rental: a user holding a product for a fixed range of days.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Record {
    pub id: RecordId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A record staged inside a transaction, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewRecord {
    /// Fails with `InvalidInput` when the end date falls outside the range
    /// `chrono` can represent.
    pub fn starting_at(
        user_id: UserId,
        product_id: ProductId,
        start_date: DateTime<Utc>,
        length: RentalLength,
    ) -> Result<Self> {
        let end_date = Duration::try_days(i64::from(length.days()))
            .and_then(|span| start_date.checked_add_signed(span))
            .ok_or_else(|| {
                RentalError::InvalidInput(format!(
                    "rental of {} days ends past the last representable date",
                    length.days()
                ))
            })?;
        Ok(Self {
            user_id,
            product_id,
            start_date,
            end_date,
        })
    }

    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            user_id: self.user_id,
            product_id: self.product_id,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
