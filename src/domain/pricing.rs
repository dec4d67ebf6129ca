use super::money::{Balance, RentalLength};
use crate::error::Result;

/// Total cost of renting at `unit_price` per day for `length` days.
pub fn total_price(unit_price: Balance, length: RentalLength) -> Result<Balance> {
    unit_price.times(length.days())
}
