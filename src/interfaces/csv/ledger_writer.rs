use crate::domain::user::{User, UserId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    user: UserId,
    email: &'a str,
    deposit: Decimal,
    rentals: usize,
}

/// Writes the final state of every user as CSV.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per user with their rental count, then flushes.
    /// Deposits are printed without trailing zeros.
    pub fn write_ledger<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a User, usize)>,
    ) -> Result<()> {
        for (user, rentals) in entries {
            self.writer.serialize(LedgerRow {
                user: user.id,
                email: &user.email,
                deposit: user.deposit.value().normalize(),
                rentals,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
