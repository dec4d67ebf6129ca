//! Pieces shared by the repository adapters: per-user row locks and the
//! staged write set a transaction accumulates until commit.

use crate::domain::money::Balance;
use crate::domain::product::ProductId;
use crate::domain::record::{Record, RecordId};
use crate::domain::user::UserId;
use crate::error::{RentalError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user row, created on first use.
///
/// Holding the guard is what makes a balance read-modify-write safe against
/// another transaction for the same user.
#[derive(Default, Clone)]
pub struct UserLocks {
    locks: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    InsertRecord(Record),
    SetDeposit { user_id: UserId, deposit: Balance },
    DeleteRecord(RecordId),
    DeleteProduct(ProductId),
}

/// Read access to committed state, used to validate a write set at commit.
pub trait CommittedView {
    fn user_exists(&self, id: UserId) -> Result<bool>;
    fn product_exists(&self, id: ProductId) -> Result<bool>;
    fn record_exists(&self, id: RecordId) -> Result<bool>;
    fn records_of_product(&self, id: ProductId) -> Result<Vec<RecordId>>;
}

/// Write set plus the row locks held by one open transaction.
#[derive(Default)]
pub struct Staging {
    writes: Vec<StagedWrite>,
    guards: HashMap<UserId, OwnedMutexGuard<()>>,
}

impl Staging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds_lock(&self, user_id: UserId) -> bool {
        self.guards.contains_key(&user_id)
    }

    pub fn hold(&mut self, user_id: UserId, guard: OwnedMutexGuard<()>) {
        self.guards.insert(user_id, guard);
    }

    pub fn push(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn stage_deposit(&mut self, user_id: UserId, deposit: Balance) -> Result<()> {
        if !self.holds_lock(user_id) {
            return Err(RentalError::TransactionFailure(format!(
                "deposit of user {user_id} updated without holding its lock"
            )));
        }
        self.push(StagedWrite::SetDeposit { user_id, deposit });
        Ok(())
    }

    /// The deposit this transaction has staged for `user_id`, if any.
    pub fn pending_deposit(&self, user_id: UserId) -> Option<Balance> {
        self.writes.iter().rev().find_map(|write| match write {
            StagedWrite::SetDeposit { user_id: id, deposit } if *id == user_id => Some(*deposit),
            _ => None,
        })
    }

    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    /// Consumes the staging area, releasing its locks once the returned
    /// writes have been applied and dropped.
    pub fn into_writes(self) -> (Vec<StagedWrite>, HashMap<UserId, OwnedMutexGuard<()>>) {
        (self.writes, self.guards)
    }
}

/// Checks that applying `writes` in order to `view` keeps every reference
/// valid. Fails with `TransactionFailure` on the first violation.
pub fn validate(writes: &[StagedWrite], view: &impl CommittedView) -> Result<()> {
    let mut deleted_products: HashSet<ProductId> = HashSet::new();
    let mut deleted_records: HashSet<RecordId> = HashSet::new();
    let mut inserted: HashMap<RecordId, ProductId> = HashMap::new();

    for write in writes {
        match write {
            StagedWrite::InsertRecord(record) => {
                if !view.user_exists(record.user_id)? {
                    return Err(failure(format!("user {} does not exist", record.user_id)));
                }
                if deleted_products.contains(&record.product_id)
                    || !view.product_exists(record.product_id)?
                {
                    return Err(failure(format!(
                        "product {} does not exist",
                        record.product_id
                    )));
                }
                inserted.insert(record.id, record.product_id);
            }
            StagedWrite::SetDeposit { user_id, .. } => {
                if !view.user_exists(*user_id)? {
                    return Err(failure(format!("user {user_id} does not exist")));
                }
            }
            StagedWrite::DeleteRecord(id) => {
                let exists = inserted.contains_key(id) || view.record_exists(*id)?;
                if !exists || !deleted_records.insert(*id) {
                    return Err(failure(format!("record {id} does not exist")));
                }
            }
            StagedWrite::DeleteProduct(id) => {
                if !view.product_exists(*id)? || !deleted_products.insert(*id) {
                    return Err(failure(format!("product {id} does not exist")));
                }
                let orphaned = view
                    .records_of_product(*id)?
                    .into_iter()
                    .chain(
                        inserted
                            .iter()
                            .filter(|(_, product)| *product == id)
                            .map(|(record, _)| *record),
                    )
                    .any(|record| !deleted_records.contains(&record));
                if orphaned {
                    return Err(failure(format!(
                        "product {id} still has rental records"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn failure(message: String) -> RentalError {
    RentalError::TransactionFailure(message)
}
