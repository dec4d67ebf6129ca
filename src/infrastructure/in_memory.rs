use super::staging::{self, CommittedView, StagedWrite, Staging, UserLocks};
use crate::domain::money::Balance;
use crate::domain::ports::{Repository, RepositoryTx, TxBox};
use crate::domain::product::{NewProduct, Product, ProductId};
use crate::domain::record::{NewRecord, Record, RecordId};
use crate::domain::user::{NewUser, User, UserId};
use crate::error::{RentalError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    records: BTreeMap<RecordId, Record>,
    last_user_id: UserId,
    last_product_id: ProductId,
    last_record_id: RecordId,
}

impl CommittedView for Tables {
    fn user_exists(&self, id: UserId) -> Result<bool> {
        Ok(self.users.contains_key(&id))
    }

    fn product_exists(&self, id: ProductId) -> Result<bool> {
        Ok(self.products.contains_key(&id))
    }

    fn record_exists(&self, id: RecordId) -> Result<bool> {
        Ok(self.records.contains_key(&id))
    }

    fn records_of_product(&self, id: ProductId) -> Result<Vec<RecordId>> {
        Ok(self
            .records
            .values()
            .filter(|record| record.product_id == id)
            .map(|record| record.id)
            .collect())
    }
}

impl Tables {
    fn apply(&mut self, writes: Vec<StagedWrite>) {
        for write in writes {
            match write {
                StagedWrite::InsertRecord(record) => {
                    self.records.insert(record.id, record);
                }
                StagedWrite::SetDeposit { user_id, deposit } => {
                    if let Some(user) = self.users.get_mut(&user_id) {
                        user.deposit = deposit;
                    }
                }
                StagedWrite::DeleteRecord(id) => {
                    self.records.remove(&id);
                }
                StagedWrite::DeleteProduct(id) => {
                    self.products.remove(&id);
                }
            }
        }
    }
}

/// A thread-safe in-memory repository.
///
/// Uses `Arc<RwLock<..>>` so clones share the same tables. Transactions stage
/// their writes and apply them under a single write lock at commit, so readers
/// never observe half a transaction.
#[derive(Default, Clone)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
    locks: UserLocks,
}

impl InMemoryRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: UserId) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RentalError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RentalError::InvalidInput(format!(
                "email {} is already registered",
                user.email
            )));
        }
        tables.last_user_id += 1;
        let user = user.into_user(tables.last_user_id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let tables = self.tables.read().await;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| RentalError::not_found("product", id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().cloned().collect())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.last_product_id += 1;
        let product = product.into_product(tables.last_product_id);
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product;
                Ok(())
            }
            None => Err(RentalError::not_found("product", product.id)),
        }
    }

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn records_for_product(&self, product_id: ProductId) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<TxBox> {
        Ok(Box::new(InMemoryTx {
            tables: self.tables.clone(),
            locks: self.locks.clone(),
            staging: Staging::new(),
        }))
    }
}

pub struct InMemoryTx {
    tables: Arc<RwLock<Tables>>,
    locks: UserLocks,
    staging: Staging,
}

#[async_trait]
impl RepositoryTx for InMemoryTx {
    async fn lock_user(&mut self, id: UserId) -> Result<User> {
        if !self.staging.holds_lock(id) {
            let guard = self.locks.acquire(id).await;
            self.staging.hold(id, guard);
        }
        let tables = self.tables.read().await;
        let mut user = tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RentalError::not_found("user", id))?;
        if let Some(deposit) = self.staging.pending_deposit(id) {
            user.deposit = deposit;
        }
        Ok(user)
    }

    async fn create_record(&mut self, record: NewRecord) -> Result<Record> {
        let id = {
            let mut tables = self.tables.write().await;
            tables.last_record_id += 1;
            tables.last_record_id
        };
        let record = record.into_record(id);
        self.staging.push(StagedWrite::InsertRecord(record.clone()));
        Ok(record)
    }

    async fn update_user_deposit(&mut self, id: UserId, deposit: Balance) -> Result<()> {
        self.staging.stage_deposit(id, deposit)
    }

    async fn delete_record(&mut self, id: RecordId) -> Result<()> {
        self.staging.push(StagedWrite::DeleteRecord(id));
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        self.staging.push(StagedWrite::DeleteProduct(id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTx {
            tables, staging, ..
        } = *self;
        let mut tables = tables.write().await;
        staging::validate(staging.writes(), &*tables)?;
        let (writes, _guards) = staging.into_writes();
        tables.apply(writes);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
