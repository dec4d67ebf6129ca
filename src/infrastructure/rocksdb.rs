use super::staging::{self, CommittedView, StagedWrite, Staging, UserLocks};
use crate::domain::money::Balance;
use crate::domain::ports::{Repository, RepositoryTx, TxBox};
use crate::domain::product::{NewProduct, Product, ProductId};
use crate::domain::record::{NewRecord, Record, RecordId};
use crate::domain::user::{NewUser, Role, User, UserId};
use crate::error::{RentalError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

/// Column Family for user rows.
pub const CF_USERS: &str = "users";
/// Column Family for product rows.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for rental records.
pub const CF_RECORDS: &str = "records";
/// Column Family indexing user ids by email.
pub const CF_EMAILS: &str = "emails";

impl From<rocksdb::Error> for RentalError {
    fn from(e: rocksdb::Error) -> Self {
        RentalError::InternalError(Box::new(e))
    }
}

/// On-disk form of a user. Unlike the domain type's serialization it keeps
/// the password hash.
#[derive(Serialize, Deserialize)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
    deposit: Balance,
    role: Role,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            deposit: user.deposit,
            role: user.role,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            deposit: row.deposit,
            role: row.role,
        }
    }
}

struct IdCounters {
    user: AtomicU32,
    product: AtomicU32,
    record: AtomicU32,
}

/// A persistent repository backed by RocksDB.
///
/// Users, products and records live in separate Column Families keyed by
/// big-endian ids, so iteration order is id order. A transaction commits as a
/// single `WriteBatch`, which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbRepository {
    db: Arc<DB>,
    locks: UserLocks,
    ids: Arc<IdCounters>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbRepository {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the required column families exist and resumes id allocation
    /// after the highest id already stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_USERS, CF_PRODUCTS, CF_RECORDS, CF_EMAILS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let ids = IdCounters {
            user: AtomicU32::new(last_id(&db, CF_USERS)?),
            product: AtomicU32::new(last_id(&db, CF_PRODUCTS)?),
            record: AtomicU32::new(last_id(&db, CF_RECORDS)?),
        };

        Ok(Self {
            db: Arc::new(db),
            locks: UserLocks::new(),
            ids: Arc::new(ids),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        column_family(&self.db, name)
    }

    fn get_json<T: DeserializeOwned>(&self, name: &str, id: u32) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        match self.db.get_cf(&cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(codec)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, name: &str, id: u32) -> Result<bool> {
        let cf = self.cf(name)?;
        Ok(self.db.get_pinned_cf(&cf, id.to_be_bytes())?.is_some())
    }

    fn scan<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = self.cf(name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value).map_err(codec)?);
        }
        Ok(rows)
    }

    fn put_json<T: Serialize>(&self, name: &str, id: u32, value: &T) -> Result<()> {
        let cf = self.cf(name)?;
        let bytes = serde_json::to_vec(value).map_err(codec)?;
        self.db.put_cf(&cf, id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn load_user(&self, id: UserId) -> Result<User> {
        self.get_json::<UserRow>(CF_USERS, id)?
            .map(User::from)
            .ok_or_else(|| RentalError::not_found("user", id))
    }

    fn write_batch(&self, writes: Vec<StagedWrite>) -> Result<()> {
        let users = self.cf(CF_USERS)?;
        let products = self.cf(CF_PRODUCTS)?;
        let records = self.cf(CF_RECORDS)?;

        let mut batch = WriteBatch::default();
        for write in writes {
            match write {
                StagedWrite::InsertRecord(record) => {
                    let bytes = serde_json::to_vec(&record).map_err(codec)?;
                    batch.put_cf(&records, record.id.to_be_bytes(), bytes);
                }
                StagedWrite::SetDeposit { user_id, deposit } => {
                    let mut user = self.load_user(user_id)?;
                    user.deposit = deposit;
                    let bytes = serde_json::to_vec(&UserRow::from(&user)).map_err(codec)?;
                    batch.put_cf(&users, user_id.to_be_bytes(), bytes);
                }
                StagedWrite::DeleteRecord(id) => {
                    batch.delete_cf(&records, id.to_be_bytes());
                }
                StagedWrite::DeleteProduct(id) => {
                    batch.delete_cf(&products, id.to_be_bytes());
                }
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}

impl CommittedView for RocksDbRepository {
    fn user_exists(&self, id: UserId) -> Result<bool> {
        self.exists(CF_USERS, id)
    }

    fn product_exists(&self, id: ProductId) -> Result<bool> {
        self.exists(CF_PRODUCTS, id)
    }

    fn record_exists(&self, id: RecordId) -> Result<bool> {
        self.exists(CF_RECORDS, id)
    }

    fn records_of_product(&self, id: ProductId) -> Result<Vec<RecordId>> {
        Ok(self
            .scan::<Record>(CF_RECORDS)?
            .into_iter()
            .filter(|record| record.product_id == id)
            .map(|record| record.id)
            .collect())
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| RentalError::internal(format!("{name} column family not found")))
}

/// Highest id stored in a column family, or 0 when it is empty.
fn last_id(db: &DB, name: &str) -> Result<u32> {
    let cf = column_family(db, name)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _) = item?;
            decode_key(&key)
        }
        None => Ok(0),
    }
}

fn decode_key(key: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = key
        .try_into()
        .map_err(|_| RentalError::internal(format!("malformed key of {} bytes", key.len())))?;
    Ok(u32::from_be_bytes(bytes))
}

fn codec(e: serde_json::Error) -> RentalError {
    RentalError::InternalError(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Serialization error: {}", e),
    )))
}

#[async_trait]
impl Repository for RocksDbRepository {
    async fn get_user(&self, id: UserId) -> Result<User> {
        self.load_user(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let cf = self.cf(CF_EMAILS)?;
        match self.db.get_cf(&cf, email.as_bytes())? {
            Some(id) => Ok(self
                .get_json::<UserRow>(CF_USERS, decode_key(&id)?)?
                .map(User::from)),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .scan::<UserRow>(CF_USERS)?
            .into_iter()
            .map(User::from)
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(RentalError::InvalidInput(format!(
                "email {} is already registered",
                user.email
            )));
        }
        let id = self.ids.user.fetch_add(1, Ordering::SeqCst) + 1;
        let user = user.into_user(id);

        let users = self.cf(CF_USERS)?;
        let emails = self.cf(CF_EMAILS)?;
        let mut batch = WriteBatch::default();
        let bytes = serde_json::to_vec(&UserRow::from(&user)).map_err(codec)?;
        batch.put_cf(&users, id.to_be_bytes(), bytes);
        batch.put_cf(&emails, user.email.as_bytes(), id.to_be_bytes());
        self.db.write(batch)?;
        Ok(user)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.get_json(CF_PRODUCTS, id)?
            .ok_or_else(|| RentalError::not_found("product", id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.scan(CF_PRODUCTS)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let _guard = self.write_lock.lock().await;
        let id = self.ids.product.fetch_add(1, Ordering::SeqCst) + 1;
        let product = product.into_product(id);
        self.put_json(CF_PRODUCTS, id, &product)?;
        Ok(product)
    }

    async fn update_product(&self, product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.exists(CF_PRODUCTS, product.id)? {
            return Err(RentalError::not_found("product", product.id));
        }
        self.put_json(CF_PRODUCTS, product.id, &product)
    }

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<Record>> {
        Ok(self
            .scan::<Record>(CF_RECORDS)?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    async fn records_for_product(&self, product_id: ProductId) -> Result<Vec<Record>> {
        Ok(self
            .scan::<Record>(CF_RECORDS)?
            .into_iter()
            .filter(|r| r.product_id == product_id)
            .collect())
    }

    async fn begin(&self) -> Result<TxBox> {
        Ok(Box::new(RocksDbTx {
            repo: self.clone(),
            staging: Staging::new(),
        }))
    }
}

pub struct RocksDbTx {
    repo: RocksDbRepository,
    staging: Staging,
}

#[async_trait]
impl RepositoryTx for RocksDbTx {
    async fn lock_user(&mut self, id: UserId) -> Result<User> {
        if !self.staging.holds_lock(id) {
            let guard = self.repo.locks.acquire(id).await;
            self.staging.hold(id, guard);
        }
        let mut user = self.repo.load_user(id)?;
        if let Some(deposit) = self.staging.pending_deposit(id) {
            user.deposit = deposit;
        }
        Ok(user)
    }

    async fn create_record(&mut self, record: NewRecord) -> Result<Record> {
        let id = self.repo.ids.record.fetch_add(1, Ordering::SeqCst) + 1;
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
        let RocksDbTx { repo, staging } = *self;
        let _guard = repo.write_lock.lock().await;
        staging::validate(staging.writes(), &repo)
            .map_err(|e| match e {
                RentalError::TransactionFailure(_) => e,
                other => RentalError::TransactionFailure(other.to_string()),
            })?;
        let (writes, _locks) = staging.into_writes();
        repo.write_batch(writes)
            .map_err(|e| RentalError::TransactionFailure(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
