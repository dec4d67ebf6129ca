use super::money::Balance;
use super::product::{NewProduct, Product, ProductId};
use super::record::{NewRecord, Record, RecordId};
use super::user::{NewUser, Role, User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persistence for users, products and rental records.
///
/// Reads outside a transaction see the last committed state and fail with
/// `NotFound` when the row is absent. Every write that must be atomic with
/// another one goes through a [`RepositoryTx`] obtained from [`begin`].
///
/// [`begin`]: Repository::begin
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Fails with `InvalidInput` when the email is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn get_product(&self, id: ProductId) -> Result<Product>;
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;
    async fn update_product(&self, product: Product) -> Result<()>;

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<Record>>;
    async fn records_for_product(&self, product_id: ProductId) -> Result<Vec<Record>>;

    async fn begin(&self) -> Result<TxBox>;
}

/// A unit of work against the repository.
///
/// Writes are staged and only become visible on [`commit`], all together or
/// not at all. Dropping a transaction without committing discards it.
///
/// [`commit`]: RepositoryTx::commit
#[async_trait]
pub trait RepositoryTx: Send {
    /// Takes the user's row lock for the rest of the transaction and returns
    /// the latest committed state of the user.
    async fn lock_user(&mut self, id: UserId) -> Result<User>;
    async fn create_record(&mut self, record: NewRecord) -> Result<Record>;
    /// Requires the user to have been locked by this transaction.
    async fn update_user_deposit(&mut self, id: UserId, deposit: Balance) -> Result<()>;
    async fn delete_record(&mut self, id: RecordId) -> Result<()>;
    async fn delete_product(&mut self, id: ProductId) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub type SharedRepository = Arc<dyn Repository>;
pub type TxBox = Box<dyn RepositoryTx>;

/// Who is calling, decoded once from their credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Issues and resolves session credentials.
pub trait AuthGateway: Send + Sync {
    fn issue_token(&self, user: &User) -> Result<String>;
    /// Fails with `Unauthorized` for missing, malformed or expired credentials.
    fn resolve_identity(&self, credential: &str) -> Result<Identity>;
}

/// Outbound user notifications. Failures surface as `DeliveryError`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &str, subject: &str, body: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerdict {
    pub is_valid: bool,
    pub is_deliverable: bool,
}

impl EmailVerdict {
    pub fn accepted(&self) -> bool {
        self.is_valid && self.is_deliverable
    }
}

/// Checks an address before a user may register with it.
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    async fn verify(&self, email: &str) -> Result<EmailVerdict>;
}

pub type SharedAuthGateway = Arc<dyn AuthGateway>;
pub type SharedNotifier = Arc<dyn Notifier>;
pub type SharedEmailVerifier = Arc<dyn EmailVerifier>;
