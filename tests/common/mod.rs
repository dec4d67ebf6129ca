#![allow(dead_code)]

use async_trait::async_trait;
use car_rental::application::accounts::AccountService;
use car_rental::application::catalog::CatalogService;
use car_rental::application::notifications::Notifications;
use car_rental::application::rental::RentalService;
use car_rental::config::AuthConfig;
use car_rental::domain::money::Balance;
use car_rental::domain::ports::{
    Notifier, Repository, RepositoryTx, SharedRepository, TxBox,
};
use car_rental::domain::product::{NewProduct, Product, ProductId};
use car_rental::domain::record::{NewRecord, Record, RecordId};
use car_rental::domain::user::{NewUser, Role, User, UserId};
use car_rental::error::{RentalError, Result};
use car_rental::infrastructure::email::SyntaxEmailVerifier;
use car_rental::infrastructure::in_memory::InMemoryRepository;
use car_rental::infrastructure::jwt::JwtAuthGateway;
use car_rental::interfaces::api::RentalApi;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "integration-secret";

/// Where a [`FaultyRepository`] transaction should blow up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Fail the deposit update, i.e. after the record insert of a rental.
    pub update_deposit: bool,
    /// Fail the n-th `delete_record` call (1-based) of any transaction.
    pub delete_record_call: Option<usize>,
    /// Fail at commit, after every write was staged.
    pub commit: bool,
}

/// Wraps an in-memory repository and injects failures into its transactions.
#[derive(Clone)]
pub struct FaultyRepository {
    inner: InMemoryRepository,
    faults: Faults,
    deletes: Arc<AtomicUsize>,
}

impl FaultyRepository {
    pub fn new(inner: InMemoryRepository, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn injected(point: &str) -> RentalError {
    RentalError::internal(format!("injected failure at {point}"))
}

#[async_trait]
impl Repository for FaultyRepository {
    async fn get_user(&self, id: UserId) -> Result<User> {
        self.inner.get_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.inner.insert_user(user).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.inner.get_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        self.inner.insert_product(product).await
    }

    async fn update_product(&self, product: Product) -> Result<()> {
        self.inner.update_product(product).await
    }

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<Record>> {
        self.inner.records_for_user(user_id).await
    }

    async fn records_for_product(&self, product_id: ProductId) -> Result<Vec<Record>> {
        self.inner.records_for_product(product_id).await
    }

    async fn begin(&self) -> Result<TxBox> {
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin().await?,
            faults: self.faults,
            deletes: self.deletes.clone(),
        }))
    }
}

struct FaultyTx {
    inner: TxBox,
    faults: Faults,
    deletes: Arc<AtomicUsize>,
}

#[async_trait]
impl RepositoryTx for FaultyTx {
    async fn lock_user(&mut self, id: UserId) -> Result<User> {
        self.inner.lock_user(id).await
    }

    async fn create_record(&mut self, record: NewRecord) -> Result<Record> {
        self.inner.create_record(record).await
    }

    async fn update_user_deposit(&mut self, id: UserId, deposit: Balance) -> Result<()> {
        if self.faults.update_deposit {
            return Err(injected("update_user_deposit"));
        }
        self.inner.update_user_deposit(id, deposit).await
    }

    async fn delete_record(&mut self, id: RecordId) -> Result<()> {
        let call = self.deletes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.delete_record_call == Some(call) {
            return Err(injected("delete_record"));
        }
        self.inner.delete_record(id).await
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<()> {
        self.inner.delete_product(id).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let FaultyTx { inner, faults, .. } = *self;
        if faults.commit {
            inner.rollback().await?;
            return Err(injected("commit"));
        }
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Remembers every notification, or refuses them all when `failing`.
#[derive(Default)]
pub struct RecordingNotifier {
    failing: bool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    /// `(recipient, subject)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, email: &str, subject: &str, _body: &str) -> Result<()> {
        if self.failing {
            return Err(RentalError::DeliveryError("mail server down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), subject.to_string()));
        Ok(())
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::for_tests(SECRET)
}

pub fn gateway() -> Arc<JwtAuthGateway> {
    Arc::new(JwtAuthGateway::new(&auth_config()))
}

pub async fn seed_user(repo: &dyn Repository, email: &str, deposit: Decimal, role: Role) -> User {
    repo.insert_user(NewUser {
        name: email.split('@').next().unwrap_or_default().to_string(),
        email: email.to_string(),
        password_hash: String::new(),
        deposit: Balance::new(deposit).unwrap(),
        role,
    })
    .await
    .unwrap()
}

pub async fn seed_product(repo: &dyn Repository, name: &str, price: Decimal) -> Product {
    repo.insert_product(NewProduct {
        name: name.to_string(),
        description: String::new(),
        rental_price: Balance::new(price).unwrap(),
        stock: 1,
        category: "car".to_string(),
    })
    .await
    .unwrap()
}

pub fn accounts(repo: SharedRepository) -> AccountService {
    AccountService::new(repo, gateway(), Arc::new(SyntaxEmailVerifier), 4)
}

/// The request facade over `repo`, with `notifier` behind it.
pub fn api(repo: SharedRepository, notifier: Arc<dyn Notifier>) -> RentalApi {
    RentalApi::new(
        gateway(),
        accounts(repo.clone()),
        CatalogService::new(repo.clone()),
        RentalService::new(repo),
        Notifications::new(notifier),
    )
}
