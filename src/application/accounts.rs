use super::settle;
use crate::domain::money::Balance;
use crate::domain::ports::{RepositoryTx, SharedAuthGateway, SharedEmailVerifier, SharedRepository};
use crate::domain::user::{NewUser, Role, User, UserId, UserWithRecords};
use crate::error::{RentalError, Result};
use crate::infrastructure::password;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// An authenticated user and the token that proves it.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopUpReceipt {
    #[serde(rename = "Current Deposit")]
    pub balance: Balance,
    #[serde(skip)]
    pub email: String,
}

/// Registration, login and deposit management.
#[derive(Clone)]
pub struct AccountService {
    repository: SharedRepository,
    auth: SharedAuthGateway,
    verifier: SharedEmailVerifier,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(
        repository: SharedRepository,
        auth: SharedAuthGateway,
        verifier: SharedEmailVerifier,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            repository,
            auth,
            verifier,
            bcrypt_cost,
        }
    }

    /// Registers a customer and issues their first token.
    pub async fn register(&self, registration: Registration) -> Result<Session> {
        let verdict = self.verifier.verify(&registration.email).await?;
        if !verdict.accepted() {
            return Err(RentalError::InvalidInput(format!(
                "email not valid or deliverable (isValid = {}, isDeliverable = {})",
                verdict.is_valid, verdict.is_deliverable
            )));
        }

        let user = self.provision(registration, Role::Customer).await?;
        let token = self.auth.issue_token(&user)?;
        Ok(Session { user, token })
    }

    /// Creates an account with the given role and an empty deposit, without
    /// the deliverability check. Registration goes through here; operators
    /// use it directly to seed administrators.
    pub async fn provision(&self, registration: Registration, role: Role) -> Result<User> {
        let Registration {
            name,
            email,
            password,
        } = registration;
        if name.trim().is_empty() {
            return Err(RentalError::InvalidInput("name must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(RentalError::InvalidInput("password must not be empty".to_string()));
        }

        let password_hash = password::hash_password(&password, self.bcrypt_cost)?;
        let user = self
            .repository
            .insert_user(NewUser {
                name,
                email,
                password_hash,
                deposit: Balance::ZERO,
                role,
            })
            .await?;
        info!(user_id = user.id, %role, "user registered");
        Ok(user)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        let invalid = || RentalError::InvalidInput("invalid email or password".to_string());
        let user = self
            .repository
            .find_user_by_email(&credentials.email)
            .await?
            .ok_or_else(invalid)?;
        if !password::verify_password(&credentials.password, &user.password_hash) {
            warn!(user_id = user.id, "login rejected");
            return Err(invalid());
        }
        let token = self.auth.issue_token(&user)?;
        Ok(Session { user, token })
    }

    /// Adds `amount` to the user's deposit under the user's row lock.
    pub async fn top_up(&self, user_id: UserId, amount: Decimal) -> Result<TopUpReceipt> {
        let amount = Balance::new(amount)?;
        let user = self.repository.get_user(user_id).await?;
        user.deposit.checked_add(amount)?;

        let mut tx = self.repository.begin().await?;
        let outcome = stage_credit(tx.as_mut(), user_id, amount).await;
        let balance = settle(tx, outcome).await?;

        info!(user_id, %amount, %balance, "top-up committed");
        Ok(TopUpReceipt {
            balance,
            email: user.email,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserWithRecords>> {
        let mut listing = Vec::new();
        for user in self.repository.list_users().await? {
            let records = self.repository.records_for_user(user.id).await?;
            listing.push(UserWithRecords { user, records });
        }
        Ok(listing)
    }

    pub async fn get_user(&self, id: UserId) -> Result<UserWithRecords> {
        let user = self.repository.get_user(id).await?;
        let records = self.repository.records_for_user(id).await?;
        Ok(UserWithRecords { user, records })
    }
}

async fn stage_credit(tx: &mut dyn RepositoryTx, user_id: UserId, amount: Balance) -> Result<Balance> {
    let user = tx.lock_user(user_id).await?;
    let balance = user.deposit.checked_add(amount)?;
    tx.update_user_deposit(user_id, balance).await?;
    Ok(balance)
}
