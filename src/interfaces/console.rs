//! Operator console: seeds the repository, replays a request file through the
//! services and reports the resulting ledger.

use super::csv::request_reader::{LedgerRequest, RequestReader, RequestType};
use super::fixtures::Fixtures;
use crate::application::accounts::{AccountService, Registration};
use crate::application::catalog::CatalogService;
use crate::application::notifications::Notifications;
use crate::application::rental::RentalService;
use crate::config::AuthConfig;
use crate::domain::ports::SharedRepository;
use crate::domain::user::User;
use crate::error::Result;
use crate::infrastructure::email::SyntaxEmailVerifier;
use crate::infrastructure::jwt::JwtAuthGateway;
use crate::infrastructure::notifier::LogNotifier;
use rust_decimal::Decimal;
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

#[derive(Clone)]
pub struct Console {
    accounts: AccountService,
    catalog: CatalogService,
    rentals: RentalService,
    notifications: Notifications,
}

impl Console {
    pub fn new(
        accounts: AccountService,
        catalog: CatalogService,
        rentals: RentalService,
        notifications: Notifications,
    ) -> Self {
        Self {
            accounts,
            catalog,
            rentals,
            notifications,
        }
    }

    /// Wires the services over `repository` with the bundled adapters: JWT
    /// sessions, syntax-only email checks and log-only notifications.
    pub fn wire(repository: SharedRepository, auth: &AuthConfig, mail_from: &str) -> Self {
        let gateway = Arc::new(JwtAuthGateway::new(auth));
        Self::new(
            AccountService::new(
                repository.clone(),
                gateway,
                Arc::new(SyntaxEmailVerifier),
                auth.bcrypt_cost,
            ),
            CatalogService::new(repository.clone()),
            RentalService::new(repository),
            Notifications::new(Arc::new(LogNotifier::new(mail_from))),
        )
    }

    /// Creates the fixture users and products. Opening deposits are credited
    /// as top-ups. Stops at the first failure.
    pub async fn seed(&self, fixtures: Fixtures) -> Result<()> {
        let (users, products) = (fixtures.users.len(), fixtures.products.len());
        for fixture in fixtures.users {
            let user = self
                .accounts
                .provision(
                    Registration {
                        name: fixture.name,
                        email: fixture.email,
                        password: fixture.password,
                    },
                    fixture.role,
                )
                .await?;
            if fixture.deposit > Decimal::ZERO {
                self.accounts.top_up(user.id, fixture.deposit).await?;
            }
        }
        for product in fixtures.products {
            self.catalog.create_product(product).await?;
        }
        info!(users, products, "fixtures seeded");
        Ok(())
    }

    pub async fn apply(&self, request: &LedgerRequest) -> Result<()> {
        match request.r#type {
            RequestType::Topup => {
                let receipt = self
                    .accounts
                    .top_up(request.user()?, request.amount()?)
                    .await?;
                self.notifications
                    .top_up(&receipt.email, receipt.balance)
                    .await;
            }
            RequestType::Rent => {
                let receipt = self
                    .rentals
                    .rent_product(request.user()?, request.product()?, request.days()?)
                    .await?;
                self.notifications
                    .rental(&receipt.email, receipt.balance)
                    .await;
            }
            RequestType::Delete => {
                self.catalog.delete_product(request.product()?).await?;
            }
        }
        Ok(())
    }

    /// Applies every row in order. Rows that cannot be read or are rejected
    /// by the services are logged and skipped.
    pub async fn replay<R: Read>(&self, reader: RequestReader<R>) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for (index, row) in reader.requests().enumerate() {
            let line = index + 2;
            match row {
                Ok(request) => match self.apply(&request).await {
                    Ok(()) => summary.applied += 1,
                    Err(e) => {
                        warn!(line, error = %e, "Error processing request");
                        summary.rejected += 1;
                    }
                },
                Err(e) => {
                    warn!(line, error = %e, "Error reading request");
                    summary.rejected += 1;
                }
            }
        }
        info!(applied = summary.applied, rejected = summary.rejected, "replay finished");
        summary
    }

    /// Every user with their number of rental records, by id.
    pub async fn ledger(&self) -> Result<Vec<(User, usize)>> {
        Ok(self
            .accounts
            .list_users()
            .await?
            .into_iter()
            .map(|entry| (entry.user, entry.records.len()))
            .collect())
    }
}
