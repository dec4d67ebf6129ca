use crate::domain::money::Balance;
use crate::domain::ports::SharedNotifier;
use serde::Serialize;
use tracing::warn;

/// Outcome of a post-commit notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Delivery {
    Delivered,
    Failed(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// A committed result together with how notifying the user went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notified<T> {
    #[serde(flatten)]
    pub value: T,
    pub notification: Delivery,
}

/// Sends the user-facing emails that follow registration, top-ups and
/// rentals. Delivery problems are logged and reported, never raised.
#[derive(Clone)]
pub struct Notifications {
    notifier: SharedNotifier,
}

impl Notifications {
    pub fn new(notifier: SharedNotifier) -> Self {
        Self { notifier }
    }

    pub async fn welcome(&self, email: &str, name: &str) -> Delivery {
        self.send(
            email,
            &format!("Welcome to Car Rental, {name}!"),
            "<h1>Welcome!</h1><br><p>You have successfully registered to Car Rental.</p>"
                .to_string(),
        )
        .await
    }

    pub async fn top_up(&self, email: &str, balance: Balance) -> Delivery {
        self.send(
            email,
            "Top Up Successful!",
            format!(
                "<h1>Top Up Successful!</h1><br><p>Your Car Rental Deposit is now {balance}.</p>"
            ),
        )
        .await
    }

    pub async fn rental(&self, email: &str, balance: Balance) -> Delivery {
        self.send(
            email,
            "Thank you for renting from us!",
            format!(
                "<h1>Thank you!</h1><br><p>Thank you for using our service!<br>Your Car Rental Deposit is now {balance}.</p>"
            ),
        )
        .await
    }

    async fn send(&self, email: &str, subject: &str, body: String) -> Delivery {
        match self.notifier.notify(email, subject, &body).await {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                warn!(to = %email, subject, error = %e, "notification failed");
                Delivery::Failed(e.to_string())
            }
        }
    }
}
