use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, info};

/// Writes outgoing notifications to the log instead of a mail server.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, email: &str, subject: &str, body: &str) -> Result<()> {
        info!(from = %self.from, to = %email, subject, "notification sent");
        debug!(body, "notification body");
        Ok(())
    }
}
