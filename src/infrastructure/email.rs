use crate::domain::ports::{EmailVerdict, EmailVerifier};
use crate::error::Result;
use async_trait::async_trait;
use validator::ValidateEmail;

/// Offline stand-in for a deliverability lookup.
///
/// An address is valid when it parses as an email, and deliverable when its
/// domain also looks routable (contains a dot), which rules out things like
/// `root@localhost`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxEmailVerifier;

#[async_trait]
impl EmailVerifier for SyntaxEmailVerifier {
    async fn verify(&self, email: &str) -> Result<EmailVerdict> {
        let is_valid = email.validate_email();
        let is_deliverable = is_valid
            && email
                .rsplit_once('@')
                .is_some_and(|(_, domain)| domain.contains('.') && !domain.ends_with('.'));
        Ok(EmailVerdict {
            is_valid,
            is_deliverable,
        })
    }
}
