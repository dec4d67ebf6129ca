//! Process-wide settings, read once at startup from flags, the environment
//! or a `.env` file and handed to the components that need them.

use chrono::Duration;
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Secret used to sign session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Lifetime of issued session tokens, in seconds.
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = 86_400)]
    pub token_ttl_secs: u32,

    /// bcrypt work factor for password hashes.
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,

    /// Sender address shown on outgoing notifications.
    #[arg(long, env = "MAIL_FROM", default_value = "no-reply@car-rental.local")]
    pub mail_from: String,
}

impl AppConfig {
    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            secret: self.jwt_secret.clone(),
            token_ttl: Duration::seconds(i64::from(self.token_ttl_secs)),
            bcrypt_cost: self.bcrypt_cost,
        }
    }
}

/// Everything the auth gateway and the account service need to issue and
/// check credentials.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Settings for tests: a fixed secret and the cheapest bcrypt cost.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            token_ttl: Duration::hours(1),
            bcrypt_cost: 4,
        }
    }
}
