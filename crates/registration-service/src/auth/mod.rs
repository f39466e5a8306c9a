//! Administrator authentication.

mod token;

pub use token::{AdminClaims, TokenError, TokenIssuer};

use crate::config::AdminConfig;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Checks admin credentials and hands out session tokens.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    username: String,
    password: Option<SecretString>,
    tokens: TokenIssuer,
}

impl AdminAuth {
    pub fn new(username: impl Into<String>, password: Option<SecretString>, tokens: TokenIssuer) -> Self {
        Self {
            username: username.into(),
            password,
            tokens,
        }
    }

    /// Build from configuration, generating a token secret if none is set.
    pub fn from_config(config: &AdminConfig) -> Self {
        if config.password.is_none() {
            warn!("ADMIN__PASSWORD not set, admin login is disabled");
        }

        let secret = config.token_secret.clone().unwrap_or_else(|| {
            warn!("ADMIN__TOKEN_SECRET not set, admin tokens will not survive a restart");
            random_secret()
        });

        Self::new(
            config.username.clone(),
            config.password.clone(),
            TokenIssuer::new(secret, config.token_ttl),
        )
    }

    /// Compare credentials in constant time.
    ///
    /// Always false when no password is configured.
    pub fn check_credentials(&self, username: &str, password: &str) -> bool {
        let Some(expected) = &self.password else {
            return false;
        };

        let username_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(expected.expose_secret().as_bytes());
        (username_ok & password_ok).into()
    }

    /// Issue a session token for a logged-in admin.
    pub fn issue_token(&self, username: &str) -> Result<String, TokenError> {
        self.tokens.issue(username)
    }

    /// Validate a bearer token.
    pub fn verify_token(&self, token: &str) -> Result<AdminClaims, TokenError> {
        self.tokens.verify(token)
    }
}

fn random_secret() -> SecretString {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretString::new(hex::encode(bytes))
}
