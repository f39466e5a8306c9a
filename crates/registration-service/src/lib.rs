//! Registration service - Telegram Mini App employee registration.
//!
//! Registrants submit a request from a Telegram Mini App; the request is
//! only accepted when its init data verifies against the bot token and the
//! claimed Telegram id matches the signed one. An administrator logs in,
//! reviews pending requests and approves or rejects them, and registrants
//! poll their status.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod registry;

pub use auth::{AdminAuth, AdminClaims, TokenIssuer};
pub use config::Config;
pub use error::ServiceError;
pub use registry::{Registry, Store, UserRecord, UserStatus};
