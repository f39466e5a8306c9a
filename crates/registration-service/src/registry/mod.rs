//! Registration records with encrypted persistence.

mod encrypted;
mod memory;

pub use encrypted::{EncryptedStore, MemoryStore, Store};
pub use memory::Registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to every new registrant.
pub const DEFAULT_ROLE: &str = "employee";

/// Approval status of a registration request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Submitted, waiting for an administrator
    Pending,
    /// Accepted by an administrator
    Approved,
    /// Declined by an administrator
    Rejected,
}

/// A registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Telegram user id, as verified from init data
    pub telegram_id: String,

    pub name: String,

    pub phone: String,

    pub role: String,

    pub status: UserStatus,

    /// When the request was submitted
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a new pending registration.
    pub fn new_pending(telegram_id: String, name: String, phone: String) -> Self {
        Self {
            telegram_id,
            name,
            phone,
            role: DEFAULT_ROLE.to_string(),
            status: UserStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
