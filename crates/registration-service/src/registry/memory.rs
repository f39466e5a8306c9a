//! In-memory registry implementation.

use super::{UserRecord, UserStatus};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory registration records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Records indexed by Telegram id
    records: HashMap<String, UserRecord>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Get a record by Telegram id.
    pub fn find_one(&self, telegram_id: &str) -> Option<&UserRecord> {
        self.records.get(telegram_id)
    }

    /// Insert a new record. Fails if the Telegram id is already present.
    pub fn insert_one(&mut self, record: UserRecord) -> Result<(), ServiceError> {
        if self.records.contains_key(&record.telegram_id) {
            return Err(ServiceError::AlreadyRegistered(record.telegram_id));
        }
        self.records.insert(record.telegram_id.clone(), record);
        Ok(())
    }

    /// Remove a record, returning it if present.
    pub fn remove_one(&mut self, telegram_id: &str) -> Option<UserRecord> {
        self.records.remove(telegram_id)
    }

    /// Set the status of a record.
    ///
    /// Returns whether anything changed: false for an unknown id and for a
    /// record that already has `status`.
    pub fn update_status(&mut self, telegram_id: &str, status: UserStatus) -> bool {
        match self.records.get_mut(telegram_id) {
            Some(record) if record.status != status => {
                record.status = status;
                true
            }
            _ => false,
        }
    }

    /// Records with the given status, oldest first, at most `limit`.
    pub fn find_by_status(&self, status: UserStatus, limit: usize) -> Vec<UserRecord> {
        let mut records: Vec<UserRecord> = self
            .records
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.telegram_id.cmp(&b.telegram_id))
        });
        records.truncate(limit);
        records
    }

    /// Get the number of records.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}
