//! Encrypted persistent storage for the registry.

use super::Registry;
use crate::error::ServiceError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Domain separator mixed into the storage key.
const KEY_DERIVATION_CONTEXT: &str = "registration-service/registry";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// AES-256-GCM encrypted file store for the registry.
pub struct EncryptedStore {
    storage_path: PathBuf,
    key: [u8; 32],
}

impl EncryptedStore {
    /// Create a store whose key is derived from a configured secret.
    pub fn new(storage_path: PathBuf, secret: &SecretString) -> Self {
        Self::with_key(storage_path, derive_key(secret))
    }

    /// Create a store with a raw 32-byte key.
    pub fn with_key(storage_path: PathBuf, key: [u8; 32]) -> Self {
        Self { storage_path, key }
    }

    /// Save the registry to encrypted persistent storage.
    ///
    /// File format: [12 bytes nonce][ciphertext with auth tag]
    pub async fn save(&self, registry: &Registry) -> Result<(), ServiceError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        // Generate random nonce
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = serde_json::to_vec(registry)?;
        let ciphertext = cipher.encrypt(nonce, plaintext.as_ref())?;

        let mut data = nonce_bytes.to_vec();
        data.extend(ciphertext);

        // Ensure parent directory exists
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file + rename
        let temp_path = self.storage_path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.storage_path).await?;

        debug!(
            "Saved encrypted registry ({} bytes) to {:?}",
            data.len(),
            self.storage_path
        );
        Ok(())
    }

    /// Load the registry from encrypted persistent storage.
    ///
    /// Returns an empty registry if the file doesn't exist.
    pub async fn load(&self) -> Result<Registry, ServiceError> {
        if !self.storage_path.exists() {
            info!(
                "Registry file not found at {:?}, starting with empty registry",
                self.storage_path
            );
            return Ok(Registry::new());
        }

        let data = fs::read(&self.storage_path).await?;

        if data.len() < NONCE_SIZE {
            return Err(ServiceError::Encryption("Registry file truncated".to_string()));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let ciphertext = &data[NONCE_SIZE..];

        let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| {
            ServiceError::Encryption(
                "Failed to decrypt registry. Check STORE__ENCRYPTION_KEY.".to_string(),
            )
        })?;

        let registry: Registry = serde_json::from_slice(&plaintext)?;

        info!(
            "Loaded encrypted registry with {} records from {:?}",
            registry.count(),
            self.storage_path
        );
        Ok(registry)
    }

    /// Check if a registry file exists.
    pub fn exists(&self) -> bool {
        self.storage_path.exists()
    }
}

/// SHA-256(context || secret)
fn derive_key(secret: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DERIVATION_CONTEXT.as_bytes());
    hasher.update(secret.expose_secret().as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

/// In-memory store when persistence is disabled.
pub struct MemoryStore;

impl MemoryStore {
    /// "Save" does nothing for memory store.
    pub async fn save(&self, _registry: &Registry) -> Result<(), ServiceError> {
        debug!("Memory store: save is a no-op");
        Ok(())
    }

    /// "Load" returns an empty registry.
    pub async fn load(&self) -> Result<Registry, ServiceError> {
        debug!("Memory store: returning empty registry");
        Ok(Registry::new())
    }
}

/// Storage backend for the registry.
pub enum Store {
    /// Encrypted file storage
    Encrypted(EncryptedStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl Store {
    /// Encrypted file store keyed from `secret`.
    pub fn encrypted(storage_path: PathBuf, secret: &SecretString) -> Self {
        Store::Encrypted(EncryptedStore::new(storage_path, secret))
    }

    /// Memory store.
    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    /// Save the registry.
    pub async fn save(&self, registry: &Registry) -> Result<(), ServiceError> {
        match self {
            Store::Encrypted(s) => s.save(registry).await,
            Store::Memory(s) => s.save(registry).await,
        }
    }

    /// Load the registry.
    pub async fn load(&self) -> Result<Registry, ServiceError> {
        match self {
            Store::Encrypted(s) => s.load().await,
            Store::Memory(s) => s.load().await,
        }
    }
}
