//! Encrypted configuration values.
//!
//! Responsibilities:
//! - Provide AES-256-GCM encryption and decryption of individual config values.
//! - Walk a parsed configuration and decrypt every encrypted string in place.
//! - Manage master key sources (Keyring, Env, Raw).
//!
//! Does NOT handle:
//! - Reading configuration files (see `loader`).
//!
//! Invariants:
//! - Encrypted values have the form `enc:<hex nonce>:<hex ciphertext>`.
//! - Strings without the `enc:` prefix are never touched.
//! - Decrypted plaintext is never logged.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngExt;
use serde_json::Value;
use thiserror::Error;

use crate::constants::{ENCRYPTED_VALUE_PREFIX, ENV_MASTER_KEY, KEYRING_MASTER_KEY_ACCOUNT};

/// Errors that can occur during encryption operations.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key size: expected 32 bytes")]
    InvalidKeySize,

    #[error("Invalid nonce size: expected 12 bytes")]
    InvalidNonceSize,

    #[error("Malformed encrypted value: expected enc:<nonce>:<ciphertext>")]
    MalformedValue,

    #[error("Keyring error: {0}")]
    KeyringError(#[from] keyring::Error),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

pub type Result<T> = std::result::Result<T, EncryptionError>;

/// Sources for the master encryption key.
#[derive(Debug, Clone)]
pub enum MasterKeySource {
    /// Use a hex key stored in the OS keyring.
    Keyring,
    /// Use a hex key provided in an environment variable.
    Env(String),
    /// Use a key supplied directly by the caller.
    Raw([u8; 32]),
}

impl Default for MasterKeySource {
    fn default() -> Self {
        Self::Env(ENV_MASTER_KEY.to_string())
    }
}

impl MasterKeySource {
    /// Resolves the master key source into a 32-byte key.
    pub fn resolve(&self) -> Result<[u8; 32]> {
        match self {
            Self::Keyring => {
                let entry =
                    keyring::Entry::new(crate::types::KEYRING_SERVICE, KEYRING_MASTER_KEY_ACCOUNT)?;
                decode_key(&entry.get_password()?)
            }
            Self::Env(var_name) => {
                let val = std::env::var(var_name).map_err(|_| {
                    EncryptionError::EnvError(format!("Environment variable {} not set", var_name))
                })?;
                decode_key(val.trim())
            }
            Self::Raw(key) => Ok(*key),
        }
    }
}

fn decode_key(hex_key: &str) -> Result<[u8; 32]> {
    let bytes =
        hex::decode(hex_key).map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(EncryptionError::InvalidKeySize);
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Core cryptographic logic for AES-256-GCM.
pub struct Encryptor;

impl Encryptor {
    /// Encrypts data using AES-256-GCM.
    /// Returns (ciphertext + tag, nonce).
    pub fn encrypt(data: &[u8], key: &[u8; 32]) -> Result<(Vec<u8>, [u8; 12])> {
        let cipher = Aes256Gcm::new(key.into());
        let mut nonce_bytes = [0u8; 12];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        Ok((ciphertext, nonce_bytes))
    }

    /// Decrypts data using AES-256-GCM.
    pub fn decrypt(ciphertext: &[u8], key: &[u8; 32], nonce: &[u8; 12]) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(key.into());
        let nonce = Nonce::from_slice(nonce);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        Ok(plaintext)
    }
}

/// Whether `value` is an `enc:`-prefixed encrypted string.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_VALUE_PREFIX)
}

/// Encrypts `plaintext` into an `enc:<hex nonce>:<hex ciphertext>` string.
pub fn encrypt_value(plaintext: &str, key: &[u8; 32]) -> Result<String> {
    let (ciphertext, nonce) = Encryptor::encrypt(plaintext.as_bytes(), key)?;
    Ok(format!(
        "{}{}:{}",
        ENCRYPTED_VALUE_PREFIX,
        hex::encode(nonce),
        hex::encode(ciphertext)
    ))
}

/// Decrypts a single `enc:`-prefixed string.
pub fn decrypt_value(value: &str, key: &[u8; 32]) -> Result<String> {
    let payload = value
        .strip_prefix(ENCRYPTED_VALUE_PREFIX)
        .ok_or(EncryptionError::MalformedValue)?;
    let (nonce_hex, ciphertext_hex) = payload
        .split_once(':')
        .ok_or(EncryptionError::MalformedValue)?;

    let nonce_bytes =
        hex::decode(nonce_hex).map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;
    let nonce: [u8; 12] = nonce_bytes
        .try_into()
        .map_err(|_| EncryptionError::InvalidNonceSize)?;
    let ciphertext = hex::decode(ciphertext_hex)
        .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

    let plaintext = Encryptor::decrypt(&ciphertext, key, &nonce)?;
    String::from_utf8(plaintext).map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))
}

/// Whether any string inside `value` is encrypted.
pub fn contains_encrypted(value: &Value) -> bool {
    match value {
        Value::String(s) => is_encrypted(s),
        Value::Array(items) => items.iter().any(contains_encrypted),
        Value::Object(map) => map.values().any(contains_encrypted),
        _ => false,
    }
}

/// Decrypts every encrypted string inside `value`, recursing through arrays and objects.
pub fn decrypt_tree(value: &mut Value, key: &[u8; 32]) -> Result<()> {
    match value {
        Value::String(s) if is_encrypted(s) => {
            *s = decrypt_value(s, key)?;
        }
        Value::Array(items) => {
            for item in items {
                decrypt_tree(item, key)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                decrypt_tree(item, key)?;
            }
        }
        _ => {}
    }
    Ok(())
}
