//! # Key Store
//!
//! Persistence for [`KeyMaterial`], split into three parts whose locations
//! come from an injected [`KeyLocator`].
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORED KEY PARTS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  locate_public_key()   ──► SPKI PEM public key          (required)     │
//! │  locate_private_key()  ──► base64 AEAD envelope         (required)     │
//! │  locate_passphrase()   ──► passphrase hint or empty     (required)     │
//! │                                                                         │
//! │  The passphrase itself is never written anywhere.                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A location is an opaque string: a path for [`FileKeyStore`], a map key for
//! [`MemoryKeyStore`]. The key algorithm is not stored; it is recovered from
//! the public key on read.

mod file;
mod memory;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use std::path::PathBuf;

use crate::config::KeyringConfig;
use crate::crypto::algorithm::AlgorithmParams;
use crate::crypto::keys::{KeyMaterial, KeyParameters};
use crate::error::Result;

/// Where each part of a keypair lives
pub trait KeyLocator: Send + Sync {
    /// Location of the public key
    fn locate_public_key(&self) -> String;

    /// Location of the encrypted private key
    fn locate_private_key(&self) -> String;

    /// Location of the passphrase hint
    fn locate_passphrase(&self) -> String;
}

/// Loads key material
pub trait KeyMaterialReader {
    /// Read the stored key material
    ///
    /// ## Errors
    ///
    /// `FileRead` when any of the three parts is missing or unreadable.
    fn read(&self) -> Result<KeyMaterial>;
}

/// Persists key material
pub trait KeyMaterialWriter {
    /// Write `material` after checking that `passphrase` and `salt` open its
    /// private key
    fn write(&self, material: &KeyMaterial, passphrase: &str, salt: &str) -> Result<()>;
}

/// Locator placing every part in one directory under a common prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLocator {
    directory: PathBuf,
    prefix: String,
}

impl DirectoryLocator {
    /// Parts named `{prefix}key.pem`, `{prefix}public.key.pem` and
    /// `{prefix}pass.txt` inside `directory`
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    fn part(&self, name: &str) -> String {
        self.directory
            .join(format!("{}{}", self.prefix, name))
            .to_string_lossy()
            .into_owned()
    }
}

impl KeyLocator for DirectoryLocator {
    fn locate_public_key(&self) -> String {
        self.part("public.key.pem")
    }

    fn locate_private_key(&self) -> String {
        self.part("key.pem")
    }

    fn locate_passphrase(&self) -> String {
        self.part("pass.txt")
    }
}

/// Fail with `DecryptPrivateKey` unless the credentials open the key
pub(crate) fn check_unlocks(
    material: &KeyMaterial,
    config: &KeyringConfig,
    passphrase: &str,
    salt: &str,
) -> Result<()> {
    KeyParameters::from_material_with_config(material.clone(), config)
        .private_key(passphrase, salt)
        .map(|_| ())
}

/// Rebuild key material from its stored parts
pub(crate) fn assemble(
    public_key: String,
    private_key_at_rest: String,
    passphrase_hint: Option<String>,
) -> Result<KeyMaterial> {
    let params = AlgorithmParams::detect(&public_key)?;
    Ok(KeyMaterial {
        public_key,
        private_key_at_rest: private_key_at_rest.trim().to_string(),
        params,
        passphrase_hint: passphrase_hint.filter(|hint| !hint.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_locator_names() {
        let locator = DirectoryLocator::new("/keys", "testing_key-");
        assert!(locator.locate_private_key().ends_with("testing_key-key.pem"));
        assert!(locator.locate_public_key().ends_with("testing_key-public.key.pem"));
        assert!(locator.locate_passphrase().ends_with("testing_key-pass.txt"));
        assert!(locator.locate_public_key().starts_with("/keys"));
    }

    #[test]
    fn test_assemble_detects_algorithm() {
        let keys = KeyParameters::generate("p", "s", None).unwrap();
        let material = assemble(
            keys.public_key().to_string(),
            format!("{}\n", keys.private_key_at_rest()),
            Some(String::new()),
        )
        .unwrap();
        assert_eq!(material.params, *keys.params());
        assert_eq!(material.private_key_at_rest, keys.private_key_at_rest());
        assert_eq!(material.passphrase_hint, None);
    }

    #[test]
    fn test_check_unlocks() {
        let keys = KeyParameters::generate("p", "s", None).unwrap();
        let config = KeyringConfig::default();
        assert!(check_unlocks(keys.material(), &config, "p", "s").is_ok());
        assert!(check_unlocks(keys.material(), &config, "p", "x").is_err());
    }
}
