//! In-memory key store for tests and embedding.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{assemble, check_unlocks, KeyLocator, KeyMaterialReader, KeyMaterialWriter};
use crate::config::KeyringConfig;
use crate::crypto::keys::KeyMaterial;
use crate::error::{Error, Result};

/// Key store backed by a map from location to contents
pub struct MemoryKeyStore<L> {
    locator: L,
    config: KeyringConfig,
    entries: RwLock<HashMap<String, String>>,
}

impl<L: KeyLocator> MemoryKeyStore<L> {
    /// Create an empty store
    pub fn new(locator: L) -> Self {
        Self::with_config(locator, KeyringConfig::default())
    }

    /// Create an empty store whose write check uses `config`
    pub fn with_config(locator: L, config: KeyringConfig) -> Self {
        Self {
            locator,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Raw contents at a location
    pub fn get(&self, location: &str) -> Option<String> {
        self.entries.read().get(location).cloned()
    }

    /// Drop every stored part
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn required(&self, location: String, what: &str) -> Result<String> {
        self.get(&location)
            .ok_or_else(|| Error::FileRead(format!("{} from {}", what, location)))
    }
}

impl<L: KeyLocator> KeyMaterialReader for MemoryKeyStore<L> {
    fn read(&self) -> Result<KeyMaterial> {
        let public_key = self.required(self.locator.locate_public_key(), "public key")?;
        let private_key = self.required(self.locator.locate_private_key(), "private key")?;
        let hint = self.required(self.locator.locate_passphrase(), "passphrase")?;
        assemble(public_key, private_key, Some(hint))
    }
}

impl<L: KeyLocator> KeyMaterialWriter for MemoryKeyStore<L> {
    fn write(&self, material: &KeyMaterial, passphrase: &str, salt: &str) -> Result<()> {
        check_unlocks(material, &self.config, passphrase, salt)?;

        let mut entries = self.entries.write();
        entries.insert(self.locator.locate_public_key(), material.public_key.clone());
        entries.insert(
            self.locator.locate_private_key(),
            material.private_key_at_rest.clone(),
        );
        entries.insert(
            self.locator.locate_passphrase(),
            material.passphrase_hint.clone().unwrap_or_default(),
        );

        tracing::info!(algorithm = %material.params.algorithm, "Stored key material in memory");
        Ok(())
    }
}
