//! Filesystem key store.

use std::fs;
use std::path::Path;

use super::{assemble, check_unlocks, KeyLocator, KeyMaterialReader, KeyMaterialWriter};
use crate::config::KeyringConfig;
use crate::crypto::keys::KeyMaterial;
use crate::error::{Error, Result};

/// Stores each key part as a file at the path its locator returns
#[derive(Debug, Clone)]
pub struct FileKeyStore<L> {
    locator: L,
    config: KeyringConfig,
}

impl<L: KeyLocator> FileKeyStore<L> {
    /// Create a store with default configuration
    pub fn new(locator: L) -> Self {
        Self::with_config(locator, KeyringConfig::default())
    }

    /// Create a store whose write check uses `config`
    pub fn with_config(locator: L, config: KeyringConfig) -> Self {
        Self { locator, config }
    }

    /// The locator in use
    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Whether all three parts exist
    pub fn exists(&self) -> bool {
        [
            self.locator.locate_public_key(),
            self.locator.locate_private_key(),
            self.locator.locate_passphrase(),
        ]
        .iter()
        .all(|path| Path::new(path).is_file())
    }
}

fn read_part(path: &str, what: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        tracing::warn!(path, kind = ?e.kind(), "Cannot read {}: {}", what, e);
        Error::FileRead(format!("{} from file", what))
    })
}

fn write_part(path: &str, what: &str, contents: &str) -> Result<()> {
    let target = Path::new(path);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::FileWrite(format!("{} to {}: {}", what, path, e)))?;
    }
    fs::write(target, contents)
        .map_err(|e| Error::FileWrite(format!("{} to {}: {}", what, path, e)))
}

#[cfg(unix)]
fn restrict_permissions(path: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::FileWrite(format!("permissions on {}: {}", path, e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &str) -> Result<()> {
    Ok(())
}

impl<L: KeyLocator> KeyMaterialReader for FileKeyStore<L> {
    fn read(&self) -> Result<KeyMaterial> {
        let public_key = read_part(&self.locator.locate_public_key(), "public key")?;
        let private_key = read_part(&self.locator.locate_private_key(), "private key")?;
        let hint = read_part(&self.locator.locate_passphrase(), "passphrase")?;

        let material = assemble(public_key, private_key, Some(hint.trim_end().to_string()))?;
        tracing::debug!(algorithm = %material.params.algorithm, "Read key material from disk");
        Ok(material)
    }
}

impl<L: KeyLocator> KeyMaterialWriter for FileKeyStore<L> {
    fn write(&self, material: &KeyMaterial, passphrase: &str, salt: &str) -> Result<()> {
        check_unlocks(material, &self.config, passphrase, salt)?;

        let public_path = self.locator.locate_public_key();
        let private_path = self.locator.locate_private_key();
        let hint_path = self.locator.locate_passphrase();

        write_part(&public_path, "public key", &material.public_key)?;
        write_part(&private_path, "private key", &material.private_key_at_rest)?;
        restrict_permissions(&private_path)?;

        let hint = material.passphrase_hint.as_deref().unwrap_or_default();
        write_part(&hint_path, "passphrase", hint)?;

        tracing::info!(
            algorithm = %material.params.algorithm,
            path = %private_path,
            "Wrote key material"
        );
        Ok(())
    }
}
