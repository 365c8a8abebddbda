//! Keyring configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "kdf": { "iterations": 1024, "output_len": 48 },
//!   "algorithm": { "algorithm": { "type": "ec", "curve": "prime256v1" }, "digest": "sha256" },
//!   "framing": "current"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto::algorithm::{AlgorithmParams, KeyAlgorithm};
use crate::crypto::envelope::Framing;
use crate::crypto::kdf::{KdfParams, WRAPPING_KEY_LEN};
use crate::crypto::keys::MIN_RSA_BITS;
use crate::error::{Error, Result};

/// Configuration shared by key generation, key loading and the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// PBKDF2 parameters for the private key wrapping key
    pub kdf: KdfParams,
    /// Algorithm used when generation is not given one explicitly
    pub algorithm: AlgorithmParams,
    /// Envelope layout for private keys at rest
    pub framing: Framing,
}

impl KeyringConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the configuration can actually protect a key
    pub fn validate(&self) -> Result<()> {
        self.kdf
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.kdf.output_len < WRAPPING_KEY_LEN {
            return Err(Error::Config(format!(
                "kdf.output_len must be at least {} bytes",
                WRAPPING_KEY_LEN
            )));
        }

        if let KeyAlgorithm::Rsa { bits } = self.algorithm.algorithm {
            if bits < MIN_RSA_BITS {
                return Err(Error::Config(format!(
                    "RSA keys must be at least {} bits",
                    MIN_RSA_BITS
                )));
            }
        }

        Ok(())
    }
}
