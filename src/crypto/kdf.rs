//! # Key Derivation Functions
//!
//! Password based key derivation used to protect private keys at rest.
//!
//! ## Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → WRAPPING KEY                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  PBKDF2-HMAC-SHA256(                                                   │
//! │    password   = passphrase,                                            │
//! │    salt       = caller supplied salt,                                  │
//! │    iterations = 1024 (default),                                        │
//! │    output_len = 48 bytes (default)                                     │
//! │  )                                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  first 32 bytes → AES-256-GCM wrapping key                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The derivation is deterministic. Decrypting a stored private key depends on
//! re-deriving exactly the same wrapping key from the same passphrase and salt.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 1024;

/// Default derived key length in bytes
pub const DEFAULT_OUTPUT_LEN: usize = 48;

/// Length of the AES-256 wrapping key taken from the derived bytes
pub const WRAPPING_KEY_LEN: usize = 32;

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Number of PBKDF2 iterations (≥ 1)
    pub iterations: u32,
    /// Number of output bytes (≥ 1)
    pub output_len: usize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            output_len: DEFAULT_OUTPUT_LEN,
        }
    }
}

impl KdfParams {
    /// Reject parameters PBKDF2 cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidParameter(
                "PBKDF2 iterations must be at least 1".into(),
            ));
        }
        if self.output_len == 0 {
            return Err(Error::InvalidParameter(
                "PBKDF2 output length must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Derive key bytes with these parameters
    pub fn derive(&self, password: &[u8], salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        derive(password, salt, self.iterations, self.output_len)
    }

    /// Derive the AES-256 key used to wrap private keys at rest
    ///
    /// The output length must cover at least [`WRAPPING_KEY_LEN`] bytes.
    pub fn derive_wrapping_key(
        &self,
        passphrase: &str,
        salt: &str,
    ) -> Result<Zeroizing<[u8; WRAPPING_KEY_LEN]>> {
        if self.output_len < WRAPPING_KEY_LEN {
            return Err(Error::InvalidParameter(format!(
                "wrapping key needs at least {} derived bytes, got {}",
                WRAPPING_KEY_LEN, self.output_len
            )));
        }

        let derived = self.derive(passphrase.as_bytes(), salt.as_bytes())?;
        let mut key = Zeroizing::new([0u8; WRAPPING_KEY_LEN]);
        key.copy_from_slice(&derived[..WRAPPING_KEY_LEN]);
        Ok(key)
    }
}

/// Derive `output_len` bytes from a password and salt using PBKDF2-HMAC-SHA256
///
/// ## Errors
///
/// Returns `InvalidParameter` if `iterations` or `output_len` is zero.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    KdfParams {
        iterations,
        output_len,
    }
    .validate()?;

    let mut out = Zeroizing::new(vec![0u8; output_len]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);

    tracing::debug!(iterations, output_len, "Derived key material");
    Ok(out)
}

/// Derive key material and return it as lowercase hex
///
/// `hex_len` is the number of hex characters wanted, so the derivation runs
/// for `hex_len / 2` bytes (rounded up) and the string is cut to `hex_len`.
pub fn derive_hex(password: &str, salt: &str, iterations: u32, hex_len: usize) -> Result<String> {
    let bytes = derive(
        password.as_bytes(),
        salt.as_bytes(),
        iterations,
        hex_len.div_ceil(2),
    )?;
    let mut encoded = hex::encode(bytes.as_slice());
    encoded.truncate(hex_len);
    Ok(encoded)
}

/// Run [`derive`] on the blocking thread pool
///
/// PBKDF2 is CPU bound; inside an async server it should not run on a
/// reactor thread.
pub async fn derive_async(
    password: Vec<u8>,
    salt: Vec<u8>,
    params: KdfParams,
) -> Result<Zeroizing<Vec<u8>>> {
    let password = Zeroizing::new(password);
    tokio::task::spawn_blocking(move || params.derive(&password, &salt)).await?
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "pa$$word1";
    const SALT: &str = "cfe29b9ef459d95e280d7b3fc2f7e2ef2e10a102606a4469";
    const EXPECTED_HEX: &str = "094c8ea6c989cf7728a6f741b74ee2055219fc60e0cb0156";

    #[test]
    fn test_regression_vector_hex() {
        let key = derive_hex(PASSWORD, SALT, DEFAULT_ITERATIONS, 48).unwrap();
        assert_eq!(key, EXPECTED_HEX);
    }

    #[test]
    fn test_regression_vector_is_prefix_of_default_output() {
        let key = KdfParams::default()
            .derive(PASSWORD.as_bytes(), SALT.as_bytes())
            .unwrap();

        assert_eq!(key.len(), DEFAULT_OUTPUT_LEN);
        assert_eq!(hex::encode(&key[..24]), EXPECTED_HEX);
    }

    #[test]
    fn test_derive_deterministic() {
        let a = derive(b"password", b"salt", 10, 48).unwrap();
        let b = derive(b"password", b"salt", 10, 48).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_salts_different_keys() {
        let a = derive(b"password", b"salt-1", 10, 32).unwrap();
        let b = derive(b"password", b"salt-2", 10, 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = derive(b"password", b"salt", 0, 48);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_length_rejected() {
        let result = derive(b"password", b"salt", 1024, 0);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_wrapping_key_is_derivation_prefix() {
        let params = KdfParams::default();
        let wrapping = params.derive_wrapping_key("passphrase", "salt").unwrap();
        let full = params.derive(b"passphrase", b"salt").unwrap();

        assert_eq!(wrapping.as_slice(), &full[..WRAPPING_KEY_LEN]);
    }

    #[test]
    fn test_wrapping_key_needs_enough_output() {
        let params = KdfParams {
            iterations: 1,
            output_len: 16,
        };
        assert!(params.derive_wrapping_key("passphrase", "salt").is_err());
    }

    #[tokio::test]
    async fn test_derive_async_matches_sync() {
        let params = KdfParams::default();
        let sync = params.derive(b"password", b"salt").unwrap();
        let async_key = derive_async(b"password".to_vec(), b"salt".to_vec(), params)
            .await
            .unwrap();

        assert_eq!(sync, async_key);
    }
}
