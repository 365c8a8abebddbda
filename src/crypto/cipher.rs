//! Cipher catalogue.
//!
//! Names follow the OpenSSL spelling (`aes-256-gcm`, `aes-256-cbc`, ...) so
//! configuration written for the older tooling keeps working.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of the GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Length of a GCM nonce in bytes (96 bits)
pub const GCM_IV_SIZE: usize = 12;

/// Length of an AES block, and so of a CBC IV, in bytes
pub const CBC_IV_SIZE: usize = 16;

/// Symmetric ciphers known to the keyring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cipher {
    /// AES-256 in GCM mode (default)
    #[default]
    Aes256Gcm,
    /// AES-128 in GCM mode
    Aes128Gcm,
    /// AES-256 in CBC mode with PKCS#7 padding (sealed envelopes only)
    Aes256Cbc,
    /// AES-256 in ECB mode. Recognised so that its lack of an IV is reported
    /// as such instead of as an unknown cipher.
    Aes256Ecb,
}

impl Cipher {
    /// Every cipher the keyring recognises
    pub const ALL: [Cipher; 4] = [
        Cipher::Aes256Gcm,
        Cipher::Aes128Gcm,
        Cipher::Aes256Cbc,
        Cipher::Aes256Ecb,
    ];

    /// OpenSSL style name
    pub fn name(&self) -> &'static str {
        match self {
            Cipher::Aes256Gcm => "aes-256-gcm",
            Cipher::Aes128Gcm => "aes-128-gcm",
            Cipher::Aes256Cbc => "aes-256-cbc",
            Cipher::Aes256Ecb => "aes-256-ecb",
        }
    }

    /// Key length in bytes
    pub fn key_len(&self) -> usize {
        match self {
            Cipher::Aes128Gcm => 16,
            Cipher::Aes256Gcm | Cipher::Aes256Cbc | Cipher::Aes256Ecb => 32,
        }
    }

    /// IV length in bytes, `None` if the mode takes no IV
    pub fn iv_len(&self) -> Option<usize> {
        match self {
            Cipher::Aes256Gcm | Cipher::Aes128Gcm => Some(GCM_IV_SIZE),
            Cipher::Aes256Cbc => Some(CBC_IV_SIZE),
            Cipher::Aes256Ecb => None,
        }
    }

    /// IV length, or `IvLength` if the mode takes no IV
    pub fn require_iv_len(&self) -> Result<usize> {
        self.iv_len()
            .ok_or_else(|| Error::IvLength(self.name().to_string()))
    }

    /// Whether this cipher authenticates its output
    pub fn is_aead(&self) -> bool {
        matches!(self, Cipher::Aes256Gcm | Cipher::Aes128Gcm)
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cipher {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Cipher::ALL
            .into_iter()
            .find(|cipher| cipher.name() == wanted)
            .ok_or_else(|| Error::UnsupportedCipher(s.to_string()))
    }
}

impl TryFrom<String> for Cipher {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Cipher> for String {
    fn from(cipher: Cipher) -> Self {
        cipher.name().to_string()
    }
}
