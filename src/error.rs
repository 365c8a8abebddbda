//! # Error Handling
//!
//! One error type for the whole crate, grouped by the layer that raises it.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Cipher Errors                                                     │
//! │  │   ├── UnsupportedCipher     - Named cipher is not available         │
//! │  │   └── IvLength              - Cipher has no defined IV length       │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── InvalidKey            - Malformed key bytes or PEM            │
//! │  │   ├── KeyGeneration         - Provider failed to generate a key     │
//! │  │   ├── DecryptPrivateKey     - Wrong passphrase/salt or bad key      │
//! │  │   └── Capability            - Operation not valid for algorithm     │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── AuthenticationFailed  - AEAD tag mismatch                     │
//! │  │   ├── DecryptionFailed      - Hybrid open / RSA decrypt failed      │
//! │  │   ├── EncryptionFailed      - Encryption operation failed           │
//! │  │   └── SigningFailed         - Signing operation failed              │
//! │  │                                                                      │
//! │  ├── Store Errors                                                      │
//! │  │   ├── FileRead              - A key part could not be read          │
//! │  │   └── FileWrite             - A key part could not be written       │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── InvalidParameter      - Caller supplied an invalid value      │
//! │      ├── Encoding              - Base64/hex/UTF-8 decoding failed      │
//! │      ├── Config                - Configuration could not be loaded     │
//! │      └── Internal              - Worker task failure                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only signature verification turns a failure into a plain `false`. Every
//! other cryptographic failure surfaces as one of these variants.

use thiserror::Error;

/// Result type alias for keyring operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for keyring operations
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Cipher Errors (100-199)
    // ========================================================================

    /// The requested cipher is not available
    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// The configured cipher does not define an IV length
    #[error("Cipher {0} has no defined IV length")]
    IvLength(String),

    // ========================================================================
    // Key Errors (200-299)
    // ========================================================================

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key generation failed inside the provider
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// The stored private key could not be decrypted or parsed
    #[error("Cannot decrypt private key with given passphrase and salt")]
    DecryptPrivateKey,

    /// Operation invoked on a key algorithm that cannot perform it
    #[error("Operation {operation} is not supported for {algorithm} keys")]
    Capability {
        /// The rejected operation
        operation: &'static str,
        /// Display name of the key algorithm
        algorithm: String,
    },

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// AEAD verification failed (tag mismatch or corrupted ciphertext)
    #[error("Authentication failed: envelope was tampered with or the key is wrong")]
    AuthenticationFailed,

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // ========================================================================
    // Store Errors (400-499)
    // ========================================================================

    /// A key part could not be read
    #[error("Cannot read {0}")]
    FileRead(String),

    /// A key part could not be written
    #[error("Cannot write {0}")]
    FileWrite(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Invalid parameter supplied by the caller
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Base64, hex or UTF-8 decoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Cipher
    /// - 200-299: Key
    /// - 300-399: Crypto
    /// - 400-499: Store
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Cipher (100-199)
            Error::UnsupportedCipher(_) => 100,
            Error::IvLength(_) => 101,

            // Key (200-299)
            Error::InvalidKey(_) => 200,
            Error::KeyGeneration(_) => 201,
            Error::DecryptPrivateKey => 202,
            Error::Capability { .. } => 203,

            // Crypto (300-399)
            Error::AuthenticationFailed => 300,
            Error::DecryptionFailed(_) => 301,
            Error::EncryptionFailed(_) => 302,
            Error::SigningFailed(_) => 303,

            // Store (400-499)
            Error::FileRead(_) => 400,
            Error::FileWrite(_) => 401,

            // Internal (900-999)
            Error::InvalidParameter(_) => 900,
            Error::Encoding(_) => 901,
            Error::Config(_) => 902,
            Error::Internal(_) => 903,
        }
    }

    /// Check if this error can be resolved by the caller supplying
    /// different credentials (passphrase/salt) and retrying
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Error::DecryptPrivateKey | Error::AuthenticationFailed
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("worker task failed: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
