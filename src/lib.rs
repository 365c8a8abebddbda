//! # Keyring Core
//!
//! Key management and envelope encryption: asymmetric keypairs whose private
//! half is only ever stored encrypted, framed AES-GCM envelopes, and hybrid
//! seal/open for bulk data.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEYRING CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                          crypto                                  │  │
//! │  │                                                                  │  │
//! │  │  kdf ──► keys ──► provider (sign/verify, RSA transforms)         │  │
//! │  │           │                                                      │  │
//! │  │  envelope ┘       seal (AES-CBC + RSA key transport)             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ KeyMaterial                            │
//! │  ┌─────────────┐  ┌───────────▼─────────┐  ┌─────────────────────┐    │
//! │  │   config    │  │       store         │  │       error         │    │
//! │  │             │  │                     │  │                     │    │
//! │  │ - KDF       │  │ - KeyLocator        │  │ - one Error enum    │    │
//! │  │ - algorithm │  │ - FileKeyStore      │  │ - numeric codes     │    │
//! │  │ - framing   │  │ - MemoryKeyStore    │  │                     │    │
//! │  └─────────────┘  └─────────────────────┘  └─────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key derivation, envelopes, keypairs, signatures, seal/open
//! - [`store`] - Reading and writing key material through a locator
//! - [`config`] - Serde-loadable defaults
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyring_core::{CryptoProvider, KeyParameters};
//!
//! # fn main() -> keyring_core::Result<()> {
//! let keys = KeyParameters::generate("passphrase", "salt", None)?;
//! let provider = CryptoProvider::new(&keys);
//!
//! let signature = provider.sign(b"hello", "passphrase", "salt")?;
//! assert!(provider.verify(b"hello", &signature));
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events and installs no subscriber. Secrets,
//! passphrases and salts never appear in events.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod error;
pub mod store;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::KeyringConfig;
pub use crypto::{
    AlgorithmParams, Armor, Cipher, CryptoProvider, Curve, EnvelopeCodec, Fingerprint,
    FingerprintAlgorithm, Framing, KeyAlgorithm, KeyMaterial, KeyParameters, SealedEnvelope,
};
pub use error::{Error, Result};
pub use store::{
    DirectoryLocator, FileKeyStore, KeyLocator, KeyMaterialReader, KeyMaterialWriter,
    MemoryKeyStore,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Keyring Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
