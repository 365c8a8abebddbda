//! # Cryptography Module
//!
//! Everything the keyring does with key material.
//!
//! ## Component Map
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEYRING CRYPTOGRAPHY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐      ┌──────────────────────────────────────┐     │
//! │  │      kdf        │─────►│              keys                    │     │
//! │  │ PBKDF2-SHA256   │      │ KeyParameters: public PEM in clear,  │     │
//! │  └─────────────────┘      │ private PEM inside an AEAD envelope  │     │
//! │                           └──────────┬───────────────────────────┘     │
//! │  ┌─────────────────┐                 │                                 │
//! │  │ cipher/envelope │◄────────────────┘                                 │
//! │  │ AES-GCM framed  │                                                   │
//! │  │ legacy/current  │      ┌──────────────────┐  ┌──────────────────┐   │
//! │  └─────────────────┘      │    provider      │  │      seal        │   │
//! │                           │ sign / verify    │  │ AES-256-CBC bulk │   │
//! │  ┌─────────────────┐      │ RSA transforms   │  │ RSA key transport│   │
//! │  │   algorithm     │─────►│ capability gated │  │ capability gated │   │
//! │  │ RSA | EC curve  │      └──────────────────┘  └──────────────────┘   │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | PBKDF2-HMAC-SHA256 | Wrapping key | 1024 iterations, 48 bytes, first 32 used |
//! | AES-256-GCM | Private key at rest | AAD fixed to `127.0.0.1` |
//! | ECDSA P-256 / P-384 | Default keys | SHA-256 digest, DER signatures |
//! | RSA PKCS#1 v1.5 | Compatibility keys | SHA-512 signatures, key transport |
//! | AES-256-CBC | Sealed bulk data | No MAC, see [`seal`] |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: derived keys and decrypted PEM text are
//!    `Zeroizing`
//! 2. **Secure Random**: keys, IVs and bulk keys come from `OsRng`
//! 3. **No Nonce Reuse**: a fresh IV for every envelope and every seal

pub mod algorithm;
pub mod cipher;
pub mod envelope;
pub mod fingerprint;
pub mod kdf;
pub mod keys;
pub mod provider;
pub mod seal;

pub use algorithm::{AlgorithmParams, Capability, Curve, DigestAlgorithm, KeyAlgorithm};
pub use cipher::Cipher;
pub use envelope::{EnvelopeCodec, Framing, SymmetricEnvelope};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm};
pub use kdf::KdfParams;
pub use keys::{KeyMaterial, KeyParameters, PrivateKey, PublicKey};
pub use provider::CryptoProvider;
pub use seal::{open, seal, Armor, SealedEnvelope};
