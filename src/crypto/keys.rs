//! # Key Management
//!
//! Asymmetric keypairs whose private half only ever exists encrypted at rest.
//!
//! ## Key Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY LIFECYCLE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  generate(passphrase, salt, algorithm)                                 │
//! │       │                                                                 │
//! │       ├──► provider keypair (RSA or EC)                                │
//! │       │                                                                 │
//! │       ├──► public key  ──► SPKI PEM (stored in clear)                  │
//! │       │                                                                 │
//! │       └──► private key ──► PKCS#8 PEM                                  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │            PBKDF2(passphrase, salt) → wrapping key                     │
//! │            random IV                                                   │
//! │            AES-256-GCM envelope  ──► private_key_at_rest               │
//! │                                                                         │
//! │  private_key(passphrase, salt)                                         │
//! │       │                                                                 │
//! │       └──► re-derive wrapping key → open envelope → parse PKCS#8       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! 1. **No cached secrets**: passphrase and salt are parameters of every call
//!    that needs them and are never stored on the key object
//! 2. **Zeroization**: decrypted PEM text and wrapping keys are wrapped in
//!    `Zeroizing`
//! 3. **Fixed algorithm**: the algorithm is chosen at generation time and has
//!    no setter

use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::algorithm::{AlgorithmParams, Curve, KeyAlgorithm};
use super::envelope::{EnvelopeCodec, Framing};
use super::fingerprint::{Fingerprint, FingerprintAlgorithm};
use super::kdf::KdfParams;
use crate::config::KeyringConfig;
use crate::error::{Error, Result};

/// Smallest RSA modulus accepted for new keys
pub const MIN_RSA_BITS: usize = 1024;

const ENCRYPTED_PKCS8_LABEL: &str = "BEGIN ENCRYPTED PRIVATE KEY";

// ============================================================================
// PROVIDER KEY HANDLES
// ============================================================================

/// A loaded private key
pub enum PrivateKey {
    /// RSA private key
    Rsa(RsaPrivateKey),
    /// prime256v1 secret scalar
    P256(p256::SecretKey),
    /// secp384r1 secret scalar
    P384(p384::SecretKey),
}

impl PrivateKey {
    /// Generate a fresh key for `algorithm` from the OS random source
    pub fn generate(algorithm: &KeyAlgorithm) -> Result<Self> {
        match *algorithm {
            KeyAlgorithm::Rsa { bits } => {
                if bits < MIN_RSA_BITS {
                    return Err(Error::InvalidParameter(format!(
                        "RSA modulus must be at least {} bits, got {}",
                        MIN_RSA_BITS, bits
                    )));
                }
                let key = RsaPrivateKey::new(&mut OsRng, bits)
                    .map_err(|e| Error::KeyGeneration(e.to_string()))?;
                Ok(PrivateKey::Rsa(key))
            }
            KeyAlgorithm::Ec { curve: Curve::Prime256v1 } => {
                Ok(PrivateKey::P256(p256::SecretKey::random(&mut OsRng)))
            }
            KeyAlgorithm::Ec { curve: Curve::Secp384r1 } => {
                Ok(PrivateKey::P384(p384::SecretKey::random(&mut OsRng)))
            }
        }
    }

    /// Parse a PKCS#8 PEM private key of the given algorithm
    ///
    /// An `ENCRYPTED PRIVATE KEY` document is opened with `passphrase`.
    pub fn from_pkcs8_pem(pem: &str, algorithm: &KeyAlgorithm, passphrase: &str) -> Result<Self> {
        let encrypted = pem.contains(ENCRYPTED_PKCS8_LABEL);

        fn load<K: DecodePrivateKey>(pem: &str, encrypted: bool, passphrase: &str) -> Result<K> {
            let parsed = if encrypted {
                K::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
            } else {
                K::from_pkcs8_pem(pem)
            };
            parsed.map_err(|e| Error::InvalidKey(format!("cannot parse private key: {}", e)))
        }

        Ok(match algorithm {
            KeyAlgorithm::Rsa { .. } => PrivateKey::Rsa(load(pem, encrypted, passphrase)?),
            KeyAlgorithm::Ec { curve: Curve::Prime256v1 } => {
                PrivateKey::P256(load(pem, encrypted, passphrase)?)
            }
            KeyAlgorithm::Ec { curve: Curve::Secp384r1 } => {
                PrivateKey::P384(load(pem, encrypted, passphrase)?)
            }
        })
    }

    /// Encode as unencrypted PKCS#8 PEM
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>> {
        let encoded = match self {
            PrivateKey::Rsa(key) => key.to_pkcs8_pem(LineEnding::LF),
            PrivateKey::P256(key) => key.to_pkcs8_pem(LineEnding::LF),
            PrivateKey::P384(key) => key.to_pkcs8_pem(LineEnding::LF),
        };
        encoded.map_err(|e| Error::InvalidKey(format!("cannot encode private key: {}", e)))
    }

    /// The matching public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            PrivateKey::P256(key) => PublicKey::P256(key.public_key()),
            PrivateKey::P384(key) => PublicKey::P384(key.public_key()),
        }
    }
}

/// A loaded public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA public key
    Rsa(RsaPublicKey),
    /// prime256v1 point
    P256(p256::PublicKey),
    /// secp384r1 point
    P384(p384::PublicKey),
}

impl PublicKey {
    /// Parse an SPKI PEM public key of the given algorithm
    pub fn from_pem(pem: &str, algorithm: &KeyAlgorithm) -> Result<Self> {
        let parsed = match algorithm {
            KeyAlgorithm::Rsa { .. } => RsaPublicKey::from_public_key_pem(pem).map(PublicKey::Rsa),
            KeyAlgorithm::Ec { curve: Curve::Prime256v1 } => {
                p256::PublicKey::from_public_key_pem(pem).map(PublicKey::P256)
            }
            KeyAlgorithm::Ec { curve: Curve::Secp384r1 } => {
                p384::PublicKey::from_public_key_pem(pem).map(PublicKey::P384)
            }
        };
        parsed.map_err(|e| {
            Error::InvalidKey(format!("cannot parse {} public key: {}", algorithm, e))
        })
    }

    /// Encode as SPKI PEM
    pub fn to_pem(&self) -> Result<String> {
        let encoded = match self {
            PublicKey::Rsa(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::P256(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::P384(key) => key.to_public_key_pem(LineEnding::LF),
        };
        encoded.map_err(|e| Error::InvalidKey(format!("cannot encode public key: {}", e)))
    }
}

// ============================================================================
// KEY MATERIAL
// ============================================================================

/// Everything persisted for one keypair
///
/// Contains only public data and ciphertext, so it can be serialized and
/// stored without further protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    /// SPKI PEM public key
    pub public_key: String,
    /// Base64 AEAD envelope holding the PKCS#8 PEM private key
    pub private_key_at_rest: String,
    /// Algorithm metadata (not embedded in the PEM)
    pub params: AlgorithmParams,
    /// Optional reminder for the passphrase. Never the passphrase itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_hint: Option<String>,
}

// ============================================================================
// KEY PARAMETERS
// ============================================================================

/// A keypair with its private key protected at rest
#[derive(Debug, Clone)]
pub struct KeyParameters {
    material: KeyMaterial,
    kdf: KdfParams,
    framing: Framing,
}

impl KeyParameters {
    /// Generate a keypair with default configuration
    ///
    /// `algorithm` defaults to EC on prime256v1. Pass
    /// `Some(AlgorithmParams::new(KeyAlgorithm::rsa()))` for 4096-bit RSA.
    pub fn generate(
        passphrase: &str,
        salt: &str,
        algorithm: Option<AlgorithmParams>,
    ) -> Result<Self> {
        Self::generate_with_config(&KeyringConfig::default(), passphrase, salt, algorithm)
    }

    /// Generate a keypair using the KDF, framing and default algorithm of
    /// `config`
    pub fn generate_with_config(
        config: &KeyringConfig,
        passphrase: &str,
        salt: &str,
        algorithm: Option<AlgorithmParams>,
    ) -> Result<Self> {
        let params = algorithm.unwrap_or(config.algorithm);
        let private_key = PrivateKey::generate(&params.algorithm)?;
        let public_key = private_key.public_key().to_pem()?;
        let private_pem = private_key.to_pkcs8_pem()?;

        let mut parameters = Self {
            material: KeyMaterial {
                public_key,
                private_key_at_rest: String::new(),
                params,
                passphrase_hint: None,
            },
            kdf: config.kdf,
            framing: config.framing,
        };
        parameters.material.private_key_at_rest =
            parameters.protect(private_pem.as_bytes(), passphrase, salt)?;

        tracing::info!(algorithm = %params.algorithm, "Generated keypair");
        Ok(parameters)
    }

    /// Run [`KeyParameters::generate_with_config`] on the blocking thread pool
    pub async fn generate_async(
        config: KeyringConfig,
        passphrase: String,
        salt: String,
        algorithm: Option<AlgorithmParams>,
    ) -> Result<Self> {
        let passphrase = Zeroizing::new(passphrase);
        tokio::task::spawn_blocking(move || {
            Self::generate_with_config(&config, &passphrase, &salt, algorithm)
        })
        .await?
    }

    /// Wrap existing key material with default configuration
    pub fn from_material(material: KeyMaterial) -> Self {
        Self::from_material_with_config(material, &KeyringConfig::default())
    }

    /// Wrap existing key material
    pub fn from_material_with_config(material: KeyMaterial, config: &KeyringConfig) -> Self {
        Self {
            material,
            kdf: config.kdf,
            framing: config.framing,
        }
    }

    /// Attach a passphrase hint
    pub fn with_passphrase_hint(mut self, hint: impl Into<String>) -> Self {
        self.material.passphrase_hint = Some(hint.into());
        self
    }

    /// The persisted key material
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Consume into the persisted key material
    pub fn into_material(self) -> KeyMaterial {
        self.material
    }

    /// Algorithm metadata
    pub fn params(&self) -> &AlgorithmParams {
        &self.material.params
    }

    /// Key algorithm
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.material.params.algorithm
    }

    /// SPKI PEM public key
    pub fn public_key(&self) -> &str {
        &self.material.public_key
    }

    /// Replace the public key PEM
    pub fn set_public_key(&mut self, public_key: impl Into<String>) {
        self.material.public_key = public_key.into();
    }

    /// Parsed public key
    pub fn load_public_key(&self) -> Result<PublicKey> {
        PublicKey::from_pem(&self.material.public_key, &self.material.params.algorithm)
    }

    /// The stored ciphertext, unmodified, for export and backup
    pub fn private_key_at_rest(&self) -> &str {
        &self.material.private_key_at_rest
    }

    /// Import an already protected private key blob
    pub fn set_private_key_at_rest(&mut self, ciphertext: impl Into<String>) {
        self.material.private_key_at_rest = ciphertext.into();
    }

    /// Protect a raw PKCS#8 PEM private key and store it
    pub fn set_private_key(
        &mut self,
        private_key_pem: &str,
        passphrase: &str,
        salt: &str,
    ) -> Result<()> {
        self.material.private_key_at_rest =
            self.protect(private_key_pem.as_bytes(), passphrase, salt)?;
        Ok(())
    }

    /// Decrypt the stored private key and return its PEM text
    ///
    /// ## Errors
    ///
    /// `DecryptPrivateKey` for a wrong passphrase or salt, or a corrupted
    /// ciphertext.
    pub fn private_key_pem(&self, passphrase: &str, salt: &str) -> Result<Zeroizing<String>> {
        let raw = self.unprotect(passphrase, salt)?;
        let text = std::str::from_utf8(&raw).map_err(|_| Error::DecryptPrivateKey)?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Decrypt and load the private key
    ///
    /// ## Errors
    ///
    /// `DecryptPrivateKey` if decryption or parsing fails.
    pub fn private_key(&self, passphrase: &str, salt: &str) -> Result<PrivateKey> {
        let pem = self.private_key_pem(passphrase, salt)?;
        PrivateKey::from_pkcs8_pem(&pem, &self.material.params.algorithm, passphrase).map_err(|e| {
            tracing::warn!("Decrypted private key did not parse: {}", e);
            Error::DecryptPrivateKey
        })
    }

    /// Fingerprint of the public key
    pub fn fingerprint(&self, algorithm: FingerprintAlgorithm) -> Result<Fingerprint> {
        Fingerprint::of_public_key(&self.material.public_key, algorithm)
    }

    fn protect(&self, raw: &[u8], passphrase: &str, salt: &str) -> Result<String> {
        let key = self.kdf.derive_wrapping_key(passphrase, salt)?;
        let codec = EnvelopeCodec::default();
        let iv = codec.generate_iv()?;
        codec.encrypt(key.as_slice(), &iv, raw, self.framing)
    }

    fn unprotect(&self, passphrase: &str, salt: &str) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.kdf.derive_wrapping_key(passphrase, salt)?;
        EnvelopeCodec::default()
            .decrypt(key.as_slice(), &self.material.private_key_at_rest, self.framing)
            .map(Zeroizing::new)
            .map_err(|e| {
                tracing::warn!("Private key decryption failed: {}", e);
                Error::DecryptPrivateKey
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "passphrase";
    const SALT: &str = "salt";

    fn ec_keys() -> KeyParameters {
        KeyParameters::generate(PASSPHRASE, SALT, None).unwrap()
    }

    #[test]
    fn test_generate_defaults_to_ec() {
        let keys = ec_keys();
        assert_eq!(keys.algorithm(), KeyAlgorithm::ec(Curve::Prime256v1));
        assert!(keys.public_key().contains("BEGIN PUBLIC KEY"));
    }

    #[test]
    fn test_private_key_never_stored_in_clear() {
        let keys = ec_keys();
        let at_rest = keys.private_key_at_rest();
        assert!(!at_rest.contains("PRIVATE KEY"));

        let pem = keys.private_key_pem(PASSPHRASE, SALT).unwrap();
        assert!(pem.contains("BEGIN PRIVATE KEY"));
        assert!(!at_rest.contains(pem.lines().nth(1).unwrap()));
    }

    #[test]
    fn test_private_key_round_trip() {
        let keys = ec_keys();
        let private_key = keys.private_key(PASSPHRASE, SALT).unwrap();
        assert_eq!(private_key.public_key(), keys.load_public_key().unwrap());
    }

    #[test]
    fn test_wrong_passphrase_rejected() {
        let keys = ec_keys();
        assert!(matches!(
            keys.private_key("wrong", SALT),
            Err(Error::DecryptPrivateKey)
        ));
    }

    #[test]
    fn test_wrong_salt_rejected() {
        let keys = ec_keys();
        assert!(matches!(
            keys.private_key_pem(PASSPHRASE, "pepper"),
            Err(Error::DecryptPrivateKey)
        ));
    }

    #[test]
    fn test_secp384r1() {
        let keys =
            KeyParameters::generate(PASSPHRASE, SALT, Some(AlgorithmParams::ec(Curve::Secp384r1)))
                .unwrap();
        let private_key = keys.private_key(PASSPHRASE, SALT).unwrap();
        assert!(matches!(private_key, PrivateKey::P384(_)));
        assert_eq!(
            AlgorithmParams::detect(keys.public_key()).unwrap(),
            *keys.params()
        );
    }

    #[test]
    fn test_set_private_key_rewrites_ciphertext() {
        let mut keys = ec_keys();
        let before = keys.private_key_at_rest().to_string();
        let pem = keys.private_key_pem(PASSPHRASE, SALT).unwrap();

        keys.set_private_key(&pem, "new passphrase", "new salt").unwrap();

        assert_ne!(keys.private_key_at_rest(), before);
        assert_eq!(*keys.private_key_pem("new passphrase", "new salt").unwrap(), *pem);
        assert!(keys.private_key_pem(PASSPHRASE, SALT).is_err());
    }

    #[test]
    fn test_at_rest_import_is_verbatim() {
        let mut keys = ec_keys();
        keys.set_private_key_at_rest("test-private-key");
        assert_eq!(keys.private_key_at_rest(), "test-private-key");
        assert!(matches!(
            keys.private_key(PASSPHRASE, SALT),
            Err(Error::DecryptPrivateKey)
        ));
    }

    #[test]
    fn test_malformed_key_bytes_rejected() {
        let mut keys = ec_keys();
        keys.set_private_key("not a pem", PASSPHRASE, SALT).unwrap();
        assert!(matches!(
            keys.private_key(PASSPHRASE, SALT),
            Err(Error::DecryptPrivateKey)
        ));
    }

    #[test]
    fn test_encrypted_pkcs8_uses_passphrase() {
        let secret = p256::SecretKey::random(&mut OsRng);
        let encrypted = secret
            .to_pkcs8_encrypted_pem(&mut OsRng, PASSPHRASE.as_bytes(), LineEnding::LF)
            .unwrap();

        let mut keys = ec_keys();
        keys.set_public_key(secret.public_key().to_public_key_pem(LineEnding::LF).unwrap());
        keys.set_private_key(&encrypted, PASSPHRASE, SALT).unwrap();

        let loaded = keys.private_key(PASSPHRASE, SALT).unwrap();
        assert_eq!(loaded.public_key(), keys.load_public_key().unwrap());
    }

    #[test]
    fn test_fingerprint_depends_only_on_public_key() {
        let keys = ec_keys();
        let mut rewrapped = keys.clone();
        let pem = keys.private_key_pem(PASSPHRASE, SALT).unwrap();
        rewrapped.set_private_key(&pem, "other", "other").unwrap();

        let fp = keys.fingerprint(FingerprintAlgorithm::Sha256).unwrap();
        assert_eq!(fp, keys.fingerprint(FingerprintAlgorithm::Sha256).unwrap());
        assert_eq!(fp, rewrapped.fingerprint(FingerprintAlgorithm::Sha256).unwrap());
        assert_ne!(fp, ec_keys().fingerprint(FingerprintAlgorithm::Sha256).unwrap());
        assert_eq!(keys.fingerprint(FingerprintAlgorithm::Md5).unwrap().as_str().len(), 47);
    }

    #[test]
    fn test_rsa_modulus_floor() {
        let result = KeyParameters::generate(PASSPHRASE, SALT, Some(AlgorithmParams::rsa(512)));
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_legacy_framing_config() {
        let config = KeyringConfig {
            framing: Framing::Legacy,
            ..KeyringConfig::default()
        };
        let keys = KeyParameters::generate_with_config(&config, PASSPHRASE, SALT, None).unwrap();
        let material = keys.material().clone();

        assert!(KeyParameters::from_material_with_config(material.clone(), &config)
            .private_key(PASSPHRASE, SALT)
            .is_ok());
        assert!(KeyParameters::from_material(material)
            .private_key(PASSPHRASE, SALT)
            .is_err());
    }

    #[test]
    fn test_material_serialization() {
        let keys = ec_keys().with_passphrase_hint("the usual");
        let json = serde_json::to_string(keys.material()).unwrap();
        let restored: KeyMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, keys.material());
        assert!(KeyParameters::from_material(restored)
            .private_key(PASSPHRASE, SALT)
            .is_ok());
    }

    #[tokio::test]
    async fn test_generate_async() {
        let keys = KeyParameters::generate_async(
            KeyringConfig::default(),
            PASSPHRASE.to_string(),
            SALT.to_string(),
            None,
        )
        .await
        .unwrap();
        assert!(keys.private_key(PASSPHRASE, SALT).is_ok());
    }
}
