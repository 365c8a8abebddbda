//! Key algorithm selection.
//!
//! RSA and EC keys share one API, but not every operation. The algorithm is a
//! tagged enum and each operation asks it for a [`Capability`] before touching
//! any key material.

use std::fmt;

use pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default RSA modulus size for compatibility keys
pub const DEFAULT_RSA_BITS: usize = 4096;

/// Named elliptic curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Curve {
    /// NIST P-256
    #[default]
    #[serde(rename = "prime256v1")]
    Prime256v1,
    /// NIST P-384
    #[serde(rename = "secp384r1")]
    Secp384r1,
}

impl Curve {
    /// OpenSSL curve name
    pub fn name(&self) -> &'static str {
        match self {
            Curve::Prime256v1 => "prime256v1",
            Curve::Secp384r1 => "secp384r1",
        }
    }

    /// Parse an OpenSSL or NIST curve name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "prime256v1" | "secp256r1" | "p-256" => Ok(Curve::Prime256v1),
            "secp384r1" | "p-384" => Ok(Curve::Secp384r1),
            other => Err(Error::InvalidParameter(format!("unknown curve {}", other))),
        }
    }
}

/// Message digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// Asymmetric key algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// RSA with the given modulus size
    Rsa {
        /// Modulus size in bits
        bits: usize,
    },
    /// ECDSA over a named curve
    Ec {
        /// Curve the key lives on
        curve: Curve,
    },
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Ec {
            curve: Curve::default(),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA ({} bits)", bits),
            KeyAlgorithm::Ec { curve } => write!(f, "EC ({})", curve.name()),
        }
    }
}

/// Operations that depend on the key algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Sign and verify
    Sign,
    /// Textbook public/private key encryption and decryption
    DirectEncryption,
    /// Encrypting a symmetric key to the recipient's public key
    KeyTransport,
}

impl KeyAlgorithm {
    /// RSA with the default modulus size
    pub fn rsa() -> Self {
        KeyAlgorithm::Rsa {
            bits: DEFAULT_RSA_BITS,
        }
    }

    /// EC on the given curve
    pub fn ec(curve: Curve) -> Self {
        KeyAlgorithm::Ec { curve }
    }

    /// Whether this is an RSA algorithm
    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyAlgorithm::Rsa { .. })
    }

    /// Whether keys of this algorithm can perform `capability`
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Sign => true,
            Capability::DirectEncryption | Capability::KeyTransport => self.is_rsa(),
        }
    }

    /// Fail with `Capability` if `operation` needs something this algorithm
    /// cannot do
    pub fn require(&self, capability: Capability, operation: &'static str) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(Error::Capability {
                operation,
                algorithm: self.to_string(),
            })
        }
    }

    /// Digest used for signatures. Fixed per algorithm: SHA-512 keeps RSA
    /// signatures compatible with existing verifiers, SHA-256 for EC.
    pub fn signature_digest(&self) -> DigestAlgorithm {
        match self {
            KeyAlgorithm::Rsa { .. } => DigestAlgorithm::Sha512,
            KeyAlgorithm::Ec { .. } => DigestAlgorithm::Sha256,
        }
    }
}

/// Algorithm metadata carried next to the PEM keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmParams {
    /// Key algorithm
    pub algorithm: KeyAlgorithm,
    /// Digest recorded for the key
    pub digest: DigestAlgorithm,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self::new(KeyAlgorithm::default())
    }
}

impl AlgorithmParams {
    /// Params for `algorithm` with its signature digest
    pub fn new(algorithm: KeyAlgorithm) -> Self {
        Self {
            algorithm,
            digest: algorithm.signature_digest(),
        }
    }

    /// RSA with the given modulus size
    pub fn rsa(bits: usize) -> Self {
        Self::new(KeyAlgorithm::Rsa { bits })
    }

    /// EC on the given curve
    pub fn ec(curve: Curve) -> Self {
        Self::new(KeyAlgorithm::Ec { curve })
    }

    /// Work out the algorithm of an SPKI public key PEM
    pub fn detect(public_key_pem: &str) -> Result<Self> {
        if let Ok(key) = rsa::RsaPublicKey::from_public_key_pem(public_key_pem) {
            return Ok(Self::rsa(key.n().bits()));
        }
        if p256::PublicKey::from_public_key_pem(public_key_pem).is_ok() {
            return Ok(Self::ec(Curve::Prime256v1));
        }
        if p384::PublicKey::from_public_key_pem(public_key_pem).is_ok() {
            return Ok(Self::ec(Curve::Secp384r1));
        }
        Err(Error::InvalidKey(
            "public key is not an RSA, prime256v1 or secp384r1 key".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ec_prime256v1() {
        let params = AlgorithmParams::default();
        assert_eq!(params.algorithm, KeyAlgorithm::ec(Curve::Prime256v1));
        assert_eq!(params.digest, DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_rsa_defaults() {
        let params = AlgorithmParams::new(KeyAlgorithm::rsa());
        assert_eq!(params.algorithm, KeyAlgorithm::Rsa { bits: 4096 });
        assert_eq!(params.digest, DigestAlgorithm::Sha512);
    }

    #[test]
    fn test_capabilities() {
        let ec = KeyAlgorithm::default();
        assert!(ec.supports(Capability::Sign));
        assert!(!ec.supports(Capability::DirectEncryption));
        assert!(!ec.supports(Capability::KeyTransport));

        let rsa = KeyAlgorithm::rsa();
        assert!(rsa.supports(Capability::DirectEncryption));
        assert!(rsa.supports(Capability::KeyTransport));
    }

    #[test]
    fn test_require_reports_operation() {
        let err = KeyAlgorithm::ec(Curve::Secp384r1)
            .require(Capability::DirectEncryption, "privateEncrypt")
            .unwrap_err();
        match err {
            Error::Capability { operation, algorithm } => {
                assert_eq!(operation, "privateEncrypt");
                assert_eq!(algorithm, "EC (secp384r1)");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_curve_names() {
        assert_eq!(Curve::from_name("secp256r1").unwrap(), Curve::Prime256v1);
        assert_eq!(Curve::from_name("SECP384R1").unwrap(), Curve::Secp384r1);
        assert!(Curve::from_name("secp521r1").is_err());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&AlgorithmParams::ec(Curve::Secp384r1)).unwrap();
        assert_eq!(
            json,
            r#"{"algorithm":{"type":"ec","curve":"secp384r1"},"digest":"sha256"}"#
        );
    }

    #[test]
    fn test_detect_rejects_garbage() {
        let pem = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(AlgorithmParams::detect(pem).is_err());
    }
}
