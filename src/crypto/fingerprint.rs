//! Public key fingerprints.
//!
//! A fingerprint is computed over the DER bytes inside the PEM armor of a
//! public key, and nothing else.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Hash used for the fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    /// MD5, colon separated. Kept for display next to older tooling.
    Md5,
    /// SHA-256, bare hex
    #[default]
    Sha256,
}

/// A public key fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a PEM (or bare base64 DER) public key
    pub fn of_public_key(public_key: &str, algorithm: FingerprintAlgorithm) -> Result<Self> {
        let der = decode_pem_body(public_key)?;
        Ok(Self::of_der(&der, algorithm))
    }

    /// Fingerprint of DER bytes
    pub fn of_der(der: &[u8], algorithm: FingerprintAlgorithm) -> Self {
        match algorithm {
            FingerprintAlgorithm::Sha256 => Self(hex::encode(Sha256::digest(der))),
            FingerprintAlgorithm::Md5 => {
                let digest = Md5::digest(der);
                let groups: Vec<String> = digest.iter().map(|b| format!("{:02x}", b)).collect();
                Self(groups.join(":"))
            }
        }
    }

    /// The fingerprint string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip `-----BEGIN/END-----` lines and decode the base64 body
fn decode_pem_body(pem: &str) -> Result<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----") && !line.is_empty())
        .collect();

    if body.is_empty() {
        return Err(Error::InvalidKey("public key has no body".into()));
    }

    BASE64
        .decode(body)
        .map_err(|e| Error::InvalidKey(format!("public key body is not base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEM: &str = "-----BEGIN PUBLIC KEY-----\nAAECAwQFBgcICQ==\n-----END PUBLIC KEY-----\n";

    #[test]
    fn test_sha256_is_bare_hex() {
        let fp = Fingerprint::of_public_key(PEM, FingerprintAlgorithm::Sha256).unwrap();
        assert_eq!(fp.as_str().len(), 64);
        assert!(!fp.as_str().contains(':'));
        let der = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(fp, Fingerprint::of_der(&der, FingerprintAlgorithm::Sha256));
    }

    #[test]
    fn test_md5_is_colon_grouped() {
        let fp = Fingerprint::of_public_key(PEM, FingerprintAlgorithm::Md5).unwrap();
        assert_eq!(fp.as_str().len(), 47);
        assert_eq!(fp.as_str().split(':').count(), 16);
    }

    #[test]
    fn test_known_md5() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let fp = Fingerprint::of_der(b"", FingerprintAlgorithm::Md5);
        assert_eq!(fp.as_str(), "d4:1d:8c:d9:8f:00:b2:04:e9:80:09:98:ec:f8:42:7e");
    }

    #[test]
    fn test_armor_and_line_breaks_ignored() {
        let wrapped = concat!(
            "-----BEGIN PUBLIC KEY-----\r\n",
            "AAECAwQF\r\nBgcICQ==\r\n",
            "-----END PUBLIC KEY-----"
        );
        let a = Fingerprint::of_public_key(PEM, FingerprintAlgorithm::Sha256).unwrap();
        let b = Fingerprint::of_public_key(wrapped, FingerprintAlgorithm::Sha256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_body() {
        let empty = "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----";
        assert!(Fingerprint::of_public_key(empty, FingerprintAlgorithm::Sha256).is_err());
        assert!(Fingerprint::of_public_key("not base64 !!", FingerprintAlgorithm::Md5).is_err());
    }
}
