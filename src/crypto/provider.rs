//! # Asymmetric Crypto Provider
//!
//! Signing, verification and the RSA-only direct transforms over a
//! [`KeyParameters`] keypair.
//!
//! ## Operation Matrix
//!
//! ```text
//! ┌────────────────────┬──────────────────────────┬──────────────────────────┐
//! │ Operation          │ RSA                      │ EC                       │
//! ├────────────────────┼──────────────────────────┼──────────────────────────┤
//! │ sign / verify      │ PKCS#1 v1.5, SHA-512     │ ECDSA (DER), SHA-256     │
//! │ encrypt / decrypt  │ PKCS#1 v1.5              │ Capability error         │
//! │ private_encrypt    │ PKCS#1 v1.5 type 1       │ Capability error         │
//! │ public_decrypt     │ PKCS#1 v1.5 type 1       │ Capability error         │
//! │ fingerprint        │ over SPKI DER            │ over SPKI DER            │
//! └────────────────────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! Capability checks run before any key material is decrypted, so an EC
//! keypair never has its private key loaded for an RSA-only operation.
//!
//! All ciphertexts and signatures cross this API as standard base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha512};

use super::algorithm::Capability;
use super::fingerprint::{Fingerprint, FingerprintAlgorithm};
use super::keys::{KeyParameters, PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Minimum count of `0xFF` filler bytes in a PKCS#1 type 1 block
const MIN_PADDING_LEN: usize = 8;

/// Asymmetric operations over one keypair
#[derive(Debug, Clone, Copy)]
pub struct CryptoProvider<'a> {
    keys: &'a KeyParameters,
}

impl<'a> CryptoProvider<'a> {
    /// Create a provider for `keys`
    pub fn new(keys: &'a KeyParameters) -> Self {
        Self { keys }
    }

    /// The keypair this provider works on
    pub fn keys(&self) -> &KeyParameters {
        self.keys
    }

    // ========================================================================
    // SIGNATURES
    // ========================================================================

    /// Sign `data` with the private key, returning a base64 signature
    pub fn sign(&self, data: &[u8], passphrase: &str, salt: &str) -> Result<String> {
        self.keys.algorithm().require(Capability::Sign, "sign")?;
        let private_key = self.keys.private_key(passphrase, salt)?;

        let signature = match &private_key {
            PrivateKey::Rsa(key) => rsa::pkcs1v15::SigningKey::<Sha512>::new(key.clone())
                .try_sign(data)
                .map_err(|e| Error::SigningFailed(e.to_string()))?
                .to_vec(),
            PrivateKey::P256(key) => {
                let signature: p256::ecdsa::Signature = p256::ecdsa::SigningKey::from(key)
                    .sign_prehash(&Sha256::digest(data))
                    .map_err(|e| Error::SigningFailed(e.to_string()))?;
                signature.to_der().as_bytes().to_vec()
            }
            PrivateKey::P384(key) => {
                let signature: p384::ecdsa::Signature = p384::ecdsa::SigningKey::from(key)
                    .sign_prehash(&Sha256::digest(data))
                    .map_err(|e| Error::SigningFailed(e.to_string()))?;
                signature.to_der().as_bytes().to_vec()
            }
        };

        Ok(BASE64.encode(signature))
    }

    /// Check a base64 signature over `data` against the public key
    ///
    /// Returns `false` for a mismatch, a malformed signature or an unusable
    /// public key.
    pub fn verify(&self, data: &[u8], signature: &str) -> bool {
        let Ok(signature) = BASE64.decode(signature.trim()) else {
            return false;
        };
        let public_key = match self.keys.load_public_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("Cannot verify, public key unusable: {}", e);
                return false;
            }
        };

        match public_key {
            PublicKey::Rsa(key) => {
                let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature.as_slice()) else {
                    return false;
                };
                rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key)
                    .verify(data, &signature)
                    .is_ok()
            }
            PublicKey::P256(key) => {
                let Ok(signature) = p256::ecdsa::Signature::from_der(&signature) else {
                    return false;
                };
                p256::ecdsa::VerifyingKey::from(&key)
                    .verify_prehash(&Sha256::digest(data), &signature)
                    .is_ok()
            }
            PublicKey::P384(key) => {
                let Ok(signature) = p384::ecdsa::Signature::from_der(&signature) else {
                    return false;
                };
                p384::ecdsa::VerifyingKey::from(&key)
                    .verify_prehash(&Sha256::digest(data), &signature)
                    .is_ok()
            }
        }
    }

    // ========================================================================
    // DIRECT RSA TRANSFORMS
    // ========================================================================

    /// Encrypt `data` to the public key
    pub fn encrypt(&self, data: &[u8]) -> Result<String> {
        self.keys
            .algorithm()
            .require(Capability::DirectEncryption, "encrypt")?;
        let key = self.rsa_public_key()?;
        let ciphertext = key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt a base64 ciphertext produced by [`CryptoProvider::encrypt`]
    pub fn decrypt(&self, ciphertext: &str, passphrase: &str, salt: &str) -> Result<Vec<u8>> {
        self.keys
            .algorithm()
            .require(Capability::DirectEncryption, "decrypt")?;
        let ciphertext = BASE64.decode(ciphertext.trim())?;
        let key = self.rsa_private_key(passphrase, salt)?;
        key.decrypt(Pkcs1v15Encrypt, &ciphertext)
            .map_err(|e| Error::DecryptionFailed(e.to_string()))
    }

    /// Transform `data` with the private key so anyone holding the public key
    /// can recover it
    pub fn private_encrypt(&self, data: &[u8], passphrase: &str, salt: &str) -> Result<String> {
        self.keys
            .algorithm()
            .require(Capability::DirectEncryption, "private_encrypt")?;
        let key = self.rsa_private_key(passphrase, salt)?;
        let ciphertext = key
            .sign(Pkcs1v15Sign::new_unprefixed(), data)
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Recover data produced by [`CryptoProvider::private_encrypt`]
    pub fn public_decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        self.keys
            .algorithm()
            .require(Capability::DirectEncryption, "public_decrypt")?;
        let ciphertext = BASE64.decode(ciphertext.trim())?;
        let key = self.rsa_public_key()?;
        unpad_type1(&raw_public_op(&key, &ciphertext)?)
    }

    // ========================================================================
    // FINGERPRINT
    // ========================================================================

    /// Fingerprint of `public_key_override`, or of the keypair's public key
    pub fn fingerprint(
        &self,
        public_key_override: Option<&str>,
        algorithm: FingerprintAlgorithm,
    ) -> Result<Fingerprint> {
        let public_key = public_key_override.unwrap_or_else(|| self.keys.public_key());
        Fingerprint::of_public_key(public_key, algorithm)
    }

    fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        match self.keys.load_public_key()? {
            PublicKey::Rsa(key) => Ok(key),
            _ => Err(Error::InvalidKey("expected an RSA public key".into())),
        }
    }

    fn rsa_private_key(&self, passphrase: &str, salt: &str) -> Result<rsa::RsaPrivateKey> {
        match self.keys.private_key(passphrase, salt)? {
            PrivateKey::Rsa(key) => Ok(key),
            _ => Err(Error::InvalidKey("expected an RSA private key".into())),
        }
    }
}

/// `c^e mod n`, left padded to the modulus size
fn raw_public_op(key: &RsaPublicKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let size = key.size();
    if ciphertext.len() != size {
        return Err(Error::DecryptionFailed(format!(
            "ciphertext is {} bytes, modulus is {}",
            ciphertext.len(),
            size
        )));
    }

    let c = BigUint::from_bytes_be(ciphertext);
    if &c >= key.n() {
        return Err(Error::DecryptionFailed("ciphertext out of range".into()));
    }

    let m = rsa::hazmat::rsa_encrypt(key, &c)
        .map_err(|e| Error::DecryptionFailed(e.to_string()))?
        .to_bytes_be();
    let mut block = vec![0u8; size - m.len()];
    block.extend_from_slice(&m);
    Ok(block)
}

/// Strip `00 01 FF.. 00` from a decrypted block
fn unpad_type1(block: &[u8]) -> Result<Vec<u8>> {
    let bad = || Error::DecryptionFailed("invalid PKCS#1 type 1 padding".into());

    if block.len() < 2 + MIN_PADDING_LEN + 1 || block[0] != 0x00 || block[1] != 0x01 {
        return Err(bad());
    }

    let filler = block[2..].iter().take_while(|&&b| b == 0xFF).count();
    let separator = 2 + filler;
    if filler < MIN_PADDING_LEN || block.get(separator) != Some(&0x00) {
        return Err(bad());
    }

    Ok(block[separator + 1..].to_vec())
}

// ============================================================================
// TESTS
// ============================================================================
