//! # Hybrid Envelopes
//!
//! Seal bulk data to an RSA public key; open it with the matching
//! passphrase-protected private key.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SEALED ENVELOPE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  transport_key = RSA-PKCS1v15( recipient public key, bulk key[32] )    │
//! │                                                                         │
//! │  payload       = ┌──────────┬──────────────────────────────────┐        │
//! │                  │ IV (16)  │ AES-256-CBC / PKCS#7 ciphertext  │        │
//! │                  └──────────┴──────────────────────────────────┘        │
//! │                                                                         │
//! │  Both parts are either raw bytes or standard base64 text.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payload carries no MAC. Integrity rests on the transport key being
//! intact, which is a known weakness of this format; use the AEAD envelope
//! in [`crate::crypto::envelope`] where the wire format is not fixed.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use regex::bytes::Regex;
use rsa::Pkcs1v15Encrypt;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::algorithm::Capability;
use super::cipher::{Cipher, CBC_IV_SIZE};
use super::keys::{KeyParameters, PrivateKey, PublicKey};
use crate::error::{Error, Result};

type CbcEncryptor = cbc::Encryptor<Aes256>;
type CbcDecryptor = cbc::Decryptor<Aes256>;

/// Inputs matching this are treated as base64 text
static BASE64_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9/\r\n+]*={0,2}$").expect("static pattern compiles")
});

/// Output encoding of a sealed envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Armor {
    /// Raw bytes
    #[default]
    Raw,
    /// Standard base64 text
    Base64,
}

/// Result of [`seal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Bulk key encrypted to the recipient
    pub transport_key: Vec<u8>,
    /// `iv || ciphertext`
    pub payload: Vec<u8>,
}

/// Seal `plaintext` to the public key of `recipient`
///
/// ## Errors
///
/// `Capability` if the recipient is not an RSA key.
pub fn seal(plaintext: &[u8], recipient: &KeyParameters, armor: Armor) -> Result<SealedEnvelope> {
    recipient
        .algorithm()
        .require(Capability::KeyTransport, "seal")?;

    let public_key = match recipient.load_public_key()? {
        PublicKey::Rsa(key) => key,
        _ => return Err(Error::InvalidKey("expected an RSA public key".into())),
    };

    let cipher = Cipher::Aes256Cbc;
    let mut bulk_key = Zeroizing::new(vec![0u8; cipher.key_len()]);
    OsRng.fill_bytes(&mut bulk_key);
    let mut iv = [0u8; CBC_IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = CbcEncryptor::new_from_slices(&bulk_key, &iv)
        .map_err(|e| Error::Internal(format!("cbc init: {}", e)))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let transport_key = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &bulk_key)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

    let mut payload = Vec::with_capacity(CBC_IV_SIZE + ciphertext.len());
    payload.extend_from_slice(&iv);
    payload.extend_from_slice(&ciphertext);

    tracing::debug!(bytes = plaintext.len(), ?armor, "Sealed payload");

    Ok(match armor {
        Armor::Raw => SealedEnvelope {
            transport_key,
            payload,
        },
        Armor::Base64 => SealedEnvelope {
            transport_key: BASE64.encode(transport_key).into_bytes(),
            payload: BASE64.encode(payload).into_bytes(),
        },
    })
}

/// Open a sealed payload with the recipient's private key
///
/// Either part may be raw or base64; base64 is detected per part.
///
/// ## Errors
///
/// `Capability` for a non-RSA recipient, `DecryptPrivateKey` for a wrong
/// passphrase or salt, `DecryptionFailed` for everything else.
pub fn open(
    payload: &[u8],
    transport_key: &[u8],
    recipient: &KeyParameters,
    passphrase: &str,
    salt: &str,
) -> Result<Vec<u8>> {
    recipient
        .algorithm()
        .require(Capability::KeyTransport, "open")?;

    let payload = unarmor(payload)?;
    let transport_key = unarmor(transport_key)?;

    if payload.len() < CBC_IV_SIZE {
        return Err(Error::DecryptionFailed("payload shorter than IV".into()));
    }
    let (iv, ciphertext) = payload.split_at(CBC_IV_SIZE);

    let private_key = match recipient.private_key(passphrase, salt)? {
        PrivateKey::Rsa(key) => key,
        _ => return Err(Error::InvalidKey("expected an RSA private key".into())),
    };

    let bulk_key = private_key
        .decrypt(Pkcs1v15Encrypt, &transport_key)
        .map(Zeroizing::new)
        .map_err(|e| Error::DecryptionFailed(format!("transport key: {}", e)))?;

    let plaintext = CbcDecryptor::new_from_slices(&bulk_key, iv)
        .map_err(|_| Error::DecryptionFailed("transport key has wrong length".into()))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed("bad padding".into()))?;

    tracing::debug!(bytes = plaintext.len(), "Opened payload");
    Ok(plaintext)
}

fn unarmor(data: &[u8]) -> Result<Vec<u8>> {
    if !BASE64_TEXT.is_match(data) {
        return Ok(data.to_vec());
    }
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();
    BASE64
        .decode(compact)
        .map_err(|e| Error::DecryptionFailed(format!("invalid base64: {}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::algorithm::AlgorithmParams;

    const PASSPHRASE: &str = "passphrase";
    const SALT: &str = "salt";

    static RECIPIENT: Lazy<KeyParameters> = Lazy::new(|| {
        KeyParameters::generate(PASSPHRASE, SALT, Some(AlgorithmParams::rsa(1024))).unwrap()
    });

    #[test]
    fn test_seal_open_raw() {
        let sealed = seal(b"bulk data", &RECIPIENT, Armor::Raw).unwrap();
        assert_eq!(sealed.transport_key.len(), 128);
        // one IV plus one padded block
        assert_eq!(sealed.payload.len(), 32);

        let opened =
            open(&sealed.payload, &sealed.transport_key, &RECIPIENT, PASSPHRASE, SALT).unwrap();
        assert_eq!(opened, b"bulk data");
    }

    #[test]
    fn test_seal_open_base64() {
        let plaintext = vec![7u8; 1000];
        let sealed = seal(&plaintext, &RECIPIENT, Armor::Base64).unwrap();
        assert!(BASE64_TEXT.is_match(&sealed.payload));
        assert!(BASE64_TEXT.is_match(&sealed.transport_key));

        let opened =
            open(&sealed.payload, &sealed.transport_key, &RECIPIENT, PASSPHRASE, SALT).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_mixed_armor() {
        let raw = seal(b"mixed", &RECIPIENT, Armor::Raw).unwrap();
        let payload = BASE64.encode(&raw.payload);
        let opened =
            open(payload.as_bytes(), &raw.transport_key, &RECIPIENT, PASSPHRASE, SALT).unwrap();
        assert_eq!(opened, b"mixed");
    }

    #[test]
    fn test_fresh_key_and_iv_per_seal() {
        let a = seal(b"same", &RECIPIENT, Armor::Raw).unwrap();
        let b = seal(b"same", &RECIPIENT, Armor::Raw).unwrap();
        assert_ne!(a.payload, b.payload);
        assert_ne!(a.transport_key, b.transport_key);
    }

    #[test]
    fn test_open_with_wrong_transport_key() {
        let a = seal(b"one", &RECIPIENT, Armor::Raw).unwrap();
        let mut key = a.transport_key.clone();
        key[5] ^= 0xFF;
        let result = open(&a.payload, &key, &RECIPIENT, PASSPHRASE, SALT);
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_open_truncated_payload() {
        let sealed = seal(b"data", &RECIPIENT, Armor::Raw).unwrap();
        let truncated = &sealed.payload[..8];
        let result = open(truncated, &sealed.transport_key, &RECIPIENT, PASSPHRASE, SALT);
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_open_wrong_passphrase() {
        let sealed = seal(b"data", &RECIPIENT, Armor::Raw).unwrap();
        let result = open(&sealed.payload, &sealed.transport_key, &RECIPIENT, "nope", SALT);
        assert!(matches!(result, Err(Error::DecryptPrivateKey)));
    }

    #[test]
    fn test_ec_recipient_rejected() {
        let ec = KeyParameters::generate(PASSPHRASE, SALT, None).unwrap();
        assert!(matches!(
            seal(b"data", &ec, Armor::Raw),
            Err(Error::Capability { operation: "seal", .. })
        ));
        assert!(matches!(
            open(b"", b"", &ec, PASSPHRASE, SALT),
            Err(Error::Capability { operation: "open", .. })
        ));
    }

    #[test]
    fn test_base64_detection() {
        assert!(BASE64_TEXT.is_match(b"QUJD\r\nREVG"));
        assert!(BASE64_TEXT.is_match(b"QQ=="));
        assert!(!BASE64_TEXT.is_match(b"QQ==="));
        assert!(!BASE64_TEXT.is_match(&[0x00, 0xFF, 0x10]));
    }
}
