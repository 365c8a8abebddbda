//! # Symmetric Envelope
//!
//! AES-GCM encryption framed into one self-describing byte string.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ENVELOPE LAYOUTS                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Current (default):                                                    │
//! │  ┌──────────────┬──────────────────────────────┬──────────────────┐    │
//! │  │  IV (12)     │  Ciphertext (len = plaintext) │  Tag (16)        │    │
//! │  └──────────────┴──────────────────────────────┴──────────────────┘    │
//! │                                                                         │
//! │  Legacy:                                                               │
//! │  ┌──────────────┬──────────────────┬──────────────────────────────┐    │
//! │  │  IV (12)     │  Tag (16)        │  Ciphertext                  │    │
//! │  └──────────────┴──────────────────┴──────────────────────────────┘    │
//! │                                                                         │
//! │  Both layouts are base64 armored for transport.                       │
//! │  IV length comes from the cipher; the tag is always 16 bytes.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads written by older releases use the legacy layout and stay
//! readable by passing [`Framing::Legacy`] explicitly. New payloads are always
//! written in the current layout unless legacy output is requested.
//!
//! The codec holds only the cipher choice. Key and IV are passed per call and
//! the tag is returned, so one codec can be shared across threads.

use aes_gcm::aead::{self, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::cipher::{Cipher, TAG_SIZE};
use crate::error::{Error, Result};

/// Size of a generated symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Associated data bound into every envelope.
///
/// Fixed for compatibility with envelopes produced by earlier releases.
pub const ENVELOPE_AAD: &[u8] = b"127.0.0.1";

/// Byte order of the framed envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// `iv ‖ tag ‖ ciphertext`
    Legacy,
    /// `iv ‖ ciphertext ‖ tag`
    #[default]
    Current,
}

/// Parts of an AEAD envelope before framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricEnvelope {
    /// Initialization vector, cipher-defined length
    pub iv: Vec<u8>,
    /// GCM authentication tag
    pub tag: [u8; TAG_SIZE],
    /// Encrypted payload
    pub ciphertext: Vec<u8>,
}

impl SymmetricEnvelope {
    /// Concatenate the parts in the given layout
    pub fn to_bytes(&self, framing: Framing) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.iv.len() + TAG_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        match framing {
            Framing::Legacy => {
                out.extend_from_slice(&self.tag);
                out.extend_from_slice(&self.ciphertext);
            }
            Framing::Current => {
                out.extend_from_slice(&self.ciphertext);
                out.extend_from_slice(&self.tag);
            }
        }
        out
    }

    /// Split a framed byte string
    ///
    /// A string too short to hold an IV and a tag cannot authenticate and is
    /// reported as `AuthenticationFailed`.
    pub fn from_bytes(bytes: &[u8], iv_len: usize, framing: Framing) -> Result<Self> {
        if bytes.len() < iv_len + TAG_SIZE {
            return Err(Error::AuthenticationFailed);
        }

        let (iv, rest) = bytes.split_at(iv_len);
        let (tag, ciphertext) = match framing {
            Framing::Legacy => {
                let (tag, ciphertext) = rest.split_at(TAG_SIZE);
                (tag, ciphertext)
            }
            Framing::Current => {
                let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
                (tag, ciphertext)
            }
        };

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(tag);

        Ok(Self {
            iv: iv.to_vec(),
            tag: tag_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Frame and base64 encode
    pub fn armor(&self, framing: Framing) -> String {
        BASE64.encode(self.to_bytes(framing))
    }
}

/// Generate a random 256-bit key
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::rngs::OsRng.fill_bytes(key.as_mut_slice());
    key
}

/// Generate a random IV for the named cipher, or for AES-256-GCM when no
/// name is given
///
/// ## Errors
///
/// - `UnsupportedCipher` if the name is unknown
/// - `IvLength` if the cipher takes no IV
pub fn generate_iv(cipher_override: Option<&str>) -> Result<Vec<u8>> {
    let cipher = match cipher_override {
        Some(name) => name.parse()?,
        None => Cipher::default(),
    };
    random_iv(cipher)
}

pub(crate) fn random_iv(cipher: Cipher) -> Result<Vec<u8>> {
    let mut iv = vec![0u8; cipher.require_iv_len()?];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    Ok(iv)
}

/// AEAD envelope codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeCodec {
    cipher: Cipher,
}

impl EnvelopeCodec {
    /// Create a codec for the given cipher
    pub fn new(cipher: Cipher) -> Self {
        Self { cipher }
    }

    /// Create a codec from an OpenSSL style cipher name
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    /// The configured cipher
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Random key sized for the configured cipher
    pub fn generate_key(&self) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; self.cipher.key_len()]);
        rand::rngs::OsRng.fill_bytes(&mut key);
        key
    }

    /// Random IV sized for the configured cipher
    pub fn generate_iv(&self) -> Result<Vec<u8>> {
        random_iv(self.cipher)
    }

    /// Encrypt into envelope parts
    pub fn encrypt_envelope(
        &self,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<SymmetricEnvelope> {
        let iv_len = self.cipher.require_iv_len()?;
        if iv.len() != iv_len {
            return Err(Error::InvalidParameter(format!(
                "{} needs a {}-byte IV, got {}",
                self.cipher,
                iv_len,
                iv.len()
            )));
        }

        let (ciphertext, tag) = match self.cipher {
            Cipher::Aes256Gcm => encrypt_detached::<Aes256Gcm>(key, iv, plaintext)?,
            Cipher::Aes128Gcm => encrypt_detached::<Aes128Gcm>(key, iv, plaintext)?,
            other => return Err(Error::UnsupportedCipher(other.to_string())),
        };

        Ok(SymmetricEnvelope {
            iv: iv.to_vec(),
            tag,
            ciphertext,
        })
    }

    /// Encrypt and return the base64 armored envelope
    ///
    /// ## Example
    ///
    /// ```ignore
    /// let codec = EnvelopeCodec::default();
    /// let key = generate_key();
    /// let iv = codec.generate_iv()?;
    /// let armored = codec.encrypt(key.as_slice(), &iv, b"secret", Framing::Current)?;
    /// ```
    pub fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        framing: Framing,
    ) -> Result<String> {
        Ok(self.encrypt_envelope(key, iv, plaintext)?.armor(framing))
    }

    /// Verify and decrypt envelope parts
    pub fn decrypt_envelope(&self, key: &[u8], envelope: &SymmetricEnvelope) -> Result<Vec<u8>> {
        let iv_len = self.cipher.require_iv_len()?;
        if envelope.iv.len() != iv_len {
            return Err(Error::AuthenticationFailed);
        }

        match self.cipher {
            Cipher::Aes256Gcm => decrypt_detached::<Aes256Gcm>(key, envelope),
            Cipher::Aes128Gcm => decrypt_detached::<Aes128Gcm>(key, envelope),
            other => Err(Error::UnsupportedCipher(other.to_string())),
        }
    }

    /// Decode, unframe, verify and decrypt an armored envelope
    ///
    /// ## Errors
    ///
    /// - `IvLength` if the configured cipher takes no IV
    /// - `Encoding` if the input is not base64 (line breaks are ignored)
    /// - `AuthenticationFailed` on any tag mismatch, corruption or truncation
    pub fn decrypt(&self, key: &[u8], armored: &str, framing: Framing) -> Result<Vec<u8>> {
        let iv_len = self.cipher.require_iv_len()?;
        let compact: String = armored
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = BASE64.decode(compact)?;
        let envelope = SymmetricEnvelope::from_bytes(&bytes, iv_len, framing)?;
        self.decrypt_envelope(key, &envelope)
    }
}

fn encrypt_detached<C>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::InvalidKey(format!("wrong key length {}", key.len())))?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(aead::Nonce::<C>::from_slice(iv), ENVELOPE_AAD, &mut buffer)
        .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {}", e)))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok((buffer, tag_bytes))
}

fn decrypt_detached<C>(key: &[u8], envelope: &SymmetricEnvelope) -> Result<Vec<u8>>
where
    C: AeadInPlace + KeyInit,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::InvalidKey(format!("wrong key length {}", key.len())))?;

    let mut buffer = envelope.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            aead::Nonce::<C>::from_slice(&envelope.iv),
            ENVELOPE_AAD,
            &mut buffer,
            aead::Tag::<C>::from_slice(&envelope.tag),
        )
        .map_err(|_| Error::AuthenticationFailed)?;

    Ok(buffer)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt_with(framing: Framing, plaintext: &[u8]) -> (Zeroizing<[u8; KEY_SIZE]>, String) {
        let codec = EnvelopeCodec::default();
        let key = generate_key();
        let iv = codec.generate_iv().unwrap();
        let armored = codec.encrypt(key.as_slice(), &iv, plaintext, framing).unwrap();
        (key, armored)
    }

    #[test]
    fn test_round_trip_current() {
        let (key, armored) = encrypt_with(Framing::Current, b"This is going to be encrypted!");
        let plaintext = EnvelopeCodec::default()
            .decrypt(key.as_slice(), &armored, Framing::Current)
            .unwrap();
        assert_eq!(plaintext, b"This is going to be encrypted!");
    }

    #[test]
    fn test_round_trip_legacy() {
        let (key, armored) = encrypt_with(Framing::Legacy, b"legacy payload");
        let plaintext = EnvelopeCodec::default()
            .decrypt(key.as_slice(), &armored, Framing::Legacy)
            .unwrap();
        assert_eq!(plaintext, b"legacy payload");
    }

    #[test]
    fn test_decrypt_accepts_line_wrapped_armor() {
        let plaintext = vec![0x5a; 200];
        let (key, armored) = encrypt_with(Framing::Current, &plaintext);
        let wrapped = armored
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n")
            + "\n";
        assert!(wrapped.contains("\r\n"));

        let decrypted = EnvelopeCodec::default()
            .decrypt(key.as_slice(), &wrapped, Framing::Current)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_empty() {
        let (key, armored) = encrypt_with(Framing::Current, b"");
        let plaintext = EnvelopeCodec::default()
            .decrypt(key.as_slice(), &armored, Framing::Current)
            .unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn test_aes128_round_trip() {
        let codec = EnvelopeCodec::from_name("aes-128-gcm").unwrap();
        let key = codec.generate_key();
        assert_eq!(key.len(), 16);
        let iv = codec.generate_iv().unwrap();
        let armored = codec.encrypt(&key, &iv, b"short key", Framing::Current).unwrap();
        assert_eq!(
            codec.decrypt(&key, &armored, Framing::Current).unwrap(),
            b"short key"
        );
    }

    #[test]
    fn test_layouts_place_tag_differently() {
        let codec = EnvelopeCodec::default();
        let key = [7u8; KEY_SIZE];
        let iv = [1u8; 12];
        let envelope = codec.encrypt_envelope(&key, &iv, b"abc").unwrap();

        let current = envelope.to_bytes(Framing::Current);
        let legacy = envelope.to_bytes(Framing::Legacy);

        assert_eq!(&current[..12], &iv);
        assert_eq!(&legacy[..12], &iv);
        assert_eq!(&current[current.len() - TAG_SIZE..], &envelope.tag);
        assert_eq!(&legacy[12..12 + TAG_SIZE], &envelope.tag);
        assert_eq!(current.len(), 12 + 3 + TAG_SIZE);
    }

    #[test]
    fn test_wrong_framing_fails_authentication() {
        let (key, armored) = encrypt_with(Framing::Current, b"framed one way");
        let result = EnvelopeCodec::default().decrypt(key.as_slice(), &armored, Framing::Legacy);
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let codec = EnvelopeCodec::default();
        let key = [3u8; KEY_SIZE];
        let iv = [9u8; 12];

        for framing in [Framing::Current, Framing::Legacy] {
            let framed = codec
                .encrypt_envelope(&key, &iv, b"tamper me")
                .unwrap()
                .to_bytes(framing);

            // every bit of the ciphertext and tag regions
            for byte in 12..framed.len() {
                for bit in 0..8 {
                    let mut tampered = framed.clone();
                    tampered[byte] ^= 1 << bit;
                    let result = codec.decrypt(&key, &BASE64.encode(&tampered), framing);
                    assert!(matches!(result, Err(Error::AuthenticationFailed)));
                }
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let (_, armored) = encrypt_with(Framing::Current, b"secret");
        let result = EnvelopeCodec::default().decrypt(&[0u8; KEY_SIZE], &armored, Framing::Current);
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_truncated_envelope_fails() {
        let short = BASE64.encode([0u8; 20]);
        let result = EnvelopeCodec::default().decrypt(&[0u8; KEY_SIZE], &short, Framing::Current);
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_cipher_without_iv() {
        let codec = EnvelopeCodec::new(Cipher::Aes256Ecb);
        let result = codec.decrypt(&[0u8; KEY_SIZE], "AAAA", Framing::Current);
        assert!(matches!(result, Err(Error::IvLength(_))));
    }

    #[test]
    fn test_non_aead_cipher_rejected() {
        let codec = EnvelopeCodec::new(Cipher::Aes256Cbc);
        let iv = codec.generate_iv().unwrap();
        let result = codec.encrypt(&[0u8; KEY_SIZE], &iv, b"x", Framing::Current);
        assert!(matches!(result, Err(Error::UnsupportedCipher(_))));
    }

    #[test]
    fn test_generate_iv_sizes() {
        assert_eq!(generate_iv(None).unwrap().len(), 12);
        assert_eq!(generate_iv(Some("aes-256-cbc")).unwrap().len(), 16);
        assert!(matches!(
            generate_iv(Some("chacha-not-here")),
            Err(Error::UnsupportedCipher(_))
        ));
        assert!(matches!(
            generate_iv(Some("aes-256-ecb")),
            Err(Error::IvLength(_))
        ));
    }

    #[test]
    fn test_wrong_iv_length_rejected() {
        let result =
            EnvelopeCodec::default().encrypt(&[0u8; KEY_SIZE], &[0u8; 16], b"x", Framing::Current);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_random_ivs_give_different_output() {
        let codec = EnvelopeCodec::default();
        let key = generate_key();
        let a = codec
            .encrypt(key.as_slice(), &codec.generate_iv().unwrap(), b"same", Framing::Current)
            .unwrap();
        let b = codec
            .encrypt(key.as_slice(), &codec.generate_iv().unwrap(), b"same", Framing::Current)
            .unwrap();
        assert_ne!(a, b);
    }
}
