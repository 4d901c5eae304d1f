// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Envelope Codec
//!
//! AES-256-GCM implementation of [`PayloadCodec`]. The key is the SHA-256
//! digest of a shared passphrase taken from `HIVE_PSK` (or
//! `HIVE_PRIVATE_KEY`). Sealed payloads are ASCII:
//!
//! ```text
//! HIVE-SEAL/v1:<base64 nonce>:<base64 ciphertext+tag>
//! ```
//!
//! and are stored under the plain path with `.enc` appended.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::domain::codec::{CodecError, Encoded, PayloadCodec};

pub const SEAL_PREFIX: &str = "HIVE-SEAL/v1:";
pub const SEALED_SUFFIX: &str = ".enc";

const NONCE_LEN: usize = 12;

#[derive(Clone, Default)]
pub struct EnvelopeCodec {
    key: Option<[u8; 32]>,
}

// Never print key material.
impl fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodec").field("enabled", &self.key.is_some()).finish()
    }
}

impl EnvelopeCodec {
    pub fn disabled() -> Self {
        Self { key: None }
    }

    pub fn with_passphrase(passphrase: &str) -> Self {
        Self { key: Some(Sha256::digest(passphrase.as_bytes()).into()) }
    }

    /// Enabled iff `HIVE_PSK` or `HIVE_PRIVATE_KEY` holds a non-blank value.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ["HIVE_PSK", "HIVE_PRIVATE_KEY"]
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
            .map(|secret| Self::with_passphrase(secret.trim()))
            .unwrap_or_default()
    }

    fn cipher(key: &[u8; 32]) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
    }
}

pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.starts_with(SEAL_PREFIX.as_bytes())
}

impl PayloadCodec for EnvelopeCodec {
    fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    fn encode(&self, path: &str, bytes: Vec<u8>) -> Result<Encoded, CodecError> {
        let Some(key) = &self.key else {
            return Ok(Encoded { path: path.to_string(), bytes, encrypted: false });
        };

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = Self::cipher(key)
            .encrypt(&nonce, bytes.as_slice())
            .map_err(|e| CodecError::Seal(e.to_string()))?;

        let sealed = format!(
            "{}{}:{}",
            SEAL_PREFIX,
            STANDARD.encode(nonce.as_slice()),
            STANDARD.encode(ciphertext)
        );

        Ok(Encoded {
            path: format!("{}{}", path, SEALED_SUFFIX),
            bytes: sealed.into_bytes(),
            encrypted: true,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        if !is_sealed(bytes) {
            return Ok(bytes.to_vec());
        }
        let key = self.key.as_ref().ok_or(CodecError::KeyUnavailable)?;

        let body = std::str::from_utf8(&bytes[SEAL_PREFIX.len()..])
            .map_err(|_| CodecError::Rejected)?
            .trim();
        let (nonce_b64, ct_b64) = body.split_once(':').ok_or(CodecError::Rejected)?;
        let nonce = STANDARD.decode(nonce_b64).map_err(|_| CodecError::Rejected)?;
        let ciphertext = STANDARD.decode(ct_b64).map_err(|_| CodecError::Rejected)?;
        if nonce.len() != NONCE_LEN {
            return Err(CodecError::Rejected);
        }

        Self::cipher(key)
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CodecError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_passes_through() {
        let codec = EnvelopeCodec::disabled();
        let encoded = codec.encode("logs/a.json", b"{}".to_vec()).unwrap();
        assert_eq!(encoded.path, "logs/a.json");
        assert_eq!(encoded.bytes, b"{}");
        assert!(!encoded.encrypted);
        assert_eq!(codec.decode(b"{}").unwrap(), b"{}");
    }

    #[test]
    fn test_seal_and_open() {
        let codec = EnvelopeCodec::with_passphrase("correct horse");
        let encoded = codec.encode("logs/a.json", b"{\"x\":1}".to_vec()).unwrap();
        assert!(encoded.encrypted);
        assert_eq!(encoded.path, "logs/a.json.enc");
        assert!(is_sealed(&encoded.bytes));
        assert_eq!(codec.decode(&encoded.bytes).unwrap(), b"{\"x\":1}");
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let codec = EnvelopeCodec::with_passphrase("k");
        let a = codec.encode("p", b"same".to_vec()).unwrap();
        let b = codec.encode("p", b"same".to_vec()).unwrap();
        assert_ne!(a.bytes, b.bytes);
    }

    #[test]
    fn test_wrong_key_and_missing_key() {
        let sealed = EnvelopeCodec::with_passphrase("one").encode("p", b"secret".to_vec()).unwrap();
        assert!(matches!(
            EnvelopeCodec::with_passphrase("two").decode(&sealed.bytes),
            Err(CodecError::Rejected)
        ));
        assert!(matches!(
            EnvelopeCodec::disabled().decode(&sealed.bytes),
            Err(CodecError::KeyUnavailable)
        ));
    }

    #[test]
    fn test_garbage_after_prefix_rejected() {
        let codec = EnvelopeCodec::with_passphrase("k");
        assert!(matches!(codec.decode(b"HIVE-SEAL/v1:nonsense"), Err(CodecError::Rejected)));
        assert!(matches!(codec.decode(b"HIVE-SEAL/v1:AAAA:AAAA"), Err(CodecError::Rejected)));
    }

    #[test]
    fn test_from_lookup() {
        assert!(!EnvelopeCodec::from_lookup(|_| None).is_enabled());
        assert!(!EnvelopeCodec::from_lookup(|_| Some("  ".into())).is_enabled());
        let codec = EnvelopeCodec::from_lookup(|k| (k == "HIVE_PRIVATE_KEY").then(|| "pk".into()));
        assert!(codec.is_enabled());
        assert!(format!("{:?}", codec).contains("enabled: true"));
    }
}
