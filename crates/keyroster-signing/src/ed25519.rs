//! Ed25519 keys producing OpenPGP v4 detached signatures

use chrono::Utc;
use ed25519_dalek::{Signature, Signer, Verifier};
use rand::rngs::OsRng;
use std::fmt;
use tracing::debug;

use crate::error::{Result, SigningError};
use crate::fingerprint::Fingerprint;
use crate::key::{SigningKey, VerificationKey};
use crate::openpgp::packet::{ALGORITHM_EDDSA, HASH_SHA256, SIGNATURE_TYPE_BINARY};
use crate::openpgp::{armor, packet, SignaturePacket, SIGNATURE_LABEL};

/// Public half of an Ed25519 OpenPGP key
#[derive(Clone, PartialEq, Eq)]
pub struct Ed25519PublicKey {
    key: ed25519_dalek::VerifyingKey,
    created_at: u32,
    fingerprint: Fingerprint,
}

impl Ed25519PublicKey {
    /// Build from the raw 32-byte point and the key creation time.
    ///
    /// The creation time is part of the fingerprint, so it must be the one
    /// the key was published with.
    pub fn from_bytes(bytes: &[u8; 32], created_at: u32) -> Result<Self> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key, created_at))
    }

    fn new(key: ed25519_dalek::VerifyingKey, created_at: u32) -> Self {
        let fingerprint = packet::ed25519_fingerprint(key.as_bytes(), created_at);
        Self {
            key,
            created_at,
            fingerprint,
        }
    }

    /// Raw public point
    pub fn to_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    /// Creation time, seconds since the epoch
    pub fn created_at(&self) -> u32 {
        self.created_at
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519PublicKey")
            .field("fingerprint", &self.fingerprint)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl VerificationKey for Ed25519PublicKey {
    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    fn verify_detached(&self, data: &[u8], armored_signature: &str) -> Result<()> {
        if armored_signature.trim().is_empty() {
            return Err(SigningError::EmptySignature);
        }

        let bytes = armor::decode(SIGNATURE_LABEL, armored_signature)?;
        let sig = SignaturePacket::from_bytes(&bytes)?;

        if sig.signature_type != SIGNATURE_TYPE_BINARY {
            return Err(SigningError::Unsupported(format!(
                "signature type {:#04x}",
                sig.signature_type
            )));
        }
        if sig.public_key_algorithm != ALGORITHM_EDDSA {
            return Err(SigningError::Unsupported(format!(
                "public key algorithm {}",
                sig.public_key_algorithm
            )));
        }
        if sig.hash_algorithm != HASH_SHA256 {
            return Err(SigningError::Unsupported(format!(
                "hash algorithm {}",
                sig.hash_algorithm
            )));
        }

        let issued_by_us = match sig.issuer_fingerprint()? {
            Some(issuer) => issuer == self.fingerprint,
            None => match sig.issuer_key_id()? {
                Some(key_id) => key_id == self.fingerprint.key_id(),
                None => {
                    return Err(SigningError::MalformedPacket(
                        "signature names no issuer".to_string(),
                    ))
                }
            },
        };
        if !issued_by_us {
            return Err(SigningError::UnknownIssuer);
        }

        let digest = sig.digest(data);
        if digest[..2] != sig.hash_tag {
            return Err(SigningError::HashTagMismatch);
        }

        if sig.mpis.len() != 2 {
            return Err(SigningError::MalformedPacket(format!(
                "expected 2 EdDSA values, found {}",
                sig.mpis.len()
            )));
        }
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&left_pad(&sig.mpis[0])?);
        raw[32..].copy_from_slice(&left_pad(&sig.mpis[1])?);

        let signature = Signature::from_slice(&raw)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))?;
        self.key
            .verify(&digest, &signature)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))
    }
}

/// Ed25519 secret key with its OpenPGP identity
#[derive(Clone)]
pub struct Ed25519SecretKey {
    secret: ed25519_dalek::SigningKey,
    public: Ed25519PublicKey,
}

impl Ed25519SecretKey {
    /// Generate a fresh key created now
    pub fn generate() -> Self {
        let secret = ed25519_dalek::SigningKey::generate(&mut OsRng);
        Self::from_signing_key(secret, unix_now())
    }

    /// Rebuild a key from its 32-byte seed and creation time
    pub fn from_seed(seed: &[u8; 32], created_at: u32) -> Self {
        Self::from_signing_key(ed25519_dalek::SigningKey::from_bytes(seed), created_at)
    }

    fn from_signing_key(secret: ed25519_dalek::SigningKey, created_at: u32) -> Self {
        let public = Ed25519PublicKey::new(secret.verifying_key(), created_at);
        Self { secret, public }
    }

    /// The 32-byte seed; keep it secret
    pub fn seed(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Public half
    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public
    }

    /// Detached signature carrying an explicit signature creation time
    pub fn sign_detached_at(&self, data: &[u8], signed_at: u32) -> String {
        let mut sig = SignaturePacket::binary_eddsa(&self.public.fingerprint, signed_at);
        let digest = sig.digest(data);
        sig.hash_tag = [digest[0], digest[1]];

        let raw = self.secret.sign(&digest).to_bytes();
        sig.mpis = vec![raw[..32].to_vec(), raw[32..].to_vec()];

        debug!(fingerprint = %self.public.fingerprint, bytes = data.len(), "made detached signature");
        armor::encode(SIGNATURE_LABEL, &sig.to_bytes())
    }
}

impl fmt::Debug for Ed25519SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519SecretKey")
            .field("fingerprint", &self.public.fingerprint)
            .finish_non_exhaustive()
    }
}

impl VerificationKey for Ed25519SecretKey {
    fn fingerprint(&self) -> Fingerprint {
        self.public.fingerprint
    }

    fn verify_detached(&self, data: &[u8], armored_signature: &str) -> Result<()> {
        self.public.verify_detached(data, armored_signature)
    }
}

impl SigningKey for Ed25519SecretKey {
    fn sign_detached(&self, data: &[u8]) -> Result<String> {
        Ok(self.sign_detached_at(data, unix_now()))
    }
}

fn left_pad(value: &[u8]) -> Result<[u8; 32]> {
    if value.len() > 32 {
        return Err(SigningError::MalformedPacket(format!(
            "EdDSA value is {} bytes",
            value.len()
        )));
    }
    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    Ok(out)
}

fn unix_now() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}
