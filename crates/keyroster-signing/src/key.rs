//! Key capabilities consumed by the roster code

use tracing::debug;

use crate::error::{Result, SigningError};
use crate::fingerprint::Fingerprint;

/// A public key that can check detached signatures
pub trait VerificationKey {
    /// Fingerprint identifying this key
    fn fingerprint(&self) -> Fingerprint;

    /// Check an armored detached signature over `data`.
    ///
    /// Returns [`SigningError::UnknownIssuer`] when the signature was made by
    /// some other key.
    fn verify_detached(&self, data: &[u8], armored_signature: &str) -> Result<()>;
}

/// A private key that can produce detached signatures
pub trait SigningKey: VerificationKey {
    /// Armored detached signature over exactly `data`
    fn sign_detached(&self, data: &[u8]) -> Result<String>;
}

impl<K: VerificationKey + ?Sized> VerificationKey for Box<K> {
    fn fingerprint(&self) -> Fingerprint {
        (**self).fingerprint()
    }

    fn verify_detached(&self, data: &[u8], armored_signature: &str) -> Result<()> {
        (**self).verify_detached(data, armored_signature)
    }
}

impl<K: SigningKey + ?Sized> SigningKey for Box<K> {
    fn sign_detached(&self, data: &[u8]) -> Result<String> {
        (**self).sign_detached(data)
    }
}

/// Verify a roster's detached signature against candidate keys.
///
/// Succeeds as soon as one candidate made the signature. Choosing the
/// candidates (usually the team's admins) is up to the caller.
pub fn verify_roster(
    roster: &str,
    signature: &str,
    candidates: &[&dyn VerificationKey],
) -> Result<()> {
    if signature.is_empty() {
        return Err(SigningError::EmptySignature);
    }

    let mut failure = None;
    for key in candidates {
        match key.verify_detached(roster.as_bytes(), signature) {
            Ok(()) => {
                debug!(fingerprint = %key.fingerprint(), "roster signature verified");
                return Ok(());
            }
            Err(SigningError::UnknownIssuer) => {}
            Err(e) => {
                debug!(fingerprint = %key.fingerprint(), error = %e, "candidate key rejected signature");
                failure.get_or_insert(e);
            }
        }
    }

    Err(failure.unwrap_or(SigningError::UnknownIssuer))
}
