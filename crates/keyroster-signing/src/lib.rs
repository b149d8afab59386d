//! Keyroster Signing - key fingerprints and detached roster signatures
//!
//! Rosters are signed with OpenPGP v4 detached signatures. Keys come from
//! one of two backends:
//! - Ed25519: keys kept in a local [`Keyring`] directory, encrypted to an
//!   age [`Identity`]
//! - GnuPG: keys held by the user's `gpg` installation

pub mod ed25519;
pub mod error;
pub mod fingerprint;
pub mod gpg;
pub mod key;
pub mod keyring;
pub mod openpgp;
pub mod sealing;

pub use ed25519::{Ed25519PublicKey, Ed25519SecretKey};
pub use error::{Result, SigningError};
pub use fingerprint::Fingerprint;
pub use gpg::{Gpg, GpgKey, GpgSecretKey};
pub use key::{verify_roster, SigningKey, VerificationKey};
pub use keyring::{export_public, Keyring};
pub use sealing::Identity;
