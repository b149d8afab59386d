//! Minimal OpenPGP support: v4 fingerprints, detached signature packets and
//! ASCII armor.

pub mod armor;
pub mod packet;

pub use armor::SIGNATURE_LABEL;
pub use packet::SignaturePacket;
