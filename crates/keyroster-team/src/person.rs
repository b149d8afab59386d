//! Team members

use keyroster_signing::Fingerprint;
use serde::{Deserialize, Serialize};

/// One entry in a roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub email: String,
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub is_admin: bool,
}

impl Person {
    pub fn new(email: impl Into<String>, fingerprint: Fingerprint, is_admin: bool) -> Self {
        Self {
            email: email.into(),
            fingerprint,
            is_admin,
        }
    }
}
