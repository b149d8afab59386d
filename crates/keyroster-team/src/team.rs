//! The team value and its signed roster

use keyroster_signing::{Fingerprint, SigningKey, VerificationKey};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::codec;
use crate::error::{Result, TeamError, ValidationError};
use crate::person::Person;
use crate::slug::slugify;
use crate::validation;

/// A team and, once signed or loaded, the roster text it came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    /// Permanent identity; names aren't unique
    pub uuid: Uuid,
    /// Bumped every time the roster is re-signed
    pub version: u32,
    /// In roster order
    pub people: Vec<Person>,
    pub(crate) roster: String,
    pub(crate) signature: String,
}

impl Team {
    /// New unsigned team with a fresh UUID
    pub fn new(name: impl Into<String>, people: Vec<Person>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
            people,
            ..Self::default()
        }
    }

    /// The stored roster text and its signature, exactly as signed or loaded
    pub fn roster(&self) -> (&str, &str) {
        (&self.roster, &self.signature)
    }

    /// Whether a signed roster is held
    pub fn is_signed(&self) -> bool {
        !self.roster.is_empty() && !self.signature.is_empty()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Version the next signed roster will carry
    pub fn next_version(&self) -> Result<u32> {
        self.version
            .checked_add(1)
            .ok_or(TeamError::VersionExhausted(self.version))
    }

    /// The roster text the next [`update_roster`](Self::update_roster) would
    /// sign. Nothing is changed.
    pub fn preview_roster(&self) -> Result<String> {
        let next = Team {
            version: self.next_version()?,
            ..self.clone()
        };
        Ok(codec::serialize(&next))
    }

    /// Re-sign the roster with an admin's key.
    ///
    /// On success the version is bumped and the new roster text and
    /// signature replace the stored pair together. On failure nothing
    /// changes.
    #[instrument(skip(self, key), fields(team = %self.uuid, signer = %key.fingerprint()))]
    pub fn update_roster(&mut self, key: &dyn SigningKey) -> Result<()> {
        self.validate()?;

        let signer = key.fingerprint();
        if !self.is_admin(&signer) {
            return Err(TeamError::NotAnAdmin(signer));
        }

        let version = self.next_version()?;
        let roster = codec::serialize(&Team {
            version,
            ..self.clone()
        });
        let signature = key.sign_detached(roster.as_bytes())?;

        self.version = version;
        self.roster = roster;
        self.signature = signature;

        info!(version, "Signed team roster");
        Ok(())
    }

    /// Admins in roster order
    pub fn admins(&self) -> Vec<&Person> {
        self.people.iter().filter(|p| p.is_admin).collect()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.people.iter().any(|p| p.fingerprint == *fingerprint)
    }

    pub fn is_admin(&self, fingerprint: &Fingerprint) -> bool {
        self.people
            .iter()
            .any(|p| p.is_admin && p.fingerprint == *fingerprint)
    }

    pub fn get_person_for_fingerprint(&self, fingerprint: &Fingerprint) -> Result<&Person> {
        self.people
            .iter()
            .find(|p| p.fingerprint == *fingerprint)
            .ok_or(TeamError::PersonNotFound)
    }

    /// Directory name under the teams directory: `<slug>-<uuid>`, or the
    /// bare UUID when the name has no usable characters
    pub fn sub_directory(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            self.uuid.to_string()
        } else {
            format!("{}-{}", slug, self.uuid)
        }
    }
}
