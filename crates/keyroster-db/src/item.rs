//! Things events can be recorded against

use keyroster_signing::Fingerprint;
use keyroster_team::Team;
use std::fmt;
use uuid::Uuid;

/// Subject of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    Key(Fingerprint),
    Team(Uuid),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(fingerprint) => write!(f, "key:{}", fingerprint.uri()),
            Self::Team(uuid) => write!(f, "team:{uuid}"),
        }
    }
}

impl From<Fingerprint> for Item {
    fn from(fingerprint: Fingerprint) -> Self {
        Self::Key(fingerprint)
    }
}

impl From<&Team> for Item {
    fn from(team: &Team) -> Self {
        Self::Team(team.uuid)
    }
}
