//! Requests to join a team

use chrono::{DateTime, Utc};
use keyroster_signing::Fingerprint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request, sent by us, to be added to a team's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToJoinTeam {
    pub team_uuid: Uuid,
    pub team_name: String,
    /// Key we asked to be listed with
    pub fingerprint: Fingerprint,
    pub requested_at: DateTime<Utc>,
}

impl RequestToJoinTeam {
    pub fn new(
        team_uuid: Uuid,
        team_name: impl Into<String>,
        fingerprint: Fingerprint,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            team_uuid,
            team_name: team_name.into(),
            fingerprint,
            requested_at,
        }
    }
}
