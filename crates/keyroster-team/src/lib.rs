//! Keyroster Team - signed rosters of who holds which key
//!
//! A team's roster maps email addresses to OpenPGP fingerprints and marks
//! which people are administrators. The roster is stored as a TOML document
//! plus a detached signature made by one of the admins:
//!
//! ```text
//! <teams dir>/<slug>-<uuid>/roster.toml
//! <teams dir>/<slug>-<uuid>/roster.toml.asc
//! ```

pub mod codec;
pub mod error;
pub mod merge;
pub mod person;
pub mod request;
pub mod slug;
pub mod store;
pub mod team;
pub mod validation;

pub use error::{ParseError, Result, TeamError, ValidationError};
pub use merge::UpsertWarning;
pub use person::Person;
pub use request::RequestToJoinTeam;
pub use store::{
    directory, find_team, find_team_subdirectories, load, load_teams, save_team, RosterSaver,
    ROSTER_FILENAME, SIGNATURE_FILENAME,
};
pub use team::Team;
