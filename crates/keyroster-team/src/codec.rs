//! Canonical roster text
//!
//! Signatures cover the exact bytes of a roster, so [`serialize`] writes
//! every field by hand in a fixed order instead of going through a generic
//! encoder.

use keyroster_signing::Fingerprint;
use serde::Deserialize;
use std::fmt::Write;
use tracing::debug;
use uuid::Uuid;

use crate::error::ParseError;
use crate::person::Person;
use crate::team::Team;

#[derive(Debug, Deserialize)]
struct RosterDocument {
    uuid: Option<String>,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "person")]
    people: Vec<PersonEntry>,
}

#[derive(Debug, Deserialize)]
struct PersonEntry {
    email: String,
    fingerprint: String,
    #[serde(default)]
    is_admin: bool,
}

/// Render `team` (with its current version) as roster text
pub fn serialize(team: &Team) -> String {
    let mut out = String::new();
    let header_name: String = team
        .name
        .chars()
        .map(|c| if c.is_control() && c != '\t' { ' ' } else { c })
        .collect();

    // Writing to a String can't fail
    let _ = writeln!(
        out,
        "# {header_name} team roster. Everyone in the team has a copy of this file."
    );
    out.push_str("#\n");
    out.push_str("# It is used to look up which key to use for an email address and fetch keys\n");
    out.push_str("# automatically.\n");
    let _ = writeln!(out, "uuid = {}", quote(&team.uuid.to_string()));
    let _ = writeln!(out, "version = {}", team.version);
    let _ = writeln!(out, "name = {}", quote(&team.name));

    for person in &team.people {
        out.push('\n');
        out.push_str("[[person]]\n");
        let _ = writeln!(out, "  email = {}", quote(&person.email));
        let _ = writeln!(out, "  fingerprint = {}", quote(&person.fingerprint.hex()));
        let _ = writeln!(out, "  is_admin = {}", person.is_admin);
    }

    out
}

/// Read roster text into a team.
///
/// Neither the signature nor the roster rules are checked here; the
/// returned team's stored roster and signature are empty.
pub fn parse(text: &str) -> Result<Team, ParseError> {
    let doc: RosterDocument = toml::from_str(text)?;

    let uuid = match doc.uuid.as_deref() {
        None => Uuid::nil(),
        Some(raw) => Uuid::parse_str(raw).map_err(|_| ParseError::InvalidUuid(raw.to_string()))?,
    };

    let people = doc
        .people
        .into_iter()
        .map(|entry| {
            let fingerprint = Fingerprint::parse(&entry.fingerprint).map_err(|_| {
                ParseError::InvalidFingerprint {
                    email: entry.email.clone(),
                    value: entry.fingerprint.clone(),
                }
            })?;
            Ok(Person {
                email: entry.email,
                fingerprint,
                is_admin: entry.is_admin,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    debug!(%uuid, version = doc.version, people = people.len(), "Parsed roster");

    Ok(Team {
        name: doc.name,
        uuid,
        version: doc.version,
        people,
        ..Team::default()
    })
}

/// TOML basic string
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
