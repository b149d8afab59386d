//! Roster rules

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::team::Team;

/// Check the roster rules, returning the first one broken.
///
/// Checked in order: a non-nil UUID, unique emails, unique fingerprints, at
/// least one member, at least one admin.
pub fn validate(team: &Team) -> Result<(), ValidationError> {
    if team.uuid.is_nil() {
        return Err(ValidationError::InvalidUuid);
    }

    let mut emails = HashSet::new();
    for person in &team.people {
        if !emails.insert(person.email.as_str()) {
            return Err(ValidationError::DuplicateEmail(person.email.clone()));
        }
    }

    let mut fingerprints = HashSet::new();
    for person in &team.people {
        if !fingerprints.insert(person.fingerprint) {
            return Err(ValidationError::DuplicateFingerprint(person.fingerprint));
        }
    }

    if team.people.is_empty() {
        return Err(ValidationError::NoMembers);
    }

    if !team.people.iter().any(|p| p.is_admin) {
        return Err(ValidationError::NoAdministrators);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::Person;
    use keyroster_signing::Fingerprint;
    use uuid::Uuid;

    fn fpr(hex: &str) -> Fingerprint {
        Fingerprint::parse(hex).unwrap()
    }

    fn team(people: Vec<Person>) -> Team {
        Team {
            name: "Kiffix".to_string(),
            uuid: Uuid::new_v4(),
            people,
            ..Team::default()
        }
    }

    #[test]
    fn test_valid_team() {
        let team = team(vec![Person::new(
            "test@example.com",
            fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
            true,
        )]);
        assert_eq!(validate(&team), Ok(()));
    }

    #[test]
    fn test_missing_uuid() {
        let mut team = team(vec![Person::new(
            "test@example.com",
            fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
            false,
        )]);
        team.uuid = Uuid::nil();

        let err = validate(&team).unwrap_err();
        assert_eq!(err.to_string(), "invalid roster: invalid UUID");
    }

    #[test]
    fn test_duplicate_email() {
        let team = team(vec![
            Person::new(
                "test@example.com",
                fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
                false,
            ),
            Person::new(
                "test@example.com",
                fpr("CCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDD"),
                false,
            ),
        ]);

        let err = validate(&team).unwrap_err();
        assert_eq!(err.to_string(), "email listed more than once: test@example.com");
    }

    #[test]
    fn test_duplicate_fingerprint() {
        let team = team(vec![
            Person::new(
                "test@example.com",
                fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
                false,
            ),
            Person::new(
                "another@example.com",
                fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
                false,
            ),
        ]);

        let err = validate(&team).unwrap_err();
        assert_eq!(
            err.to_string(),
            "fingerprint listed more than once: AAAA BBBB AAAA BBBB AAAA  AAAA BBBB AAAA BBBB AAAA"
        );
    }

    #[test]
    fn test_no_members() {
        assert_eq!(validate(&team(vec![])), Err(ValidationError::NoMembers));
    }

    #[test]
    fn test_no_admins() {
        let team = team(vec![
            Person::new(
                "test@example.com",
                fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
                false,
            ),
            Person::new(
                "another@example.com",
                fpr("CCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDD"),
                false,
            ),
        ]);

        let err = validate(&team).unwrap_err();
        assert_eq!(err.to_string(), "team has no administrators");
    }
}
