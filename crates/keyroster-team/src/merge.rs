//! Adding or changing people in a team
//!
//! A candidate person is matched against the roster by fingerprint first,
//! then by email. The match decides which warning to show before the change
//! is applied.

use std::fmt;
use tracing::debug;

use crate::person::Person;
use crate::team::Team;

/// What an upsert would do to an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertWarning {
    /// Same email, different fingerprint
    KeyWouldBeUpdated,
    /// Same fingerprint, different email
    EmailWouldBeUpdated,
    /// Identical entry already present
    PersonWouldNotBeChanged,
    /// Same person, admin flag would be cleared
    PersonWouldBeDemotedAsAdmin,
    /// Same person, admin flag would be set
    PersonWouldBePromotedToAdmin,
}

impl fmt::Display for UpsertWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::KeyWouldBeUpdated => "the person's key would be updated",
            Self::EmailWouldBeUpdated => "the person's email would be updated",
            Self::PersonWouldNotBeChanged => "the person would not be changed",
            Self::PersonWouldBeDemotedAsAdmin => "the person would be demoted as admin",
            Self::PersonWouldBePromotedToAdmin => "the person would be promoted to admin",
        };
        f.write_str(message)
    }
}

impl Team {
    /// Classify what [`upsert_person`](Self::upsert_person) would do.
    ///
    /// `None` means the person is new to the team.
    pub fn get_upsert_person_warnings(&self, person: &Person) -> Option<UpsertWarning> {
        if let Some(existing) = self
            .people
            .iter()
            .find(|p| p.fingerprint == person.fingerprint)
        {
            let warning = if existing.email != person.email {
                UpsertWarning::EmailWouldBeUpdated
            } else if existing.is_admin && !person.is_admin {
                UpsertWarning::PersonWouldBeDemotedAsAdmin
            } else if !existing.is_admin && person.is_admin {
                UpsertWarning::PersonWouldBePromotedToAdmin
            } else {
                UpsertWarning::PersonWouldNotBeChanged
            };
            return Some(warning);
        }

        if self.people.iter().any(|p| p.email == person.email) {
            return Some(UpsertWarning::KeyWouldBeUpdated);
        }

        None
    }

    /// Insert `person`, replacing every entry sharing its email or its
    /// fingerprint.
    ///
    /// Applies whatever [`get_upsert_person_warnings`](Self::get_upsert_person_warnings)
    /// reports; gating on the warning is up to the caller. The person takes
    /// the position of the first replaced entry, or goes last when new.
    pub fn upsert_person(&mut self, person: Person) {
        let position = self
            .people
            .iter()
            .position(|p| p.email == person.email || p.fingerprint == person.fingerprint);

        let before = self.people.len();
        self.people
            .retain(|p| p.email != person.email && p.fingerprint != person.fingerprint);
        debug!(
            email = %person.email,
            replaced = before - self.people.len(),
            "Upserting person"
        );

        match position {
            Some(index) => self.people.insert(index.min(self.people.len()), person),
            None => self.people.push(person),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyroster_signing::Fingerprint;
    use uuid::Uuid;

    const AB: &str = "AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA";
    const CD: &str = "CCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDD";

    fn person(email: &str, fingerprint: &str, is_admin: bool) -> Person {
        Person::new(email, Fingerprint::parse(fingerprint).unwrap(), is_admin)
    }

    fn team(people: Vec<Person>) -> Team {
        Team {
            name: "Kiffix".to_string(),
            uuid: Uuid::parse_str("8e26e4df0d474f7f9a07a37b2aa92104").unwrap(),
            people,
            ..Team::default()
        }
    }

    struct Case {
        name: &'static str,
        candidate: Person,
        existing: Vec<Person>,
        warning: Option<UpsertWarning>,
        expected: Vec<Person>,
    }

    fn cases() -> Vec<Case> {
        vec![
            Case {
                name: "adding a new person",
                candidate: person("person@example.com", AB, false),
                existing: vec![],
                warning: None,
                expected: vec![person("person@example.com", AB, false)],
            },
            Case {
                name: "email already in roster",
                candidate: person("person@example.com", AB, false),
                existing: vec![person("person@example.com", CD, false)],
                warning: Some(UpsertWarning::KeyWouldBeUpdated),
                expected: vec![person("person@example.com", AB, false)],
            },
            Case {
                name: "fingerprint already in roster",
                candidate: person("person@example.com", AB, false),
                existing: vec![person("another@example.com", AB, false)],
                warning: Some(UpsertWarning::EmailWouldBeUpdated),
                expected: vec![person("person@example.com", AB, false)],
            },
            Case {
                name: "person already in roster",
                candidate: person("person@example.com", AB, false),
                existing: vec![person("person@example.com", AB, false)],
                warning: Some(UpsertWarning::PersonWouldNotBeChanged),
                expected: vec![person("person@example.com", AB, false)],
            },
            Case {
                name: "non admin already in roster as admin",
                candidate: person("person@example.com", AB, false),
                existing: vec![person("person@example.com", AB, true)],
                warning: Some(UpsertWarning::PersonWouldBeDemotedAsAdmin),
                expected: vec![person("person@example.com", AB, false)],
            },
            Case {
                name: "admin already in roster but not as admin",
                candidate: person("person@example.com", AB, true),
                existing: vec![person("person@example.com", AB, false)],
                warning: Some(UpsertWarning::PersonWouldBePromotedToAdmin),
                expected: vec![person("person@example.com", AB, true)],
            },
        ]
    }

    #[test]
    fn test_get_upsert_person_warnings() {
        for case in cases() {
            let team = team(case.existing.clone());
            assert_eq!(
                team.get_upsert_person_warnings(&case.candidate),
                case.warning,
                "{}",
                case.name
            );
            assert_eq!(team.people, case.existing, "{} mutated the team", case.name);
        }
    }

    #[test]
    fn test_upsert_person() {
        for case in cases() {
            let mut team = team(case.existing);
            team.upsert_person(case.candidate);
            assert_eq!(team.people, case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut team = team(vec![
            person("first@example.com", AB, true),
            person("second@example.com", CD, false),
            person("third@example.com", "EEEEFFFFEEEEFFFFEEEEFFFFEEEEFFFFEEEEFFFF", false),
        ]);

        team.upsert_person(person("second@example.com", CD, true));

        let emails: Vec<_> = team.people.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(
            emails,
            ["first@example.com", "second@example.com", "third@example.com"]
        );
        assert!(team.people[1].is_admin);
    }

    #[test]
    fn test_email_and_fingerprint_matching_different_people() {
        // Email matches one entry, fingerprint matches another
        let existing = vec![
            person("person@example.com", CD, false),
            person("another@example.com", AB, true),
            person("third@example.com", "EEEEFFFFEEEEFFFFEEEEFFFFEEEEFFFFEEEEFFFF", true),
        ];
        let candidate = person("person@example.com", AB, false);
        let mut team = team(existing);

        // Fingerprint match wins the classification
        assert_eq!(
            team.get_upsert_person_warnings(&candidate),
            Some(UpsertWarning::EmailWouldBeUpdated)
        );

        // Both matched entries go; the candidate takes the first slot
        team.upsert_person(candidate.clone());
        assert_eq!(team.people.len(), 2);
        assert_eq!(team.people[0], candidate);
        assert_eq!(team.people[1].email, "third@example.com");
    }

    #[test]
    fn test_warning_messages() {
        assert_eq!(
            UpsertWarning::PersonWouldBeDemotedAsAdmin.to_string(),
            "the person would be demoted as admin"
        );
        assert_eq!(
            UpsertWarning::KeyWouldBeUpdated.to_string(),
            "the person's key would be updated"
        );
    }
}
