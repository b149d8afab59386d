//! JSON-file event database

use chrono::{DateTime, Duration, Utc};
use keyroster_signing::Fingerprint;
use keyroster_team::RequestToJoinTeam;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::item::Item;

/// Database file name inside the data directory
pub const DATABASE_FILENAME: &str = "db.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Contents {
    #[serde(default)]
    keys_imported_into_gnupg: Vec<Fingerprint>,
    #[serde(default)]
    requests_to_join_teams: Vec<RequestToJoinTeam>,
    #[serde(default)]
    event_times: BTreeMap<String, DateTime<Utc>>,
}

/// The user's local database
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Database kept in `data_dir/db.json`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DATABASE_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that `verb` happened to `item` at `now`
    #[instrument(skip(self, item), fields(item = %item))]
    pub fn record_last(&self, verb: &str, item: &Item, now: DateTime<Utc>) -> Result<()> {
        if verb.is_empty() {
            return Err(DatabaseError::EmptyVerb);
        }

        let mut contents = self.load()?;
        contents.event_times.insert(event_key(verb, item), now);
        self.save(&contents)
    }

    /// When `verb` last happened to `item`, if ever
    pub fn get_last(&self, verb: &str, item: &Item) -> Result<Option<DateTime<Utc>>> {
        let contents = self.load()?;
        Ok(contents.event_times.get(&event_key(verb, item)).copied())
    }

    /// Whether `verb` last happened to `item` more than `age` before `now`.
    /// Never having happened counts as older.
    pub fn is_older_than(
        &self,
        verb: &str,
        item: &Item,
        age: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(match self.get_last(verb, item)? {
            None => true,
            Some(last) => now - last > age,
        })
    }

    pub fn record_fingerprint_imported_into_gnupg(&self, fingerprint: Fingerprint) -> Result<()> {
        let mut contents = self.load()?;
        contents.keys_imported_into_gnupg.push(fingerprint);
        dedup_in_order(&mut contents.keys_imported_into_gnupg);
        self.save(&contents)
    }

    pub fn get_fingerprints_imported_into_gnupg(&self) -> Result<Vec<Fingerprint>> {
        Ok(self.load()?.keys_imported_into_gnupg)
    }

    #[instrument(skip(self, team_name))]
    pub fn record_request_to_join_team(
        &self,
        team_uuid: Uuid,
        team_name: &str,
        fingerprint: Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut contents = self.load()?;
        contents
            .requests_to_join_teams
            .push(RequestToJoinTeam::new(team_uuid, team_name, fingerprint, now));
        contents.requests_to_join_teams = dedup_requests(contents.requests_to_join_teams);
        self.save(&contents)
    }

    /// One request per team and fingerprint (the newest), newest first
    pub fn get_requests_to_join_teams(&self) -> Result<Vec<RequestToJoinTeam>> {
        Ok(dedup_requests(self.load()?.requests_to_join_teams))
    }

    pub fn get_existing_request_to_join_team(
        &self,
        team_uuid: Uuid,
        fingerprint: &Fingerprint,
    ) -> Result<Option<RequestToJoinTeam>> {
        Ok(self
            .get_requests_to_join_teams()?
            .into_iter()
            .find(|r| r.team_uuid == team_uuid && r.fingerprint == *fingerprint))
    }

    /// Forget every request for this team and fingerprint
    pub fn delete_request_to_join_team(
        &self,
        team_uuid: Uuid,
        fingerprint: &Fingerprint,
    ) -> Result<()> {
        let mut contents = self.load()?;
        contents.requests_to_join_teams.retain(|r| {
            let matches = r.team_uuid == team_uuid && r.fingerprint == *fingerprint;
            if matches {
                info!(team = %r.team_name, "Deleting request to join team");
            }
            !matches
        });
        self.save(&contents)
    }

    fn load(&self) -> Result<Contents> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No database yet");
                return Ok(Contents::default());
            }
            Err(source) => {
                return Err(DatabaseError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut contents: Contents =
            serde_json::from_str(&text).map_err(|source| DatabaseError::Json {
                path: self.path.clone(),
                source,
            })?;
        dedup_in_order(&mut contents.keys_imported_into_gnupg);
        Ok(contents)
    }

    fn save(&self, contents: &Contents) -> Result<()> {
        let io_err = |source| DatabaseError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(contents).map_err(|source| DatabaseError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json + "\n").map_err(io_err)?;

        debug!(path = %self.path.display(), "Saved database");
        Ok(())
    }
}

fn event_key(verb: &str, item: &Item) -> String {
    format!("{verb}:{item}")
}

fn dedup_in_order(fingerprints: &mut Vec<Fingerprint>) {
    let mut seen = std::collections::HashSet::new();
    fingerprints.retain(|f| seen.insert(*f));
}

fn dedup_requests(requests: Vec<RequestToJoinTeam>) -> Vec<RequestToJoinTeam> {
    let mut newest: HashMap<(Uuid, Fingerprint), RequestToJoinTeam> = HashMap::new();
    for request in requests {
        let key = (request.team_uuid, request.fingerprint);
        match newest.get(&key) {
            Some(existing) if existing.requested_at >= request.requested_at => {}
            _ => {
                newest.insert(key, request);
            }
        }
    }

    let mut deduped: Vec<_> = newest.into_values().collect();
    deduped.sort_by(|a, b| {
        b.requested_at
            .cmp(&a.requested_at)
            .then_with(|| a.team_uuid.cmp(&b.team_uuid))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 2, 20, hour, 0, 0).unwrap()
    }

    fn fpr(hex: &str) -> Fingerprint {
        Fingerprint::parse(hex).unwrap()
    }

    const AB: &str = "AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA";
    const CD: &str = "CCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDD";

    #[test]
    fn test_record_and_get_last() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        let item = Item::Key(fpr(AB));

        assert_eq!(db.get_last("fetched", &item).unwrap(), None);

        db.record_last("fetched", &item, at(9)).unwrap();
        db.record_last("fetched", &item, at(10)).unwrap();

        assert_eq!(db.get_last("fetched", &item).unwrap(), Some(at(10)));
        assert_eq!(db.get_last("verified", &item).unwrap(), None);
        assert_eq!(db.get_last("fetched", &Item::Key(fpr(CD))).unwrap(), None);
    }

    #[test]
    fn test_event_keys_in_file() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        let team = Uuid::parse_str("6caa3730-2ca3-47b9-b671-5dc326100431").unwrap();

        db.record_last("verified", &Item::Team(team), at(9)).unwrap();

        let text = std::fs::read_to_string(db.path()).unwrap();
        assert!(text.contains("\"verified:team:6caa3730-2ca3-47b9-b671-5dc326100431\""));
    }

    #[test]
    fn test_empty_verb_rejected() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());

        let err = db.record_last("", &Item::Key(fpr(AB)), at(9)).unwrap_err();
        assert_eq!(err.to_string(), "verb can't be empty");
        assert!(!db.path().exists());
    }

    #[test]
    fn test_is_older_than() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        let item = Item::Key(fpr(AB));

        assert!(db
            .is_older_than("fetched", &item, Duration::hours(1), at(9))
            .unwrap());

        db.record_last("fetched", &item, at(9)).unwrap();
        assert!(!db
            .is_older_than("fetched", &item, Duration::hours(2), at(10))
            .unwrap());
        assert!(db
            .is_older_than("fetched", &item, Duration::minutes(30), at(10))
            .unwrap());
    }

    #[test]
    fn test_fingerprints_imported_into_gnupg() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());

        assert!(db.get_fingerprints_imported_into_gnupg().unwrap().is_empty());

        db.record_fingerprint_imported_into_gnupg(fpr(AB)).unwrap();
        db.record_fingerprint_imported_into_gnupg(fpr(CD)).unwrap();
        db.record_fingerprint_imported_into_gnupg(fpr(AB)).unwrap();

        assert_eq!(
            db.get_fingerprints_imported_into_gnupg().unwrap(),
            vec![fpr(AB), fpr(CD)]
        );
    }

    #[test]
    fn test_requests_to_join_teams() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        let kiffix = Uuid::new_v4();
        let other = Uuid::new_v4();

        db.record_request_to_join_team(kiffix, "Kiffix", fpr(AB), at(9)).unwrap();
        db.record_request_to_join_team(other, "Other", fpr(AB), at(10)).unwrap();
        db.record_request_to_join_team(kiffix, "Kiffix", fpr(AB), at(11)).unwrap();
        db.record_request_to_join_team(kiffix, "Kiffix", fpr(CD), at(8)).unwrap();

        let requests = db.get_requests_to_join_teams().unwrap();
        assert_eq!(
            requests,
            vec![
                RequestToJoinTeam::new(kiffix, "Kiffix", fpr(AB), at(11)),
                RequestToJoinTeam::new(other, "Other", fpr(AB), at(10)),
                RequestToJoinTeam::new(kiffix, "Kiffix", fpr(CD), at(8)),
            ]
        );

        let existing = db
            .get_existing_request_to_join_team(kiffix, &fpr(AB))
            .unwrap()
            .unwrap();
        assert_eq!(existing.requested_at, at(11));
        assert_eq!(
            db.get_existing_request_to_join_team(other, &fpr(CD)).unwrap(),
            None
        );
    }

    #[test]
    fn test_delete_request_to_join_team() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        let kiffix = Uuid::new_v4();

        db.record_request_to_join_team(kiffix, "Kiffix", fpr(AB), at(9)).unwrap();
        db.record_request_to_join_team(kiffix, "Kiffix", fpr(CD), at(10)).unwrap();

        db.delete_request_to_join_team(kiffix, &fpr(AB)).unwrap();

        let requests = db.get_requests_to_join_teams().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].fingerprint, fpr(CD));
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(temp.path());
        std::fs::write(db.path(), "{ not json").unwrap();

        let err = db.get_last("fetched", &Item::Key(fpr(AB))).unwrap_err();
        assert!(matches!(err, DatabaseError::Json { .. }));
        assert!(err.to_string().contains("db.json"));
    }
}
