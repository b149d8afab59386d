//! Team directories on disk

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::codec;
use crate::error::{Result, TeamError};
use crate::slug::slugify;
use crate::team::Team;

/// Roster document file name
pub const ROSTER_FILENAME: &str = "roster.toml";

/// Detached signature file name
pub const SIGNATURE_FILENAME: &str = "roster.toml.asc";

/// Where `team` lives under `teams_dir`
pub fn directory(team: &Team, teams_dir: &Path) -> PathBuf {
    teams_dir.join(team.sub_directory())
}

/// Subdirectories of `teams_dir` holding both a roster and its signature,
/// sorted by name.
///
/// Directories with only one of the two files are skipped. A missing
/// `teams_dir` has no teams.
#[instrument(skip_all, fields(teams_dir = %teams_dir.display()))]
pub fn find_team_subdirectories(teams_dir: &Path) -> Result<Vec<PathBuf>> {
    if !teams_dir.exists() {
        debug!("Teams directory doesn't exist yet");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(teams_dir).map_err(|e| TeamError::io(teams_dir, e))?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TeamError::io(teams_dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let has_roster = path.join(ROSTER_FILENAME).is_file();
        let has_signature = path.join(SIGNATURE_FILENAME).is_file();
        if has_roster && has_signature {
            found.push(path);
        } else if has_roster || has_signature {
            warn!(dir = %path.display(), "Skipping team directory without both roster and signature");
        }
    }

    found.sort();
    Ok(found)
}

/// Load every team under `teams_dir`
#[instrument(skip_all, fields(teams_dir = %teams_dir.display()))]
pub fn load_teams(teams_dir: &Path) -> Result<Vec<Team>> {
    let mut teams = Vec::new();
    for dir in find_team_subdirectories(teams_dir)? {
        let roster_path = dir.join(ROSTER_FILENAME);
        let signature_path = dir.join(SIGNATURE_FILENAME);
        let roster =
            std::fs::read_to_string(&roster_path).map_err(|e| TeamError::io(&roster_path, e))?;
        let signature = std::fs::read_to_string(&signature_path)
            .map_err(|e| TeamError::io(&signature_path, e))?;

        teams.push(load(&roster, &signature)?);
    }

    debug!(count = teams.len(), "Loaded teams");
    Ok(teams)
}

/// Parse a roster and keep the exact roster and signature text alongside.
///
/// The signature isn't verified here.
pub fn load(roster: &str, signature: &str) -> Result<Team> {
    let mut team = codec::parse(roster)?;
    team.roster = roster.to_string();
    team.signature = signature.to_string();
    Ok(team)
}

/// Writes a roster and its signature into one directory
#[derive(Debug, Clone)]
pub struct RosterSaver {
    pub directory: PathBuf,
}

impl RosterSaver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Write both files, replacing previous contents. The roster goes first.
    #[instrument(skip(self, roster, signature), fields(dir = %self.directory.display()))]
    pub fn save(&self, roster: &str, signature: &str) -> Result<()> {
        std::fs::create_dir_all(&self.directory).map_err(|e| TeamError::io(&self.directory, e))?;

        let roster_path = self.directory.join(ROSTER_FILENAME);
        std::fs::write(&roster_path, roster).map_err(|e| TeamError::io(&roster_path, e))?;

        let signature_path = self.directory.join(SIGNATURE_FILENAME);
        std::fs::write(&signature_path, signature)
            .map_err(|e| TeamError::io(&signature_path, e))?;

        debug!("Saved roster and signature");
        Ok(())
    }
}

/// Save a team's signed roster into its directory under `teams_dir`
pub fn save_team(team: &Team, teams_dir: &Path) -> Result<PathBuf> {
    if !team.is_signed() {
        return Err(TeamError::Unsigned(team.name.clone()));
    }

    let dir = directory(team, teams_dir);
    let (roster, signature) = team.roster();
    RosterSaver::new(&dir).save(roster, signature)?;

    info!(team = %team.name, version = team.version, dir = %dir.display(), "Saved team");
    Ok(dir)
}

/// Find a team by UUID, or by name or slug ignoring case
pub fn find_team<'a>(teams: &'a [Team], query: &str) -> Result<&'a Team> {
    let query = query.trim();
    if let Ok(uuid) = Uuid::parse_str(query) {
        if let Some(team) = teams.iter().find(|t| t.uuid == uuid) {
            return Ok(team);
        }
    }

    let wanted = query.to_lowercase();
    let wanted_slug = slugify(query);
    let matches: Vec<&Team> = teams
        .iter()
        .filter(|t| {
            t.name.to_lowercase() == wanted
                || (!wanted_slug.is_empty() && slugify(&t.name) == wanted_slug)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(TeamError::TeamNotFound(query.to_string())),
        [team] => Ok(*team),
        _ => Err(TeamError::AmbiguousTeam(query.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::Person;
    use keyroster_signing::{verify_roster, Ed25519SecretKey, Fingerprint, VerificationKey};
    use tempfile::TempDir;

    fn fpr(hex: &str) -> Fingerprint {
        Fingerprint::parse(hex).unwrap()
    }

    fn people() -> Vec<Person> {
        vec![
            Person::new(
                "test2@example.com",
                fpr("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA"),
                false,
            ),
            Person::new(
                "test3@example.com",
                fpr("CCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDDCCCCDDDD"),
                true,
            ),
        ]
    }

    fn save_preview(team: &Team, teams_dir: &Path) {
        RosterSaver::new(directory(team, teams_dir))
            .save(&team.preview_roster().unwrap(), "fake signature")
            .unwrap();
    }

    #[test]
    fn test_load_teams() {
        let temp = TempDir::new().unwrap();
        let team1 = Team::new("Team 1", people());
        let team2 = Team::new("Team 2", people());
        save_preview(&team1, temp.path());
        save_preview(&team2, temp.path());

        let loaded = load_teams(temp.path()).unwrap();

        assert_eq!(loaded.len(), 2);
        for original in [&team1, &team2] {
            let got = loaded.iter().find(|t| t.uuid == original.uuid).unwrap();
            assert_eq!(got.name, original.name);
            assert_eq!(got.people, original.people);
            assert_eq!(got.version, original.version + 1);
            assert_eq!(
                got.roster(),
                (original.preview_roster().unwrap().as_str(), "fake signature")
            );
        }
    }

    #[test]
    fn test_load_keeps_exact_text() {
        let roster = "# hand edited\nuuid = \"38be2a70-23d8-11e9-bafd-7f97f2e239a3\"\nname = \"Fluidkeys CIC\"\n\n\
                      [[person]]\nemail = \"paul@fluidkeys.com\"\n\
                      fingerprint = \"B79F 0840 DEF1 2EBB A72F  F72D 7327 A44C 2157 A758\"\nis_admin = true\n";

        let team = load(roster, "sig").unwrap();
        assert_eq!(team.roster(), (roster, "sig"));
        assert_eq!(team.name, "Fluidkeys CIC");
        assert_eq!(team.people.len(), 1);
    }

    #[test]
    fn test_find_team_subdirectories() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        let good = dir.join("good");
        let empty = dir.join("empty");
        let missing_roster = dir.join("missing-roster");
        let missing_signature = dir.join("missing-signature");
        for d in [&good, &empty, &missing_roster, &missing_signature] {
            std::fs::create_dir(d).unwrap();
        }
        std::fs::write(good.join(ROSTER_FILENAME), "").unwrap();
        std::fs::write(good.join(SIGNATURE_FILENAME), "").unwrap();
        std::fs::write(missing_roster.join(SIGNATURE_FILENAME), "").unwrap();
        std::fs::write(missing_signature.join(ROSTER_FILENAME), "").unwrap();
        std::fs::write(dir.join("stray-file"), "").unwrap();

        assert_eq!(find_team_subdirectories(dir).unwrap(), vec![good]);
    }

    #[test]
    fn test_missing_teams_dir_has_no_teams() {
        let temp = TempDir::new().unwrap();
        let teams = load_teams(&temp.path().join("teams")).unwrap();
        assert!(teams.is_empty());
    }

    #[test]
    fn test_save_and_load_signed_team() {
        let temp = TempDir::new().unwrap();
        let key = Ed25519SecretKey::from_seed(&[8; 32], 1_550_000_000);
        let mut team = Team::new(
            "Kiffix",
            vec![Person::new("admin@example.com", key.fingerprint(), true)],
        );
        team.update_roster(&key).unwrap();

        let dir = save_team(&team, temp.path()).unwrap();
        assert_eq!(dir, temp.path().join(team.sub_directory()));

        let loaded = load_teams(temp.path()).unwrap();
        assert_eq!(loaded, vec![team.clone()]);

        let (roster, signature) = loaded[0].roster();
        verify_roster(roster, signature, &[&key]).unwrap();
    }

    #[test]
    fn test_save_overwrites_previous_pair() {
        let temp = TempDir::new().unwrap();
        let saver = RosterSaver::new(temp.path().join("team"));

        saver.save("old roster", "old signature").unwrap();
        saver.save("new roster", "new signature").unwrap();

        let roster = std::fs::read_to_string(saver.directory.join(ROSTER_FILENAME)).unwrap();
        let signature = std::fs::read_to_string(saver.directory.join(SIGNATURE_FILENAME)).unwrap();
        assert_eq!(roster, "new roster");
        assert_eq!(signature, "new signature");
    }

    #[test]
    fn test_save_team_refuses_unsigned() {
        let temp = TempDir::new().unwrap();
        let team = Team::new("Kiffix", people());

        let err = save_team(&team, temp.path()).unwrap_err();
        assert!(matches!(err, TeamError::Unsigned(_)));
        assert!(find_team_subdirectories(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_find_team() {
        let teams = vec![
            Team::new("Marks & Spencers", people()),
            Team::new("Kiffix", people()),
            Team::new("kiffix", people()),
        ];

        assert_eq!(
            find_team(&teams, "marks-and-spencers").unwrap().uuid,
            teams[0].uuid
        );
        assert_eq!(
            find_team(&teams, "MARKS & SPENCERS").unwrap().uuid,
            teams[0].uuid
        );
        assert_eq!(
            find_team(&teams, &teams[2].uuid.to_string()).unwrap().uuid,
            teams[2].uuid
        );
        assert!(matches!(
            find_team(&teams, "kiffix"),
            Err(TeamError::AmbiguousTeam(_))
        ));
        assert!(matches!(
            find_team(&teams, "nobody"),
            Err(TeamError::TeamNotFound(_))
        ));
    }
}
