//! Data directory, configuration and key backend shared by commands

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use keyroster_core::config::load_config_or_default;
use keyroster_core::{Config, ConfigError, DataDir, SigningBackend};
use keyroster_db::Database;
use keyroster_signing::sealing::{load_or_create_identity_file, parse_identity};
use keyroster_signing::{
    Fingerprint, Gpg, GpgKey, Identity, Keyring, SigningError, SigningKey, VerificationKey,
};
use keyroster_team::{load_teams, Team};
use tracing::{debug, warn};

/// Age identity text that overrides the identity file
pub const IDENTITY_ENV: &str = "KEYROSTER_IDENTITY";

/// Passphrase handed to gpg instead of asking through pinentry
pub const GPG_PASSPHRASE_ENV: &str = "KEYROSTER_GPG_PASSPHRASE";

/// Everything a command needs to find keys and teams
#[derive(Debug)]
pub struct Context {
    pub data_dir: DataDir,
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Resolve the data directory and read its configuration, if any
    pub fn load(home: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = DataDir::resolve(home)?;
        let (config, config_path) = load_config_or_default(data_dir.root())?;
        Ok(Self {
            data_dir,
            config,
            config_path,
        })
    }

    pub fn backend(&self) -> Result<SigningBackend, ConfigError> {
        self.config
            .signing
            .backend()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "signing.backend".to_string(),
                message: format!("unknown backend '{}'", self.config.signing.backend),
            })
    }

    /// The keyring, unlocked with [`identity`](Self::identity)
    pub fn keyring(&self) -> anyhow::Result<Keyring> {
        let path = self.data_dir.keys_dir();
        let keyring = Keyring::open(&path)
            .with_context(|| format!("opening keyring {}", path.display()))?;
        Ok(keyring.with_identity(self.identity()?))
    }

    pub fn identity_path(&self) -> PathBuf {
        match &self.config.signing.identity_file {
            Some(path) => PathBuf::from(path),
            None => self.data_dir.identity_file(),
        }
    }

    /// `KEYROSTER_IDENTITY` if set, else the identity file, which is
    /// created on first use
    pub fn identity(&self) -> anyhow::Result<Identity> {
        if let Some(text) = non_empty_env(IDENTITY_ENV) {
            debug!("using identity from {}", IDENTITY_ENV);
            return parse_identity(&text).with_context(|| format!("reading {}", IDENTITY_ENV));
        }

        let path = self.identity_path();
        load_or_create_identity_file(&path)
            .with_context(|| format!("reading identity file {}", path.display()))
    }

    pub fn gpg(&self) -> Gpg {
        Gpg::with_path(self.config.signing.gpg_path.clone())
    }

    fn gpg_key(&self, fingerprint: Fingerprint, passphrase: Option<String>) -> GpgKey {
        let key = self.gpg().key(fingerprint);
        match passphrase {
            Some(passphrase) => key.with_passphrase(passphrase),
            None => key,
        }
    }

    pub fn database(&self) -> Database {
        Database::new(self.data_dir.root())
    }

    pub fn teams(&self) -> anyhow::Result<Vec<Team>> {
        Ok(load_teams(&self.data_dir.teams_dir())?)
    }

    /// The key to sign with: `requested`, else the configured default, else
    /// the backend's only secret key
    pub fn signing_key(&self, requested: Option<&str>) -> anyhow::Result<Box<dyn SigningKey>> {
        let backend = self.backend()?;
        let fingerprint = match requested.or(self.config.signing.default_key.as_deref()) {
            Some(value) => Fingerprint::parse(value)?,
            None => self.only_secret_key(backend)?,
        };
        debug!(%fingerprint, %backend, "using signing key");

        let key: Box<dyn SigningKey> = match backend {
            SigningBackend::Ed25519 => Box::new(self.keyring()?.load_secret(&fingerprint)?),
            SigningBackend::Gpg => Box::new(
                self.gpg_key(fingerprint, non_empty_env(GPG_PASSPHRASE_ENV)),
            ),
        };
        Ok(key)
    }

    fn only_secret_key(&self, backend: SigningBackend) -> anyhow::Result<Fingerprint> {
        let available = match backend {
            SigningBackend::Ed25519 => self.keyring()?.list()?,
            SigningBackend::Gpg => self
                .gpg()
                .list_secret_keys()?
                .into_iter()
                .map(|k| k.fingerprint)
                .collect(),
        };

        match available.as_slice() {
            [only] => Ok(*only),
            [] => bail!("no {} secret keys available; create one first", backend),
            _ => bail!(
                "{} secret keys available; choose one with --key or signing.default_key",
                available.len()
            ),
        }
    }

    /// Keys for the team's admins that the backend can verify with.
    /// Admins whose keys aren't available are left out.
    pub fn admin_keys(&self, team: &Team) -> anyhow::Result<Vec<Box<dyn VerificationKey>>> {
        let mut keys: Vec<Box<dyn VerificationKey>> = Vec::new();
        match self.backend()? {
            SigningBackend::Ed25519 => {
                let keyring = self.keyring()?;
                for admin in team.admins() {
                    match keyring.load_public(&admin.fingerprint) {
                        Ok(key) => keys.push(Box::new(key)),
                        Err(SigningError::KeyNotFound(_)) => {
                            debug!(email = %admin.email, "no key for admin in keyring");
                        }
                        Err(e) => {
                            warn!(email = %admin.email, error = %e, "couldn't load admin key");
                        }
                    }
                }
            }
            SigningBackend::Gpg => {
                let gpg = self.gpg();
                for admin in team.admins() {
                    keys.push(Box::new(gpg.key(admin.fingerprint)));
                }
            }
        }
        Ok(keys)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyroster_signing::Ed25519SecretKey;
    use keyroster_team::Person;
    use tempfile::TempDir;

    fn context(home: &Path) -> Context {
        Context::load(Some(home)).unwrap()
    }

    #[test]
    fn test_load_without_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());

        assert_eq!(ctx.config, Config::default());
        assert!(ctx.config_path.is_none());
        assert_eq!(ctx.data_dir.root(), temp.path());
        assert_eq!(ctx.backend().unwrap(), SigningBackend::Ed25519);
    }

    #[test]
    fn test_load_reads_config_from_home() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("keyroster.toml"),
            "[signing]\nbackend = \"gpg\"\ngpg_path = \"/opt/gpg\"\n",
        )
        .unwrap();

        let ctx = context(temp.path());
        assert_eq!(ctx.backend().unwrap(), SigningBackend::Gpg);
        assert_eq!(ctx.gpg().path(), "/opt/gpg");
        assert_eq!(ctx.config_path, Some(temp.path().join("keyroster.toml")));
    }

    #[test]
    fn test_signing_key_uses_only_key() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());

        assert!(ctx.signing_key(None).is_err());

        let generated = ctx.keyring().unwrap().generate().unwrap();
        let key = ctx.signing_key(None).unwrap();
        assert_eq!(key.fingerprint(), generated.fingerprint());

        ctx.keyring().unwrap().generate().unwrap();
        assert!(ctx.signing_key(None).is_err());

        let chosen = ctx
            .signing_key(Some(&generated.fingerprint().hex()))
            .unwrap();
        assert_eq!(chosen.fingerprint(), generated.fingerprint());
    }

    #[test]
    fn test_keyring_is_locked_by_identity_file() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let key = ctx.keyring().unwrap().generate().unwrap();

        let identity_path = temp.path().join("identity.txt");
        assert_eq!(ctx.identity_path(), identity_path);
        assert!(identity_path.is_file());

        // Same identity on the next run, so the key still opens
        let loaded = context(temp.path())
            .keyring()
            .unwrap()
            .load_secret(&key.fingerprint())
            .unwrap();
        assert_eq!(loaded.fingerprint(), key.fingerprint());

        // A replaced identity can't open it
        std::fs::remove_file(&identity_path).unwrap();
        let err = ctx
            .keyring()
            .unwrap()
            .load_secret(&key.fingerprint())
            .unwrap_err();
        assert!(matches!(err, SigningError::Unsealing(_)));
    }

    #[test]
    fn test_identity_file_from_config() {
        let temp = TempDir::new().unwrap();
        let elsewhere = temp.path().join("usb").join("keyroster-identity.txt");
        std::fs::write(
            temp.path().join("keyroster.toml"),
            format!("[signing]\nidentity_file = {:?}\n", elsewhere.to_str().unwrap()),
        )
        .unwrap();

        let ctx = context(temp.path());
        ctx.keyring().unwrap().generate().unwrap();

        assert_eq!(ctx.identity_path(), elsewhere);
        assert!(elsewhere.is_file());
        assert!(!temp.path().join("identity.txt").exists());
    }

    #[test]
    fn test_gpg_key_takes_passphrase() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let fingerprint = Fingerprint::from_bytes([3; 20]);

        let plain = format!("{:?}", ctx.gpg_key(fingerprint, None));
        assert!(plain.contains("passphrase: None"));

        let unlocked = format!("{:?}", ctx.gpg_key(fingerprint, Some("hunter2".to_string())));
        assert!(unlocked.contains("<redacted>"));
        assert!(!unlocked.contains("hunter2"));
    }

    #[test]
    fn test_admin_keys_skip_missing() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        let admin = ctx.keyring().unwrap().generate().unwrap();
        let member = Ed25519SecretKey::from_seed(&[5; 32], 1_550_000_000);
        let absent_admin =
            Fingerprint::parse("AAAABBBBAAAABBBBAAAAAAAABBBBAAAABBBBAAAA").unwrap();

        let team = Team::new(
            "Kiffix",
            vec![
                Person::new("admin@example.com", admin.fingerprint(), true),
                Person::new("member@example.com", member.fingerprint(), false),
                Person::new("away@example.com", absent_admin, true),
            ],
        );

        let keys = ctx.admin_keys(&team).unwrap();
        let fingerprints: Vec<_> = keys.iter().map(|k| k.fingerprint()).collect();
        assert_eq!(fingerprints, vec![admin.fingerprint()]);
    }
}
