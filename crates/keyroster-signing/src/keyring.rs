//! On-disk store of Ed25519 keys
//!
//! Each key lives in its own TOML file named after its fingerprint:
//! `<FINGERPRINT>.toml` holds a secret key (written with mode 0600) and
//! `<FINGERPRINT>.pub.toml` holds a public key imported from someone else.
//! Secret seeds are stored age-encrypted to the keyring's [`Identity`];
//! public halves are stored in the clear.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::ed25519::{Ed25519PublicKey, Ed25519SecretKey};
use crate::error::{Result, SigningError};
use crate::fingerprint::Fingerprint;
use crate::key::VerificationKey;
use crate::sealing::{seal, unseal, Identity};

const SECRET_SUFFIX: &str = ".toml";
const PUBLIC_SUFFIX: &str = ".pub.toml";

#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    fingerprint: Fingerprint,
    created_at: u32,
    public_key: String,
    /// Armored age ciphertext of the 32-byte seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
}

/// Directory of Ed25519 keys
#[derive(Clone)]
pub struct Keyring {
    path: PathBuf,
    identity: Option<Arc<Identity>>,
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("path", &self.path)
            .field("has_identity", &self.identity.is_some())
            .finish()
    }
}

impl Keyring {
    /// Use `path` as the keyring directory, creating it if needed.
    ///
    /// Without an identity only public keys can be read and written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            identity: None,
        })
    }

    /// Lock and unlock secret keys with `identity`
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(Arc::new(identity));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn identity(&self) -> Result<&Identity> {
        self.identity.as_deref().ok_or(SigningError::NoIdentity)
    }

    /// Generate a key and store it
    #[instrument(skip(self), fields(keyring = %self.path.display()))]
    pub fn generate(&self) -> Result<Ed25519SecretKey> {
        let key = Ed25519SecretKey::generate();
        self.insert(&key)?;
        info!(fingerprint = %key.fingerprint(), "Generated signing key");
        Ok(key)
    }

    /// Store a secret key, replacing any previous copy
    pub fn insert(&self, key: &Ed25519SecretKey) -> Result<()> {
        let recipient = self.identity()?.to_public();
        let public = key.public_key();
        let file = KeyFile {
            fingerprint: key.fingerprint(),
            created_at: public.created_at(),
            public_key: STANDARD.encode(public.to_bytes()),
            secret_key: Some(seal(&key.seed(), &recipient)?),
        };
        let path = self.secret_path(&key.fingerprint());
        write_private(&path, &toml::to_string(&file)?)?;
        debug!(path = %path.display(), "Wrote secret key");
        Ok(())
    }

    /// Store somebody else's public key
    pub fn insert_public(&self, key: &Ed25519PublicKey) -> Result<()> {
        let path = self.public_path(&key.fingerprint());
        std::fs::write(&path, export_public(key)?)?;
        debug!(path = %path.display(), "Wrote public key");
        Ok(())
    }

    /// Import a public key from text produced by [`export_public`]
    pub fn import_public(&self, text: &str) -> Result<Ed25519PublicKey> {
        let file: KeyFile = toml::from_str(text)?;
        let key = public_from_file(&file, Path::new("<import>"))?;
        self.insert_public(&key)?;
        info!(fingerprint = %key.fingerprint(), "Imported public key");
        Ok(key)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.secret_path(fingerprint).is_file()
    }

    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub fn load_secret(&self, fingerprint: &Fingerprint) -> Result<Ed25519SecretKey> {
        let path = self.secret_path(fingerprint);
        if !path.is_file() {
            return Err(SigningError::KeyNotFound(fingerprint.to_string()));
        }

        let identity = self.identity()?;
        let file = read_key_file(&path)?;
        let sealed = file.secret_key.as_deref().ok_or_else(|| invalid(&path, "no secret key"))?;
        let seed: [u8; 32] = unseal(sealed, identity)?
            .try_into()
            .map_err(|_| invalid(&path, "bad secret key"))?;

        let key = Ed25519SecretKey::from_seed(&seed, file.created_at);
        if key.fingerprint() != file.fingerprint || key.fingerprint() != *fingerprint {
            return Err(invalid(&path, "fingerprint doesn't match key material"));
        }
        Ok(key)
    }

    /// Public key for `fingerprint`, from a secret key or an imported one.
    /// Needs no identity.
    pub fn load_public(&self, fingerprint: &Fingerprint) -> Result<Ed25519PublicKey> {
        let path = if self.contains(fingerprint) {
            self.secret_path(fingerprint)
        } else {
            self.public_path(fingerprint)
        };
        if !path.is_file() {
            return Err(SigningError::KeyNotFound(fingerprint.to_string()));
        }
        let key = public_from_file(&read_key_file(&path)?, &path)?;
        if key.fingerprint() != *fingerprint {
            return Err(invalid(&path, "fingerprint doesn't match key material"));
        }
        Ok(key)
    }

    /// Fingerprints of the secret keys, sorted
    pub fn list(&self) -> Result<Vec<Fingerprint>> {
        self.scan(|name| {
            if name.ends_with(PUBLIC_SUFFIX) {
                None
            } else {
                name.strip_suffix(SECRET_SUFFIX)
            }
        })
    }

    /// Fingerprints of every key with a public half available, sorted
    pub fn list_public(&self) -> Result<Vec<Fingerprint>> {
        let mut all = self.list()?;
        all.extend(self.scan(|name| name.strip_suffix(PUBLIC_SUFFIX))?);
        all.sort();
        all.dedup();
        Ok(all)
    }

    fn scan(&self, stem_of: impl Fn(&str) -> Option<&str>) -> Result<Vec<Fingerprint>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = stem_of(&name) else {
                continue;
            };
            match Fingerprint::parse(stem) {
                Ok(fingerprint) => found.push(fingerprint),
                Err(_) => warn!(file = %name, "Skipping unrecognised file in keyring"),
            }
        }
        found.sort();
        Ok(found)
    }

    fn secret_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.path.join(format!("{}{}", fingerprint.hex(), SECRET_SUFFIX))
    }

    fn public_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.path.join(format!("{}{}", fingerprint.hex(), PUBLIC_SUFFIX))
    }
}

/// Shareable text form of a public key
pub fn export_public(key: &Ed25519PublicKey) -> Result<String> {
    let file = KeyFile {
        fingerprint: key.fingerprint(),
        created_at: key.created_at(),
        public_key: STANDARD.encode(key.to_bytes()),
        secret_key: None,
    };
    Ok(toml::to_string(&file)?)
}

fn public_from_file(file: &KeyFile, path: &Path) -> Result<Ed25519PublicKey> {
    let bytes = decode_32(&file.public_key).ok_or_else(|| invalid(path, "bad public key"))?;
    let key = Ed25519PublicKey::from_bytes(&bytes, file.created_at)?;
    if key.fingerprint() != file.fingerprint {
        return Err(invalid(path, "fingerprint doesn't match key material"));
    }
    Ok(key)
}

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| invalid(path, &e.to_string()))
}

fn decode_32(encoded: &str) -> Option<[u8; 32]> {
    STANDARD.decode(encoded.trim()).ok()?.try_into().ok()
}

fn invalid(path: &Path, reason: &str) -> SigningError {
    SigningError::InvalidKeyFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

pub(crate) fn write_private(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
