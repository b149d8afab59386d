//! Keys held by a local GnuPG installation

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::{Result, SigningError};
use crate::fingerprint::Fingerprint;
use crate::key::{SigningKey, VerificationKey};

/// Handle on the `gpg` binary
#[derive(Debug, Clone)]
pub struct Gpg {
    /// Path to gpg binary
    gpg_path: String,
}

/// A secret key listed by `gpg --list-secret-keys`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgSecretKey {
    pub fingerprint: Fingerprint,
    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Gpg {
    pub fn new() -> Self {
        Self {
            gpg_path: "gpg".to_string(),
        }
    }

    /// Use a gpg binary other than the one on `PATH`
    pub fn with_path(gpg_path: impl Into<String>) -> Self {
        Self {
            gpg_path: gpg_path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.gpg_path
    }

    /// Whether `gpg --version` runs
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run gpg, failing on a non-zero exit
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(SigningError::ToolFailed {
                tool: "gpg".to_string(),
                reason: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(stdout)
    }

    fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!("Running gpg with args: {:?}", args);

        Ok(Command::new(&self.gpg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?)
    }

    /// Secret keys in the user's GnuPG keyring
    #[instrument(skip(self))]
    pub fn list_secret_keys(&self) -> Result<Vec<GpgSecretKey>> {
        let output = self.run(&["--batch", "--with-colons", "--list-secret-keys"])?;
        let keys = parse_colon_listing(&output);
        info!(count = keys.len(), "Found GnuPG secret keys");
        Ok(keys)
    }

    /// Wrap the key with this fingerprint
    pub fn key(&self, fingerprint: Fingerprint) -> GpgKey {
        GpgKey {
            gpg: self.clone(),
            fingerprint,
            passphrase: None,
        }
    }
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new()
    }
}

/// A GnuPG key used through the `gpg` binary
#[derive(Clone)]
pub struct GpgKey {
    gpg: Gpg,
    fingerprint: Fingerprint,
    passphrase: Option<String>,
}

impl fmt::Debug for GpgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpgKey")
            .field("gpg", &self.gpg)
            .field("fingerprint", &self.fingerprint)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GpgKey {
    /// Unlock with a passphrase instead of gpg-agent's pinentry
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Arguments for a detached, armored signature over `data_path`
    fn sign_args(&self, data_path: &str) -> Vec<String> {
        let fingerprint = self.fingerprint.hex();
        let mut args: Vec<String> = [
            "--batch",
            "--yes",
            "--local-user",
            fingerprint.as_str(),
            "--armor",
            "--detach-sign",
        ]
        .iter()
        .map(|a| a.to_string())
        .collect();

        if let Some(passphrase) = &self.passphrase {
            args.extend(
                ["--pinentry-mode", "loopback", "--passphrase", passphrase.as_str()]
                    .iter()
                    .map(|a| a.to_string()),
            );
        }
        args.extend(["--output", "-", data_path].iter().map(|a| a.to_string()));
        args
    }
}

impl VerificationKey for GpgKey {
    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    #[instrument(skip(self, data, armored_signature), fields(fingerprint = %self.fingerprint))]
    fn verify_detached(&self, data: &[u8], armored_signature: &str) -> Result<()> {
        if armored_signature.trim().is_empty() {
            return Err(SigningError::EmptySignature);
        }

        let data_file = temp_file_with(data)?;
        let sig_file = temp_file_with(armored_signature.as_bytes())?;
        let sig_path = sig_file.path().to_string_lossy().to_string();
        let data_path = data_file.path().to_string_lossy().to_string();

        // gpg exits non-zero for bad signatures; the status lines say why
        let output = self.gpg.output(&[
            "--batch",
            "--status-fd",
            "1",
            "--verify",
            &sig_path,
            &data_path,
        ])?;
        let status = String::from_utf8_lossy(&output.stdout);
        check_verify_status(&status, &self.fingerprint)
    }
}

impl SigningKey for GpgKey {
    #[instrument(skip(self, data), fields(fingerprint = %self.fingerprint))]
    fn sign_detached(&self, data: &[u8]) -> Result<String> {
        let data_file = temp_file_with(data)?;
        let data_path = data_file.path().to_string_lossy().to_string();
        let args = self.sign_args(&data_path);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let signature = self.gpg.run(&args)?;
        if signature.trim().is_empty() {
            return Err(SigningError::ToolFailed {
                tool: "gpg".to_string(),
                reason: "no signature produced".to_string(),
            });
        }
        Ok(signature)
    }
}

fn temp_file_with(contents: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(file)
}

/// Interpret `gpg --status-fd` output for a detached verification.
///
/// Only a `VALIDSIG` naming `fingerprint` (as signing key or primary key)
/// counts as success.
fn check_verify_status(status: &str, fingerprint: &Fingerprint) -> Result<()> {
    let mut bad = false;
    let mut no_data = false;

    for line in status.lines() {
        let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
            continue;
        };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        match fields.first().copied() {
            Some("VALIDSIG") => {
                // VALIDSIG <fpr> <date> <ts> <expire> <ver> <rsvd> <pk> <hash> <class> <primary fpr>
                let ours = [fields.get(1), fields.get(10)]
                    .into_iter()
                    .flatten()
                    .filter_map(|f| Fingerprint::parse(f).ok())
                    .any(|f| f == *fingerprint);
                return if ours {
                    Ok(())
                } else {
                    Err(SigningError::UnknownIssuer)
                };
            }
            Some("BADSIG") => {
                let key_id = fields.get(1).copied().unwrap_or_default();
                if key_id.eq_ignore_ascii_case(&hex::encode_upper(fingerprint.key_id())) {
                    bad = true;
                } else {
                    return Err(SigningError::UnknownIssuer);
                }
            }
            Some("NODATA") => no_data = true,
            _ => {}
        }
    }

    if bad {
        Err(SigningError::InvalidSignature("BAD signature".to_string()))
    } else if no_data {
        Err(SigningError::InvalidArmor("no signature data found".to_string()))
    } else {
        // ERRSIG / NO_PUBKEY: gpg doesn't hold the signer's key
        Err(SigningError::UnknownIssuer)
    }
}

/// Parse `gpg --with-colons --list-secret-keys` output
fn parse_colon_listing(output: &str) -> Vec<GpgSecretKey> {
    let mut keys: Vec<GpgSecretKey> = Vec::new();
    let mut pending_created: Option<DateTime<Utc>> = None;
    let mut in_primary = false;
    let mut has_fingerprint = false;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("sec") => {
                in_primary = true;
                has_fingerprint = false;
                pending_created = fields
                    .get(5)
                    .and_then(|ts| ts.parse::<i64>().ok())
                    .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
            }
            Some("ssb") => in_primary = false,
            Some("fpr") if in_primary && !has_fingerprint => {
                if let Some(fingerprint) =
                    fields.get(9).and_then(|f| Fingerprint::parse(f).ok())
                {
                    keys.push(GpgSecretKey {
                        fingerprint,
                        user_id: None,
                        created_at: pending_created,
                    });
                    has_fingerprint = true;
                }
            }
            Some("uid") if has_fingerprint => {
                if let Some(last) = keys.last_mut() {
                    if last.user_id.is_none() {
                        last.user_id = fields
                            .get(9)
                            .filter(|uid| !uid.is_empty())
                            .map(|uid| unescape_colon_field(uid));
                    }
                }
            }
            _ => {}
        }
    }

    keys
}

/// Undo gpg's `\xNN` escaping in colon listings
fn unescape_colon_field(field: &str) -> String {
    let mut out = Vec::with_capacity(field.len());
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let Some(b) = field
                .get(i + 2..i + 4)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}
