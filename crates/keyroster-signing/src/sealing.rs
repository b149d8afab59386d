//! Age encryption of secret key material at rest
//!
//! Secret seeds in the [`Keyring`](crate::Keyring) are encrypted to an age
//! x25519 identity. The identity itself lives outside the keyring, in an
//! identity file or the environment.

use age::secrecy::ExposeSecret;
use chrono::Utc;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub use age::x25519::{Identity, Recipient};

use crate::error::{Result, SigningError};

/// A fresh identity
pub fn generate_identity() -> Identity {
    Identity::generate()
}

/// Parse an identity from `AGE-SECRET-KEY-1…` text. Blank lines and `#`
/// comments are skipped, as in files written by `age-keygen`.
pub fn parse_identity(text: &str) -> Result<Identity> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or_else(|| SigningError::InvalidIdentity("no identity found".to_string()))?;

    line.parse::<Identity>()
        .map_err(|e| SigningError::InvalidIdentity(e.to_string()))
}

/// Text of an identity file for `identity`
pub fn identity_file_contents(identity: &Identity) -> String {
    format!(
        "# created: {}\n# public key: {}\n{}\n",
        Utc::now().to_rfc3339(),
        identity.to_public(),
        identity.to_string().expose_secret()
    )
}

pub fn read_identity_file(path: &Path) -> Result<Identity> {
    let text = std::fs::read_to_string(path)?;
    parse_identity(&text)
}

/// Read the identity file at `path`, writing a new one (mode 0600) if
/// there isn't one yet
pub fn load_or_create_identity_file(path: &Path) -> Result<Identity> {
    if path.is_file() {
        return read_identity_file(path);
    }

    let identity = generate_identity();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    crate::keyring::write_private(path, &identity_file_contents(&identity))?;
    info!(path = %path.display(), "Created identity file");
    Ok(identity)
}

/// Encrypt `data` to `recipient` as ASCII-armored age
pub(crate) fn seal(data: &[u8], recipient: &Recipient) -> Result<String> {
    let recipients: Vec<Box<dyn age::Recipient + Send>> = vec![Box::new(recipient.clone())];
    let encryptor = age::Encryptor::with_recipients(recipients)
        .ok_or_else(|| SigningError::Sealing("no recipients".to_string()))?;

    let mut output = Vec::new();
    let armor_writer =
        age::armor::ArmoredWriter::wrap_output(&mut output, age::armor::Format::AsciiArmor)
            .map_err(|e| SigningError::Sealing(e.to_string()))?;
    let mut writer = encryptor
        .wrap_output(armor_writer)
        .map_err(|e| SigningError::Sealing(e.to_string()))?;

    writer.write_all(data)?;
    writer
        .finish()
        .and_then(|armor| armor.finish())
        .map_err(|e| SigningError::Sealing(e.to_string()))?;

    String::from_utf8(output).map_err(|e| SigningError::Sealing(e.to_string()))
}

/// Decrypt armored age text produced by [`seal`]
pub(crate) fn unseal(armored: &str, identity: &Identity) -> Result<Vec<u8>> {
    let armor_reader = age::armor::ArmoredReader::new(armored.as_bytes());
    let decryptor = match age::Decryptor::new(armor_reader) {
        Ok(age::Decryptor::Recipients(d)) => d,
        Ok(_) => {
            return Err(SigningError::Unsealing(
                "passphrase-encrypted keys aren't supported".to_string(),
            ))
        }
        Err(e) => return Err(SigningError::Unsealing(e.to_string())),
    };

    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|e| SigningError::Unsealing(e.to_string()))?;

    let mut output = Vec::new();
    reader.read_to_end(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seal_and_unseal() {
        let identity = generate_identity();
        let sealed = seal(b"seed bytes", &identity.to_public()).unwrap();

        assert!(sealed.starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));
        assert!(!sealed.contains("seed bytes"));
        assert_eq!(unseal(&sealed, &identity).unwrap(), b"seed bytes");
    }

    #[test]
    fn test_unseal_with_wrong_identity() {
        let sealed = seal(b"seed bytes", &generate_identity().to_public()).unwrap();

        let err = unseal(&sealed, &generate_identity()).unwrap_err();
        assert!(matches!(err, SigningError::Unsealing(_)));
    }

    #[test]
    fn test_identity_file_round_trip() {
        let identity = generate_identity();
        let text = identity_file_contents(&identity);
        assert!(text.starts_with("# created: "));

        let parsed = parse_identity(&text).unwrap();
        assert_eq!(parsed.to_public().to_string(), identity.to_public().to_string());
    }

    #[test]
    fn test_parse_identity_rejects_garbage() {
        assert!(matches!(
            parse_identity("# only a comment\n\n"),
            Err(SigningError::InvalidIdentity(_))
        ));
        assert!(matches!(
            parse_identity("AGE-SECRET-KEY-NOPE"),
            Err(SigningError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_load_or_create_identity_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("identity.txt");

        let created = load_or_create_identity_file(&path).unwrap();
        assert!(path.is_file());
        let loaded = load_or_create_identity_file(&path).unwrap();

        assert_eq!(
            created.to_public().to_string(),
            loaded.to_public().to_string()
        );
    }
}
