//! Signing key commands

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{Args, Subcommand};
use keyroster_core::SigningBackend;
use keyroster_signing::{export_public, Fingerprint, VerificationKey};
use serde::Serialize;
use tracing::info;

use crate::cli::context::IDENTITY_ENV;
use crate::cli::{output, Cli, Context, OutputFormat};

/// Signing key commands
#[derive(Debug, Args)]
pub struct KeyCommand {
    #[command(subcommand)]
    pub command: KeySubcommand,
}

/// Signing key subcommands
#[derive(Debug, Subcommand)]
pub enum KeySubcommand {
    /// Generate an Ed25519 key in the local keyring
    Generate,

    /// List keys that can sign rosters
    List(KeyListCommand),

    /// Print a public key for other admins to import
    Export(KeyExportCommand),

    /// Import another admin's public key
    Import(KeyImportCommand),
}

/// List keys
#[derive(Debug, Args)]
pub struct KeyListCommand {
    /// Include imported public keys
    #[arg(short, long)]
    pub all: bool,
}

/// Export a public key
#[derive(Debug, Args)]
pub struct KeyExportCommand {
    /// Fingerprint of the key
    #[arg(required = true)]
    pub fingerprint: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Import a public key
#[derive(Debug, Args)]
pub struct KeyImportCommand {
    /// File holding an exported public key, or `-` for stdin
    #[arg(required = true)]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct KeyEntry {
    fingerprint: Fingerprint,
    uri: String,
    secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl KeyEntry {
    fn new(fingerprint: Fingerprint, secret: bool, user_id: Option<String>) -> Self {
        Self {
            fingerprint,
            uri: fingerprint.uri(),
            secret,
            user_id,
        }
    }
}

impl KeyCommand {
    pub fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            KeySubcommand::Generate => generate(cli, ctx),
            KeySubcommand::List(cmd) => cmd.execute(cli, ctx),
            KeySubcommand::Export(cmd) => cmd.execute(cli, ctx),
            KeySubcommand::Import(cmd) => cmd.execute(cli, ctx),
        }
    }
}

fn require_keyring_backend(ctx: &Context, action: &str) -> anyhow::Result<()> {
    let backend = ctx.backend()?;
    if backend != SigningBackend::Ed25519 {
        bail!(
            "can't {} with the {} backend; use gpg directly",
            action,
            backend
        );
    }
    Ok(())
}

fn generate(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    require_keyring_backend(ctx, "generate keys")?;

    let key = ctx.keyring()?.generate()?;
    let fingerprint = key.fingerprint();
    info!(%fingerprint, "generated key");

    match cli.format {
        OutputFormat::Json => output::json(&KeyEntry::new(fingerprint, true, None))?,
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(&format!(
                    "Generated key {}",
                    output::fingerprint_style().apply_to(fingerprint)
                ));
                output::info(&format!(
                    "Sign rosters with it using --key {}",
                    fingerprint.hex()
                ));
                if std::env::var_os(IDENTITY_ENV).is_none() {
                    output::info(&format!(
                        "Encrypted to the identity in {}; keep a copy somewhere safe",
                        output::path_style().apply_to(ctx.identity_path().display())
                    ));
                }
            }
        }
    }
    Ok(())
}

impl KeyListCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let entries = match ctx.backend()? {
            SigningBackend::Ed25519 => {
                let keyring = ctx.keyring()?;
                let secret = keyring.list()?;
                let listed = if self.all {
                    keyring.list_public()?
                } else {
                    secret.clone()
                };
                listed
                    .into_iter()
                    .map(|fpr| KeyEntry::new(fpr, secret.contains(&fpr), None))
                    .collect::<Vec<_>>()
            }
            SigningBackend::Gpg => ctx
                .gpg()
                .list_secret_keys()?
                .into_iter()
                .map(|k| KeyEntry::new(k.fingerprint, true, k.user_id))
                .collect(),
        };

        match cli.format {
            OutputFormat::Json => output::json(&entries)?,
            OutputFormat::Text => {
                if entries.is_empty() {
                    output::info("No keys found");
                    return Ok(());
                }

                println!("{}", output::header("Keys"));
                for entry in &entries {
                    let kind = if entry.secret { "sec" } else { "pub" };
                    let line = format!(
                        "  {} {}",
                        kind,
                        output::fingerprint_style().apply_to(entry.fingerprint)
                    );
                    match &entry.user_id {
                        Some(user_id) => println!("{}  {}", line, user_id),
                        None => println!("{}", line),
                    }
                }
            }
        }
        Ok(())
    }
}

impl KeyExportCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        require_keyring_backend(ctx, "export keys")?;

        let fingerprint = Fingerprint::parse(&self.fingerprint)?;
        let key = ctx.keyring()?.load_public(&fingerprint)?;
        let text = export_public(&key)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &text)
                    .with_context(|| format!("writing {}", path.display()))?;
                if !cli.quiet {
                    output::success(&format!(
                        "Exported {} to {}",
                        fingerprint,
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
            None => print!("{}", text),
        }
        Ok(())
    }
}

impl KeyImportCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        require_keyring_backend(ctx, "import keys")?;

        let text = if self.file.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        } else {
            std::fs::read_to_string(&self.file)
                .with_context(|| format!("reading {}", self.file.display()))?
        };

        let key = ctx.keyring()?.import_public(&text)?;
        let fingerprint = key.fingerprint();
        info!(%fingerprint, "imported public key");

        match cli.format {
            OutputFormat::Json => output::json(&KeyEntry::new(fingerprint, false, None))?,
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!(
                        "Imported {}",
                        output::fingerprint_style().apply_to(fingerprint)
                    ));
                }
            }
        }
        Ok(())
    }
}
