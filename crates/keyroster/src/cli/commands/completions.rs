//! `keyroster completions`

use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, CommandFactory};
use clap_complete::{generate, generate_to, Shell};
use tracing::info;

use crate::cli::{output, Cli};

const BIN_NAME: &str = "keyroster";

/// Print a shell completion script
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum)]
    pub shell: Shell,

    /// Install into DIR under the shell's usual file name
    /// (`keyroster.bash`, `_keyroster`, `keyroster.fish`, ...)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl CompletionsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cmd = Cli::command();
        let Some(dir) = &self.dir else {
            generate(self.shell, &mut cmd, BIN_NAME, &mut io::stdout());
            return Ok(());
        };

        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = generate_to(self.shell, &mut cmd, BIN_NAME, dir)
            .with_context(|| format!("writing completions into {}", dir.display()))?;
        info!(shell = ?self.shell, path = %path.display(), "installed completions");

        if !cli.quiet {
            output::success(&format!(
                "Installed {:?} completions at {}",
                self.shell,
                output::path_style().apply_to(path.display())
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use clap::Parser;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        let argv = ["keyroster", "-q", "completions"].iter().chain(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_shell_names() {
        let cases = [
            ("bash", Shell::Bash),
            ("zsh", Shell::Zsh),
            ("powershell", Shell::PowerShell),
        ];
        for (name, shell) in cases {
            let cli = parse(&[name]);
            let Commands::Completions(cmd) = &cli.command else {
                panic!("expected completions command");
            };
            assert_eq!(cmd.shell, shell);
            assert!(cmd.dir.is_none());
        }
        assert!(Cli::try_parse_from(["keyroster", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn test_install_into_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("completions");
        let cli = parse(&["bash", "--dir", dir.to_str().unwrap()]);

        let Commands::Completions(cmd) = &cli.command else {
            panic!("expected completions command");
        };
        cmd.execute(&cli).unwrap();

        let script = std::fs::read_to_string(dir.join("keyroster.bash")).unwrap();
        assert!(script.contains("keyroster"));
        assert!(script.contains("verify"));
    }
}
