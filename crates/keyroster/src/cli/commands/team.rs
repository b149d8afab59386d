//! Team roster commands

use anyhow::{bail, Context as _};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use dialoguer::Confirm;
use keyroster_db::Item;
use keyroster_signing::{verify_roster, Fingerprint, VerificationKey};
use keyroster_team::{directory, find_team, save_team, Person, Team, UpsertWarning};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cli::{output, Cli, Context, OutputFormat};

/// Event recorded each time a roster's signature checks out
const VERIFIED: &str = "verified";

/// Team roster commands
#[derive(Debug, Args)]
pub struct TeamCommand {
    #[command(subcommand)]
    pub command: TeamSubcommand,
}

/// Team roster subcommands
#[derive(Debug, Subcommand)]
pub enum TeamSubcommand {
    /// Create a team with yourself as its first admin
    Create(TeamCreateCommand),

    /// List known teams
    List,

    /// Show a team's roster
    Show(TeamShowCommand),

    /// Print the roster the next signature would cover
    Preview(TeamPreviewCommand),

    /// Add a person to a team, or change their entry
    Add(TeamAddCommand),

    /// Check roster signatures against the admins' keys
    Verify(TeamVerifyCommand),
}

/// Create a team
#[derive(Debug, Args)]
pub struct TeamCreateCommand {
    /// Team name
    #[arg(required = true)]
    pub name: String,

    /// Your email address
    #[arg(short, long, required = true)]
    pub email: String,

    /// Fingerprint of the key to sign with
    #[arg(short, long)]
    pub key: Option<String>,
}

/// Show a team
#[derive(Debug, Args)]
pub struct TeamShowCommand {
    /// Team name, slug or UUID
    #[arg(required = true)]
    pub team: String,
}

/// Preview a team's next roster
#[derive(Debug, Args)]
pub struct TeamPreviewCommand {
    /// Team name, slug or UUID
    #[arg(required = true)]
    pub team: String,
}

/// Add or update a person
#[derive(Debug, Args)]
pub struct TeamAddCommand {
    /// Team name, slug or UUID
    #[arg(required = true)]
    pub team: String,

    /// The person's email address
    #[arg(short, long, required = true)]
    pub email: String,

    /// The person's key fingerprint
    #[arg(short, long, required = true)]
    pub fingerprint: String,

    /// Make the person an admin
    #[arg(long)]
    pub admin: bool,

    /// Fingerprint of the admin key to sign with
    #[arg(short, long)]
    pub key: Option<String>,

    /// Apply changes to existing entries without asking
    #[arg(short, long)]
    pub yes: bool,
}

/// Verify rosters
#[derive(Debug, Args)]
pub struct TeamVerifyCommand {
    /// Team name, slug or UUID (default: every team)
    pub team: Option<String>,

    /// Skip teams verified within this many hours
    #[arg(long, value_name = "HOURS")]
    pub if_older_than: Option<u32>,
}

#[derive(Debug, Serialize)]
struct TeamSummary<'a> {
    name: &'a str,
    uuid: Uuid,
    version: u32,
    directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_verified: Option<DateTime<Utc>>,
    people: &'a [Person],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum VerifyStatus {
    Verified,
    Failed,
    Skipped,
}

#[derive(Debug, Serialize)]
struct VerifyResult {
    team: String,
    uuid: Uuid,
    status: VerifyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TeamCommand {
    pub fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        match &self.command {
            TeamSubcommand::Create(cmd) => cmd.execute(cli, ctx),
            TeamSubcommand::List => list(cli, ctx),
            TeamSubcommand::Show(cmd) => cmd.execute(cli, ctx),
            TeamSubcommand::Preview(cmd) => cmd.execute(cli, ctx),
            TeamSubcommand::Add(cmd) => cmd.execute(cli, ctx),
            TeamSubcommand::Verify(cmd) => cmd.execute(cli, ctx),
        }
    }
}

fn summary<'a>(ctx: &Context, team: &'a Team) -> anyhow::Result<TeamSummary<'a>> {
    let last_verified = ctx.database().get_last(VERIFIED, &Item::from(team))?;
    Ok(TeamSummary {
        name: &team.name,
        uuid: team.uuid,
        version: team.version,
        directory: directory(team, &ctx.data_dir.teams_dir())
            .display()
            .to_string(),
        last_verified,
        people: &team.people,
    })
}

impl TeamCreateCommand {
    #[instrument(skip_all, fields(name = %self.name))]
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let key = ctx.signing_key(self.key.as_deref())?;
        let admin = Person::new(self.email.trim(), key.fingerprint(), true);
        let mut team = Team::new(self.name.trim(), vec![admin]);

        team.update_roster(&*key)?;
        let dir = save_team(&team, &ctx.data_dir.teams_dir())?;
        info!(team = %team.uuid, "created team");

        match cli.format {
            OutputFormat::Json => output::json(&summary(ctx, &team)?)?,
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!("Created team {}", team.name));
                    println!("{}", output::key_value("UUID", &team.uuid.to_string()));
                    println!(
                        "{}",
                        output::key_value(
                            "Directory",
                            &output::path_style().apply_to(dir.display()).to_string()
                        )
                    );
                }
            }
        }
        Ok(())
    }
}

fn list(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    let teams = ctx.teams()?;

    match cli.format {
        OutputFormat::Json => {
            let summaries = teams
                .iter()
                .map(|team| summary(ctx, team))
                .collect::<anyhow::Result<Vec<_>>>()?;
            output::json(&summaries)?;
        }
        OutputFormat::Text => {
            if teams.is_empty() {
                output::info("No teams yet");
                return Ok(());
            }

            println!("{}", output::header("Teams"));
            for team in &teams {
                println!(
                    "  {}  {} ({} people, version {})",
                    team.name,
                    team.uuid,
                    team.people.len(),
                    team.version
                );
            }
        }
    }
    Ok(())
}

impl TeamShowCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let teams = ctx.teams()?;
        let team = find_team(&teams, &self.team)?;
        let summary = summary(ctx, team)?;

        if cli.format == OutputFormat::Json {
            return output::json(&summary);
        }

        println!("{}", output::header(&team.name));
        println!("{}", output::key_value("UUID", &team.uuid.to_string()));
        println!("{}", output::key_value("Version", &team.version.to_string()));
        println!("{}", output::key_value("Directory", &summary.directory));
        let verified = summary
            .last_verified
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("{}", output::key_value("Last verified", &verified));

        println!();
        println!("{}", output::header("People"));
        for person in &team.people {
            let role = if person.is_admin { " (admin)" } else { "" };
            println!(
                "  {}{}\n    {}",
                person.email,
                role,
                output::fingerprint_style().apply_to(person.fingerprint)
            );
        }
        Ok(())
    }
}

impl TeamPreviewCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let teams = ctx.teams()?;
        let team = find_team(&teams, &self.team)?;
        let roster = team.preview_roster()?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "team": team.uuid,
                "version": team.next_version()?,
                "roster": roster,
            }))?,
            OutputFormat::Text => print!("{}", roster),
        }
        Ok(())
    }
}

impl TeamAddCommand {
    #[instrument(skip_all, fields(team = %self.team, email = %self.email))]
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let teams = ctx.teams()?;
        let mut team = find_team(&teams, &self.team)?.clone();

        // Only a roster that still checks out may be re-signed
        verify_team(ctx, &team)
            .with_context(|| format!("refusing to change {}", team.name))?;
        ctx.database()
            .record_last(VERIFIED, &Item::from(&team), Utc::now())?;

        let person = Person::new(
            self.email.trim(),
            Fingerprint::parse(&self.fingerprint)?,
            self.admin,
        );

        match team.get_upsert_person_warnings(&person) {
            Some(UpsertWarning::PersonWouldNotBeChanged) => {
                if !cli.quiet {
                    output::info(&format!("{} is already in {}", person.email, team.name));
                }
                return Ok(());
            }
            Some(warning) => {
                warn!(%warning, "upsert changes an existing entry");
                if !self.yes {
                    output::warning(&format!("{}: {}", person.email, warning));
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Update {} in {}?", person.email, team.name))
                        .default(false)
                        .interact()?;

                    if !confirmed {
                        println!("Cancelled");
                        return Ok(());
                    }
                }
            }
            None => {}
        }

        let key = ctx.signing_key(self.key.as_deref())?;
        let email = person.email.clone();
        team.upsert_person(person);
        team.update_roster(&*key)?;
        save_team(&team, &ctx.data_dir.teams_dir())?;

        match cli.format {
            OutputFormat::Json => output::json(&summary(ctx, &team)?)?,
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!(
                        "Signed version {} of {} with {} listed",
                        team.version, team.name, email
                    ));
                }
            }
        }
        Ok(())
    }
}

impl TeamVerifyCommand {
    fn execute(&self, cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
        let teams = ctx.teams()?;
        let selected: Vec<&Team> = match &self.team {
            Some(query) => vec![find_team(&teams, query)?],
            None => teams.iter().collect(),
        };

        let db = ctx.database();
        let now = Utc::now();
        let mut results = Vec::with_capacity(selected.len());

        for team in selected {
            let item = Item::from(team);
            if let Some(hours) = self.if_older_than {
                let age = Duration::hours(i64::from(hours));
                if !db.is_older_than(VERIFIED, &item, age, now)? {
                    results.push(VerifyResult {
                        team: team.name.clone(),
                        uuid: team.uuid,
                        status: VerifyStatus::Skipped,
                        error: None,
                    });
                    continue;
                }
            }

            let outcome = verify_team(ctx, team);
            if outcome.is_ok() {
                db.record_last(VERIFIED, &item, now)?;
            }
            results.push(VerifyResult {
                team: team.name.clone(),
                uuid: team.uuid,
                status: if outcome.is_ok() {
                    VerifyStatus::Verified
                } else {
                    VerifyStatus::Failed
                },
                error: outcome.err().map(|e| format!("{:#}", e)),
            });
        }

        match cli.format {
            OutputFormat::Json => output::json(&results)?,
            OutputFormat::Text => print_verify_results(cli, &results),
        }

        let failed = results
            .iter()
            .filter(|r| r.status == VerifyStatus::Failed)
            .count();
        if failed > 0 {
            bail!("{} of {} rosters failed verification", failed, results.len());
        }
        Ok(())
    }
}

#[instrument(skip_all, fields(team = %team.uuid))]
fn verify_team(ctx: &Context, team: &Team) -> anyhow::Result<()> {
    team.validate()?;

    let keys = ctx.admin_keys(team)?;
    if keys.is_empty() {
        bail!("none of the admins' keys are available");
    }

    let candidates: Vec<&dyn VerificationKey> = keys.iter().map(|k| &**k).collect();
    let (roster, signature) = team.roster();
    verify_roster(roster, signature, &candidates)?;

    info!(version = team.version, "roster verified");
    Ok(())
}

fn print_verify_results(cli: &Cli, results: &[VerifyResult]) {
    if results.is_empty() {
        output::info("No teams to verify");
        return;
    }

    for result in results {
        match (result.status, &result.error) {
            (VerifyStatus::Failed, Some(error)) => {
                output::error(&format!("{}: {}", result.team, error));
            }
            (VerifyStatus::Failed, None) => output::error(&result.team),
            (_, _) if cli.quiet => {}
            (VerifyStatus::Verified, _) => {
                output::success(&format!("{}: signature verified", result.team));
            }
            (VerifyStatus::Skipped, _) => {
                output::info(&format!("{}: verified recently, skipped", result.team));
            }
        }
    }
}
