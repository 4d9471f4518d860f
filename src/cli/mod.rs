//! CLI mode for roster - logs in, extracts rosters and saves them to disk.

mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::{
    ApiClient, ClientConfig, CloseReason, CourseId, Dashboard, Error, FileSystem, TokioFileSystem,
    View, render, save_download,
};

pub use progress::{RunSummary, SavedFile, SpinnerFeedback};
use progress::{print_course_list, print_summary};

pub const USERNAME_ENV: &str = "ROSTER_USERNAME";
pub const PASSWORD_ENV: &str = "ROSTER_PASSWORD";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Courses,
    Extract(Vec<CourseId>),
    ExtractAll,
    Health,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub api: Option<String>,
    pub output: Option<PathBuf>,
    pub force: bool,
}

/// Result of argument parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Help,
    Run(CliArgs),
}

fn usage_error(message: impl Into<String>) -> Error {
    Error::Configuration(message.into())
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns [`Error::Configuration`] for unknown flags, missing values or a
/// missing command.
pub fn parse_args<I>(args: I) -> crate::Result<Parsed>
where
    I: IntoIterator<Item = String>,
{
    let mut api = None;
    let mut output = None;
    let mut force = false;
    let mut positional = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "--api" => {
                api = Some(
                    args.next()
                        .ok_or_else(|| usage_error("--api requires a value"))?,
                );
            }
            "-o" | "--output" => {
                output = Some(PathBuf::from(
                    args.next()
                        .ok_or_else(|| usage_error("--output requires a value"))?,
                ));
            }
            "-f" | "--force" => force = true,
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(usage_error(format!("Unknown option: {flag}")));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("courses") => Command::Courses,
        Some("extract") => {
            let ids: Vec<CourseId> = positional.by_ref().map(CourseId::from).collect();
            if ids.is_empty() {
                return Err(usage_error("extract requires at least one course id"));
            }
            Command::Extract(ids)
        }
        Some("extract-all") => Command::ExtractAll,
        Some("health") => Command::Health,
        Some(other) => return Err(usage_error(format!("Unknown command: {other}"))),
        None => return Ok(Parsed::Help),
    };
    if let Some(extra) = positional.next() {
        return Err(usage_error(format!("Unexpected argument: {extra}")));
    }

    Ok(Parsed::Run(CliArgs {
        command,
        api,
        output,
        force,
    }))
}

/// Gets service credentials from environment variables.
fn get_credentials() -> crate::Result<(String, String)> {
    let username = std::env::var(USERNAME_ENV)
        .map_err(|_| usage_error(format!("{USERNAME_ENV} environment variable not set")))?;
    let password = std::env::var(PASSWORD_ENV)
        .map_err(|_| usage_error(format!("{PASSWORD_ENV} environment variable not set")))?;
    Ok((username, password))
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(mut config: ClientConfig, args: &CliArgs) -> ClientConfig {
    if let Some(api) = &args.api {
        config = config.with_api_base(api.clone());
    }
    if let Some(output) = &args.output {
        config = config.with_download_dir(output.clone());
    }
    if args.force {
        config = config.with_force_overwrite(true);
    }
    config
}

/// Writes each `(filename, payload)` pair and records the outcome.
async fn save_all<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    files: Vec<(String, Bytes)>,
    force: bool,
    summary: &mut RunSummary,
) -> crate::Result<()> {
    for (filename, payload) in files {
        match save_download(fs, dir, &filename, &payload, force).await {
            Ok(path) => summary.saved.push(SavedFile {
                path: path.display().to_string(),
                size: payload.len() as u64,
            }),
            Err(Error::FileExists { path }) => {
                log::warn!("Not overwriting {path}");
                summary.skipped.push(path);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Collects the payloads of a course's current download set.
fn course_payloads(dashboard: &Dashboard, id: &CourseId) -> Vec<(String, Bytes)> {
    dashboard
        .controller()
        .downloads(id)
        .map(|set| {
            set.artifacts
                .iter()
                .filter_map(|a| Some((a.filename().to_string(), a.payload()?.clone())))
                .collect()
        })
        .unwrap_or_default()
}

fn archive_payload(dashboard: &Dashboard) -> Vec<(String, Bytes)> {
    dashboard
        .controller()
        .archive()
        .and_then(|archive| {
            let payload = archive.artifact.payload()?.clone();
            Some((archive.artifact.filename().to_string(), payload))
        })
        .into_iter()
        .collect()
}

async fn run_health(config: &ClientConfig) -> crate::Result<()> {
    let api = ApiClient::from_config(config)?;
    let health = api.health().await?;
    println!("Service status: {}", health.status);
    Ok(())
}

/// Runs the authenticated commands against a logged-in dashboard.
async fn run_session(
    dashboard: &mut Dashboard,
    command: &Command,
    config: &ClientConfig,
    summary: &mut RunSummary,
) -> crate::Result<()> {
    let fs = TokioFileSystem::new();
    let dir = config.download_dir.as_path();
    let force = config.force_overwrite;

    match command {
        Command::Courses => {
            if let View::Dashboard { courses, .. } = render(dashboard.controller_mut())? {
                print_course_list(&courses);
            }
            Ok(())
        }
        Command::Extract(ids) => {
            let mut first_error = None;
            for id in ids {
                match dashboard.extract_course(id).await {
                    Ok(()) => {
                        let files = course_payloads(dashboard, id);
                        save_all(&fs, dir, files, force, summary).await?;
                        let _ = dashboard.close_modal(CloseReason::CloseButton);
                    }
                    Err(e) => {
                        log::error!("Extraction of course {id} failed: {e}");
                        summary.failed += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        }
        Command::ExtractAll => {
            dashboard.extract_all().await?;
            let files = archive_payload(dashboard);
            save_all(&fs, dir, files, force, summary).await?;
            let _ = dashboard.close_modal(CloseReason::CloseButton);
            Ok(())
        }
        Command::Health => run_health(config).await,
    }
}

/// Runs the CLI with the given parsed arguments.
///
/// # Errors
///
/// Returns an error if configuration is invalid, login fails, or any
/// requested extraction fails.
pub async fn run(args: CliArgs) -> crate::Result<()> {
    let config = apply_overrides(ClientConfig::load()?, &args);

    if args.command == Command::Health {
        return run_health(&config).await;
    }

    let (username, password) = get_credentials()?;
    let feedback = Arc::new(SpinnerFeedback::new());
    let mut dashboard = Dashboard::from_config(&config, feedback)?;

    dashboard.login(&username, &password).await?;

    let mut summary = RunSummary::default();
    let result = run_session(&mut dashboard, &args.command, &config, &mut summary).await;
    dashboard.logout();

    print_summary(&summary);
    result
}
