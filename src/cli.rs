//! Command-line interface implementation

use clap::{ArgAction, Parser};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;

use crate::annotator::LabelAnnotator;
use crate::color::ColorMap;
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError, LogLevel};
use crate::error::AnnotateError;
use crate::registry::{GirderClient, RegistryError};
use crate::resolve::IdentifierKind;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;

/// Burn the labeled annotations of a Girder item onto its overlay image
#[derive(Parser, Debug)]
#[command(name = "overlay-labels")]
#[command(version)]
pub struct Cli {
    /// The full path to the REST API of a Girder instance, e.g. http://my.girder.com/api/v1
    pub url: String,

    /// Girder user name
    pub username: String,

    /// Girder item id of the annotated image
    pub id: String,

    /// JSON file mapping annotation names to color/label values
    pub colormap: PathBuf,

    /// Filename of the output image; the extension selects the format
    pub output: PathBuf,

    /// Password; prompted for on the terminal when omitted
    #[arg(long)]
    pub password: Option<String>,

    /// The id refers to the overlay rather than the annotated item
    #[arg(long)]
    pub overlay: bool,

    /// Config file to use instead of discovering overlay-labels.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
    #[error("cannot read password: {0}")]
    Password(#[source] io::Error),
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(level: LogLevel) {
    // A subscriber may already be installed when embedded; keep it
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Ask for the password with echo turned off when stdin is a terminal.
///
/// Piped input is read as a single line.
fn prompt_password(username: &str) -> io::Result<String> {
    let prompt = format!("Password for {}: ", username);
    if io::stdin().is_terminal() {
        return rpassword::prompt_password(prompt);
    }

    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn execute(cli: &Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    merge_cli_overrides(
        &mut config,
        &CliOverrides { timeout_secs: cli.timeout, verbose: cli.verbose },
    );
    init_logging(config.log.level);

    // Read the color map before touching the network
    let colormap = ColorMap::load(&cli.colormap).map_err(AnnotateError::from)?;
    tracing::debug!(
        path = %cli.colormap.display(),
        labels = ?colormap.labels().collect::<Vec<_>>(),
        "loaded color map"
    );

    let timeout = Duration::from_secs(config.registry.timeout_secs);
    let mut client = GirderClient::new(&cli.url, timeout);
    if let Some(user_agent) = &config.registry.user_agent {
        client = client.with_user_agent(user_agent);
    }
    tracing::info!(username = %cli.username, "logging in to {}", client.api_url());

    let password = match &cli.password {
        Some(password) => password.clone(),
        None => prompt_password(&cli.username).map_err(CliError::Password)?,
    };
    client.authenticate(&cli.username, &password)?;

    let kind = if cli.overlay {
        IdentifierKind::Overlay
    } else {
        IdentifierKind::Item
    };

    let mut annotator = LabelAnnotator::new(client).with_create_dirs(config.output.create_dirs);
    annotator.set_colormap(Some(colormap));
    annotator.set_identifier_kind(kind);
    annotator.set_identifier(Some(&cli.id))?;
    annotator.save(&cli.output)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "overlay-labels",
            "http://girder/api/v1",
            "alice",
            "abc123",
            "colors.json",
            "out.png",
            "--overlay",
            "--password",
            "pw",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.url, "http://girder/api/v1");
        assert_eq!(cli.id, "abc123");
        assert_eq!(cli.output, PathBuf::from("out.png"));
        assert!(cli.overlay);
        assert_eq!(cli.password.as_deref(), Some("pw"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_missing_positional_is_rejected() {
        assert!(Cli::try_parse_from(["overlay-labels", "http://girder/api/v1", "alice"]).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Cli::try_parse_from([
            "overlay-labels",
            "u",
            "n",
            "i",
            "c.json",
            "o.png",
            "--timeout",
            "0",
        ]);
        assert!(result.is_err());
    }
}
