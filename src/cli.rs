use crate::config_loader::load_config;
use crate::errors::{exit_codes, ExtractorError, ExtractorResult};
use crate::extractor::{LogExtractor, RunOptions, RunSummary};
use crate::platform::{current_platform, ensure_supported};
use crate::process::SystemProcessRunner;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const USAGE: &str = "apexlog-extractor -u <targetusername> -d <debugusername>";

/// Top-level CLI interface
#[derive(Parser, Debug)]
#[command(
    name = "apexlog-extractor",
    version,
    about = "Retrieve Salesforce Apex debug logs for a user, then optionally delete and archive them"
)]
pub struct Cli {
    /// Org username (or alias) used to log in and to run bulk deletes
    #[arg(short = 'u', long = "targetusername")]
    pub target_username: Option<String>,

    /// User whose debug logs are traced and retrieved
    #[arg(short = 'd', long = "debugusername")]
    pub debug_username: Option<String>,

    /// Do not create or refresh the TraceFlag
    #[arg(long)]
    pub skip_trace_flag: bool,

    /// Delete retrieved logs from the org afterwards
    #[arg(long)]
    pub delete: bool,

    /// Zip retrieved logs into the backup directory and remove the originals
    #[arg(long)]
    pub archive: bool,

    /// Report daily org limit usage before retrieving
    #[arg(long)]
    pub check_limits: bool,

    /// Path to a TOML config file (default: apexlog.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Both identities must be present and non-blank.
    pub fn run_options(&self) -> ExtractorResult<RunOptions> {
        let target = non_blank(self.target_username.as_deref())
            .ok_or_else(|| ExtractorError::usage("Please supply a targetusername for logging into the org"))?;
        let debug = non_blank(self.debug_username.as_deref())
            .ok_or_else(|| ExtractorError::usage("Please supply a debug username for pulling logs"))?;

        Ok(RunOptions {
            target_username: target.to_string(),
            debug_username: debug.to_string(),
            skip_trace_flag: self.skip_trace_flag,
            delete: self.delete,
            archive: self.archive,
            check_limits: self.check_limits,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses arguments; help and version exit 0, anything else is a usage error.
pub fn parse_args<I, T>(args: I) -> Result<Cli, i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Err(exit_codes::SUCCESS),
                _ => Err(exit_codes::USAGE),
            }
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// Platform gate first, then the identity checks.
pub fn preflight(cli: &Cli, os: &str) -> ExtractorResult<RunOptions> {
    ensure_supported(os)?;
    cli.run_options()
}

pub fn execute(cli: &Cli) -> ExtractorResult<RunSummary> {
    let options = preflight(cli, current_platform())?;
    let config = load_config(cli.config.as_deref())?;

    let runner = SystemProcessRunner;
    LogExtractor::new(&config, &runner).run(&options)
}

/// Runs the CLI and returns the process exit code.
pub fn dispatch(cli: Cli) -> i32 {
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(summary) => {
            println!("{summary}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            if matches!(e, ExtractorError::Usage { .. }) {
                eprintln!("{e}");
                eprintln!("usage: {USAGE}");
            } else {
                error!(error = %e, "run aborted");
            }
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = parse_args(["apexlog-extractor", "-u", "admin@example.com", "-d", "debug@example.com", "--delete"])
            .unwrap();
        let options = cli.run_options().unwrap();
        assert_eq!(options.target_username, "admin@example.com");
        assert_eq!(options.debug_username, "debug@example.com");
        assert!(options.delete);
        assert!(!options.skip_trace_flag);
    }

    #[test]
    fn missing_debug_username_is_usage_error() {
        let cli = parse_args(["apexlog-extractor", "--targetusername", "admin@example.com"]).unwrap();
        let err = cli.run_options().unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USAGE);
        assert!(err.to_string().contains("debug username"));
    }

    #[test]
    fn blank_target_is_usage_error() {
        let cli = parse_args(["apexlog-extractor", "-u", " ", "-d", "debug@example.com"]).unwrap();
        assert!(cli.run_options().is_err());
    }

    #[test]
    fn unknown_flag_maps_to_usage_exit_code() {
        assert_eq!(parse_args(["apexlog-extractor", "--bogus"]).unwrap_err(), exit_codes::USAGE);
    }

    #[test]
    fn unsupported_platform_wins_over_missing_flags() {
        let cli = parse_args(["apexlog-extractor", "-u", "admin@example.com"]).unwrap();
        let err = preflight(&cli, "windows").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::UNSUPPORTED_PLATFORM);

        let err = preflight(&cli, "linux").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USAGE);
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(parse_args(["apexlog-extractor", "--help"]).unwrap_err(), exit_codes::SUCCESS);
    }
}
