// refcheck CLI - referral fraud classification from CSV exports

mod exit_codes;
mod logging;
mod profile;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "refcheck")]
#[command(about = "Label referral rewards valid or invalid against business rules")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log verbosity on stderr (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every referral described by a TOML config
    #[command(after_help = "\
Examples:
  refcheck run refcheck.toml
  refcheck run refcheck.toml --output report.csv --summary summary.json
  refcheck run refcheck.toml --json")]
    Run {
        /// Path to the refcheck.toml config file
        config: PathBuf,

        /// Write the CSV report here (overrides output.report)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the full JSON result to stdout instead of the CSV report
        #[arg(long)]
        json: bool,

        /// Write the summary JSON here (overrides output.summary)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Validate a config without reading any data
    #[command(after_help = "\
Examples:
  refcheck validate refcheck.toml")]
    Validate {
        /// Path to the refcheck.toml config file
        config: PathBuf,
    },

    /// Profile raw CSV files: missing values, cardinality, duplicate rows
    #[command(after_help = "\
Examples:
  refcheck profile user_referrals.csv user_logs.csv
  refcheck profile data/*.csv --output profile.json")]
    Profile {
        /// CSV files to profile
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  refcheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  refcheck-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = match cli.command {
        Commands::Run { config, output, json, summary } => {
            recon::cmd_run(config, output, json, summary)
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Profile { files, output } => profile::cmd_profile(files, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Engine error with its registered exit code and, where one helps, a hint.
    pub fn referral(err: refcheck_recon::ReferralError) -> Self {
        use refcheck_recon::ReferralError;

        let code = exit_codes::referral_exit_code(&err);
        let hint = match &err {
            ReferralError::Schema { .. } => {
                Some("map renamed headers under [datasets.<name>.columns]".to_string())
            }
            ReferralError::Parse { column, .. } if column.ends_with("_at") => {
                Some("check time.timestamp_format against the file".to_string())
            }
            ReferralError::MissingReference { .. } => {
                Some("the referenced dataset may be an outdated export".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
