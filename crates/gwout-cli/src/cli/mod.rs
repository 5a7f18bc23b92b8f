mod commands;
mod helpers;

use clap::Parser;
use gwout_core::domain::OutputError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("gwout".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "gwout",
    version,
    about = "Random-access decoder for groundwater model output"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Decode one layer of a field at a stress period and time step
    Decode(commands::DecodeArgs),
    /// Decode a single row of a head or drawdown layer
    Row(commands::RowArgs),
    /// Print one head or drawdown cell at every stored instance
    Series(commands::SeriesArgs),
    /// List the budget terms every budget instance carries
    Catalog(commands::RunArgs),
    /// Summarize the output schedule implied by the run configuration
    Schema(commands::RunArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Decode(args) => commands::run_decode_command(args),
        CliCommand::Row(args) => commands::run_row_command(args),
        CliCommand::Series(args) => commands::run_series_command(args),
        CliCommand::Catalog(args) => commands::run_catalog_command(args),
        CliCommand::Schema(args) => commands::run_schema_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Decode(#[from] OutputError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn placeholder(&self) -> &'static str {
        match self {
            Self::Usage(_) => "INPUT.CLI_USAGE",
            Self::Decode(error) => error.placeholder(),
            Self::Internal(_) => "IO.CLI",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Decode(error) => error.exit_code(),
            Self::Internal(_) => 3,
        }
    }

    pub fn diagnostic_line(&self) -> String {
        let message = match self {
            Self::Internal(error) => format!("{error:#}"),
            other => other.to_string(),
        };
        format!("ERROR: [{}] {}", self.placeholder(), message.trim_end())
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, run};
    use gwout_core::domain::{FieldKind, OutputError};

    #[test]
    fn unknown_subcommands_are_usage_errors() {
        let error = run(["inspect"]).expect_err("unknown subcommand should fail");
        assert!(matches!(error, CliError::Usage(_)));
        assert_eq!(error.exit_code(), 2);
        assert!(error.diagnostic_line().starts_with("ERROR: [INPUT.CLI_USAGE]"));
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(run(["--help"]).expect("help should succeed"), 0);
    }

    #[test]
    fn decode_errors_keep_their_category() {
        let error = CliError::from(OutputError::FieldNotProduced {
            field: FieldKind::Drawdown,
        });
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.FIELD_NOT_PRODUCED] DRAWDOWN output is disabled for this run"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
    }
}
