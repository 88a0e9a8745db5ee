use std::io::{self, Write};

use clap::{Parser, Subcommand, ValueEnum};

use crate::check::{CheckArgs, run_check};
use crate::error::Result;
use crate::logging::{self, LogFormat};
use crate::run::{RunArgs, run_run};
use crate::watch::{WatchArgs, run_watch};

#[derive(Debug, Parser)]
#[command(
    name = "weave",
    about = "Run reactive view-models from JSON data, templates, and scripts",
    version
)]
pub struct Cli {
    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log filter used when `RUST_LOG` is unset (e.g. `debug`, `weave_core=trace`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mount a template over data and print the rendered HTML.
    Run(RunArgs),

    /// Watch a path and print every change.
    Watch(WatchArgs),

    /// List and validate the bindings in a template.
    Check(CheckArgs),
}

/// Output shape for command reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_format, cli.log_level.as_deref());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Run one command, writing its report to `out`.
pub fn execute(command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Run(args) => run_run(args, out),
        Commands::Watch(args) => run_watch(args, out),
        Commands::Check(args) => run_check(args, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_globals() {
        let cli = Cli::try_parse_from([
            "weave",
            "run",
            "--data",
            "d.json",
            "--template",
            "t.json",
            "--format",
            "json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.script.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn watch_requires_path() {
        assert!(Cli::try_parse_from(["weave", "watch", "--data", "d.json"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
