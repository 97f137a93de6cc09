//! Command-line arguments for the `pipesh` binary.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipesh",
    version,
    about = "A small Unix shell: pipelines, redirection, background jobs, cd and exit.",
    long_about = None
)]
pub struct CliArgs {
    /// Interpret a single command line and exit with its status.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub command: Option<String>,

    /// Diagnostic log level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPESH_LOG` or `warn` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Disable colored prompt and error messages.
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
