//! `pipesh`: the command-line interpreter and process orchestration core of
//! a small Unix shell.
//!
//! A raw line goes through [`ParsedCommand::parse`], then either a
//! [`Builtin`] (`cd`, `exit`) runs inside the shell or [`pipes::run`] starts
//! the pipeline's children with [`launcher::launch`], wiring pipes and
//! redirections, and waits for them unless the line ends in `&`.
//! [`interpret`] ties these together for one line.

pub mod builtin;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod launcher;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod pipes;
pub mod prompt;
pub mod redirects;
pub mod resolve;
pub mod session;
pub mod shell;

pub use builtin::{Builtin, Flow};
pub use config::ShellConfig;
pub use errors::{Result, ShellError, SyntaxError};
pub use parser::{ParsedCommand, Stage};
pub use pipes::Outcome;
pub use session::Session;
pub use shell::{interpret, Shell};
