//! Error types for everything the shell reports back to the user.
//!
//! Command-not-found and exec failures are not represented here: they
//! happen inside the child, which prints its own message and exits.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("syntax error: empty command in pipeline")]
    EmptyStage,

    #[error("syntax error: unterminated quote")]
    UnterminatedQuote,

    #[error("syntax error: missing file name after '{0}'")]
    MissingTarget(char),
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("{}: {source}", path.display())]
    Redirection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cd: {reason}: {dir}")]
    Cd { dir: String, reason: String },

    #[error("cannot start process: {0}")]
    Spawn(#[from] Errno),

    #[error("argument contains a NUL byte: {0:?}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;
