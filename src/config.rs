//! Startup configuration read from the process environment.
//!
//! The core never reads environment variables on its own; everything it
//! needs is captured here once and handed to the [`Session`](crate::session::Session).

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    /// Colon-separated executable search path (`PATH`).
    pub search_path: Option<OsString>,
    /// Target of a bare `cd` (`HOME`).
    pub home: Option<PathBuf>,
    /// Prompt override (`PS1`), used verbatim.
    pub prompt: Option<String>,
    /// Colored prompt and error messages.
    pub color: bool,
}

impl ShellConfig {
    pub fn from_env() -> Self {
        Self {
            search_path: env::var_os("PATH"),
            home: env::var_os("HOME").filter(|h| !h.is_empty()).map(PathBuf::from),
            prompt: env::var("PS1").ok(),
            color: env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }
}
