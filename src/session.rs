use std::env;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ShellConfig;
use crate::jobs::JobTable;

/// Everything that survives from one command line to the next.
///
/// The working directory lives here rather than in the process: `cd` only
/// updates this value, and children are started inside it. Besides the path
/// the session holds the directory open, so children still start there
/// after it has been renamed or removed.
#[derive(Debug)]
pub struct Session {
    cwd: PathBuf,
    cwd_fd: Option<OwnedFd>,
    config: ShellConfig,
    pub jobs: JobTable,
    pub last_status: i32,
}

/// Open `path` as a close-on-exec directory handle.
pub(crate) fn open_directory(path: &Path) -> io::Result<OwnedFd> {
    let dir: File = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(path)?;
    Ok(OwnedFd::from(dir))
}

impl Session {
    /// Start in the process's current directory.
    pub fn new(config: ShellConfig) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self::with_cwd(config, cwd)
    }

    pub fn with_cwd(config: ShellConfig, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let cwd_fd = open_directory(&cwd)
            .map_err(|e| debug!(cwd = %cwd.display(), error = %e, "session directory not held open"))
            .ok();
        Self {
            cwd,
            cwd_fd,
            config,
            jobs: JobTable::new(),
            last_status: 0,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Open handle on the session directory, when one could be taken.
    pub fn cwd_fd(&self) -> Option<BorrowedFd<'_>> {
        self.cwd_fd.as_ref().map(|fd| fd.as_fd())
    }

    pub(crate) fn set_cwd(&mut self, cwd: PathBuf, handle: OwnedFd) {
        self.cwd = cwd;
        self.cwd_fd = Some(handle);
    }

    pub fn home(&self) -> Option<&Path> {
        self.config.home.as_deref()
    }

    pub fn search_path(&self) -> Option<&OsStr> {
        self.config.search_path.as_deref()
    }

    /// Interpret `path` relative to the session directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.cwd.join(path)
    }
}
