use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use nix::errno::Errno;
use tracing::trace;

use crate::errors::{Result, ShellError};
use crate::parser::ParsedCommand;
use crate::session::Session;

/// Files opened for a command's `<` and `>` targets.
///
/// Both are opened before anything is spawned; when either fails, nothing
/// runs and whatever was already opened is closed on drop.
#[derive(Debug, Default)]
pub struct Redirections {
    pub input: Option<File>,
    pub output: Option<File>,
}

impl Redirections {
    pub fn open(command: &ParsedCommand, session: &Session) -> Result<Self> {
        let mut opened = Redirections::default();

        if let Some(target) = &command.input {
            let path = session.resolve_path(target);
            let file = File::open(&path).map_err(|source| ShellError::Redirection { path, source })?;
            opened.input = Some(file);
        }

        if let Some(target) = &command.output {
            let path = session.resolve_path(target);
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(&path)
                .map_err(|source| ShellError::Redirection { path, source })?;
            opened.output = Some(file);
        }

        Ok(opened)
    }

    pub fn raw_fds(&self) -> Vec<RawFd> {
        self.input
            .iter()
            .chain(self.output.iter())
            .map(|f| f.as_raw_fd())
            .collect()
    }
}

/// Saved copies of the shell's own stdin and stdout, put back on drop.
///
/// Restoration runs however the command ended, including when no child
/// could be started.
pub struct StdioGuard {
    saved: Vec<(RawFd, OwnedFd)>,
}

impl StdioGuard {
    pub fn save() -> Result<Self> {
        let mut saved = Vec::with_capacity(2);
        for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO] {
            // Copies are close-on-exec so children never inherit them.
            // SAFETY: duplicating a standard descriptor of this process.
            let copy = unsafe { libc::fcntl(target, libc::F_DUPFD_CLOEXEC, 3) };
            match Errno::result(copy) {
                // SAFETY: `copy` is a fresh descriptor that nothing else owns.
                Ok(fd) => saved.push((target, unsafe { OwnedFd::from_raw_fd(fd) })),
                // A closed standard stream has nothing to restore.
                Err(Errno::EBADF) => {}
                Err(errno) => return Err(ShellError::Spawn(errno)),
            }
        }
        trace!(count = saved.len(), "saved shell stdio");
        Ok(Self { saved })
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        for (target, copy) in self.saved.drain(..) {
            // SAFETY: restoring a standard descriptor from our own copy.
            let _ = Errno::result(unsafe { libc::dup2(copy.as_raw_fd(), target) });
            drop(copy);
        }
        trace!("restored shell stdio");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use std::io::Write;

    fn session(dir: &std::path::Path) -> Session {
        Session::with_cwd(ShellConfig::default(), dir)
    }

    #[test]
    fn opens_targets_relative_to_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in.txt"), "data").unwrap();

        let command = ParsedCommand::parse("cat <in.txt >out.txt");
        let opened = Redirections::open(&command, &session(dir.path())).unwrap();
        assert!(opened.input.is_some());
        assert!(opened.output.is_some());
        assert_eq!(opened.raw_fds().len(), 2);
        assert!(dir.path().join("out.txt").exists());
    }

    #[test]
    fn output_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.txt"), "old contents").unwrap();

        let command = ParsedCommand::parse("echo >out.txt");
        let mut opened = Redirections::open(&command, &session(dir.path())).unwrap();
        opened.output.as_mut().unwrap().write_all(b"new").unwrap();
        drop(opened);

        assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "new");
    }

    #[test]
    fn missing_input_fails_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let command = ParsedCommand::parse("cat <missing.txt >out.txt");

        let err = Redirections::open(&command, &session(dir.path())).unwrap_err();
        match err {
            ShellError::Redirection { path, .. } => assert!(path.ends_with("missing.txt")),
            other => panic!("expected redirection error, got {other:?}"),
        }
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn guard_leaves_descriptors_usable() {
        {
            let _guard = StdioGuard::save().unwrap();
        }
        let flags = unsafe { libc::fcntl(libc::STDOUT_FILENO, libc::F_GETFD) };
        assert!(flags >= 0);
    }
}
