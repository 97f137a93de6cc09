//! Starting one pipeline stage as a child process.
//!
//! All allocation (argument vectors, environment, messages) happens in the
//! parent before `fork`. The child only moves descriptors around, writes
//! pre-built messages, and calls `execve` or `_exit`.

use std::env;
use std::ffi::{CString, OsStr};
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::os::raw::c_char;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::ptr;

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use crate::errors::{Result, ShellError};
use crate::parser::Stage;
use crate::resolve::resolve;
use crate::session::Session;

/// Exit status of a child whose command could not be found.
pub const NOT_FOUND_STATUS: i32 = 127;

/// A started, not yet waited for, child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProcess {
    pub pid: Pid,
    pub name: String,
}

/// Descriptor wiring for one stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageIo<'a> {
    pub stdin: Option<BorrowedFd<'a>>,
    pub stdout: Option<BorrowedFd<'a>>,
    /// Descriptors the child must close before exec (pipe ends and
    /// redirection files belonging to the whole pipeline).
    pub inherited: &'a [RawFd],
}

struct Prepared {
    name: String,
    executable: Option<CString>,
    argv: Vec<CString>,
    envp: Vec<CString>,
    cwd: CString,
    cwd_fd: Option<RawFd>,
    not_found: Vec<u8>,
    failure_prefix: Vec<u8>,
}

fn c_string(bytes: impl Into<Vec<u8>>) -> Result<CString> {
    CString::new(bytes).map_err(|e| {
        ShellError::InvalidArgument(String::from_utf8_lossy(&e.into_vec()).into_owned())
    })
}

impl Prepared {
    fn new(stage: &Stage, session: &Session) -> Result<Self> {
        let name = stage.name().to_string();
        let cwd = session.cwd();

        // Resolution is redone for every launch; nothing is cached.
        let executable = resolve(&name, session.search_path(), cwd)
            .map(|path| c_string(path.into_os_string().into_vec()))
            .transpose()?;

        let argv = stage
            .args()
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>>>()?;

        let mut envp = Vec::new();
        for (key, value) in env::vars_os() {
            if key == "PWD" {
                continue;
            }
            envp.push(c_string(env_entry(&key, &value))?);
        }
        envp.push(c_string(env_entry("PWD".as_ref(), cwd.as_os_str()))?);

        Ok(Self {
            executable,
            argv,
            envp,
            cwd: c_string(cwd.as_os_str().as_bytes())?,
            cwd_fd: session.cwd_fd().map(|fd| fd.as_raw_fd()),
            not_found: format!("{}: command not found\n", name).into_bytes(),
            failure_prefix: format!("{}: ", name).into_bytes(),
            name,
        })
    }
}

fn env_entry(key: &OsStr, value: &OsStr) -> Vec<u8> {
    let mut entry = key.as_bytes().to_vec();
    entry.push(b'=');
    entry.extend_from_slice(value.as_bytes());
    entry
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect()
}

/// Start `stage` in a new child process.
///
/// Resolution failures do not fail the launch: the child reports
/// `<name>: command not found` and exits with status 127, so the rest of a
/// pipeline keeps running. Errors returned here are failures to create the
/// child at all.
pub fn launch(stage: &Stage, io: StageIo<'_>, session: &Session) -> Result<ChildProcess> {
    let prepared = Prepared::new(stage, session)?;
    let argv = null_terminated(&prepared.argv);
    let envp = null_terminated(&prepared.envp);

    // SAFETY: the child branch only performs async-signal-safe calls on
    // memory prepared above, then execs or exits.
    match unsafe { unistd::fork() }? {
        ForkResult::Child => {
            let code = exec_child(&prepared, &io, &argv, &envp);
            // SAFETY: leaves the forked child without running the parent's
            // atexit handlers or flushing its stdio buffers.
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => {
            debug!(
                pid = %child,
                command = %prepared.name,
                executable = ?prepared.executable,
                stdin = ?io.stdin.map(|fd| fd.as_raw_fd()),
                stdout = ?io.stdout.map(|fd| fd.as_raw_fd()),
                "spawned stage"
            );
            Ok(ChildProcess {
                pid: child,
                name: prepared.name,
            })
        }
    }
}

/// Runs in the child. Only returns on failure, with the exit status to use.
fn exec_child(
    prepared: &Prepared,
    io: &StageIo<'_>,
    argv: &[*const c_char],
    envp: &[*const c_char],
) -> i32 {
    let fail = |errno: Errno| {
        report(&[
            prepared.failure_prefix.as_slice(),
            errno.desc().as_bytes(),
            b"\n".as_slice(),
        ]);
        errno as i32
    };

    if let Some(fd) = io.stdin {
        if let Err(errno) = duplicate_onto(fd.as_raw_fd(), libc::STDIN_FILENO) {
            return fail(errno);
        }
    }
    if let Some(fd) = io.stdout {
        if let Err(errno) = duplicate_onto(fd.as_raw_fd(), libc::STDOUT_FILENO) {
            return fail(errno);
        }
    }
    for &fd in io.inherited {
        if fd > libc::STDERR_FILENO {
            let _ = unistd::close(fd);
        }
    }

    // Dispositions the shell set for itself must not reach the program.
    for sig in [Signal::SIGINT, Signal::SIGPIPE] {
        // SAFETY: resetting to the default disposition installs no handler.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }

    if let Err(errno) = enter_session_directory(prepared) {
        return fail(errno);
    }

    let Some(executable) = &prepared.executable else {
        report(&[prepared.not_found.as_slice()]);
        return NOT_FOUND_STATUS;
    };

    // SAFETY: both arrays are null-terminated and point into `prepared`.
    unsafe { libc::execve(executable.as_ptr(), argv.as_ptr(), envp.as_ptr()) };
    fail(Errno::last())
}

/// The held descriptor still works after the directory was renamed or
/// removed; the path is only used when no descriptor could be opened.
fn enter_session_directory(prepared: &Prepared) -> nix::Result<()> {
    match prepared.cwd_fd {
        // SAFETY: the descriptor is owned by the session, which outlives the fork.
        Some(fd) => Errno::result(unsafe { libc::fchdir(fd) }).map(drop),
        None => unistd::chdir(prepared.cwd.as_c_str()),
    }
}

fn duplicate_onto(fd: RawFd, target: RawFd) -> nix::Result<()> {
    if fd == target {
        return Ok(());
    }
    // SAFETY: plain dup2 on descriptors owned by this process.
    Errno::result(unsafe { libc::dup2(fd, target) }).map(drop)
}

fn report(parts: &[&[u8]]) {
    for part in parts {
        let _ = unistd::write(io::stderr(), part);
    }
}

/// Conventional shell status for a finished child: the exit code, or
/// 128 + signal number when it was killed.
pub fn exit_code(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, sig, _) => Some(128 + sig as i32),
        _ => None,
    }
}

/// Block until `child` terminates and return its status.
pub fn wait(child: &ChildProcess) -> Result<i32> {
    loop {
        match waitpid(child.pid, None) {
            Ok(status) => {
                if let Some(code) = exit_code(status) {
                    debug!(pid = %child.pid, command = %child.name, code, "stage finished");
                    return Ok(code);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(ShellError::Spawn(errno)),
        }
    }
}
