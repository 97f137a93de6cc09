use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd::{self, Pid};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::launcher::{self, ChildProcess, StageIo};
use crate::parser::ParsedCommand;
use crate::redirects::{Redirections, StdioGuard};
use crate::session::Session;

/// What happened to a command line handed to [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to run.
    Empty,
    /// Foreground command finished; status of its last stage.
    Finished(i32),
    /// Started in the background and left running.
    Background { job: u32, pids: Vec<Pid> },
}

/// Execute a parsed command line (built-ins already ruled out).
///
/// Syntax and redirection errors are returned before any process exists.
/// Foreground commands are waited for; background ones are recorded in the
/// session's job table and left running.
pub fn run(command: &ParsedCommand, session: &mut Session) -> Result<Outcome> {
    command.validate()?;
    debug!(%command, "running");

    match command.stages.len() {
        0 => Ok(Outcome::Empty),
        1 => run_single(command, session),
        _ => run_pipeline(command, session),
    }
}

fn run_single(command: &ParsedCommand, session: &mut Session) -> Result<Outcome> {
    let redirections = Redirections::open(command, session)?;
    let _stdio = StdioGuard::save()?;

    let inherited = redirections.raw_fds();
    let io = StageIo {
        stdin: redirections.input.as_ref().map(|f| f.as_fd()),
        stdout: redirections.output.as_ref().map(|f| f.as_fd()),
        inherited: &inherited,
    };

    let child = launcher::launch(&command.stages[0], io, session)?;
    drop(redirections);

    if command.background {
        return Ok(detach(vec![child], command, session));
    }
    Ok(Outcome::Finished(launcher::wait(&child)?))
}

fn run_pipeline(command: &ParsedCommand, session: &mut Session) -> Result<Outcome> {
    let redirections = Redirections::open(command, session)?;

    let boundaries = command.stages.len() - 1;
    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(boundaries);
    for _ in 0..boundaries {
        pipes.push(unistd::pipe2(OFlag::O_CLOEXEC)?);
    }

    let mut inherited: Vec<RawFd> = redirections.raw_fds();
    for (read, write) in &pipes {
        inherited.push(read.as_raw_fd());
        inherited.push(write.as_raw_fd());
    }

    let last = command.stages.len() - 1;
    let mut children: Vec<ChildProcess> = Vec::with_capacity(command.stages.len());
    let mut failure = None;

    for (i, stage) in command.stages.iter().enumerate() {
        let stdin = if i == 0 {
            redirections.input.as_ref().map(|f| f.as_fd())
        } else {
            Some(pipes[i - 1].0.as_fd())
        };
        let stdout = if i == last {
            redirections.output.as_ref().map(|f| f.as_fd())
        } else {
            Some(pipes[i].1.as_fd())
        };

        let io = StageIo {
            stdin,
            stdout,
            inherited: &inherited,
        };
        match launcher::launch(stage, io, session) {
            Ok(child) => children.push(child),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    // Children hold their own copies; ours must go or readers never see EOF.
    drop(pipes);
    drop(redirections);

    if let Some(e) = failure {
        warn!(started = children.len(), "pipeline aborted, reaping started stages");
        for child in &children {
            let _ = launcher::wait(child);
        }
        return Err(e);
    }

    if command.background {
        return Ok(detach(children, command, session));
    }

    let mut status = 0;
    for child in &children {
        status = launcher::wait(child)?;
    }
    Ok(Outcome::Finished(status))
}

/// Give up the wait obligation for `children` and announce the job.
fn detach(children: Vec<ChildProcess>, command: &ParsedCommand, session: &mut Session) -> Outcome {
    let pids: Vec<Pid> = children.iter().map(|c| c.pid).collect();
    let job = session.jobs.add(pids.clone(), command.to_string());

    if let Some(pid) = pids.last() {
        println!("[{}] {}", job, pid);
    }

    Outcome::Background { job, pids }
}
