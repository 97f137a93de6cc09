use std::fs;
use std::io::ErrorKind;

use nix::unistd::{access, AccessFlags};
use tracing::debug;

use crate::errors::{Result, ShellError};
use crate::parser::ParsedCommand;
use crate::session::{open_directory, Session};

/// Control flow handed back to the read loop after each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Commands that must run inside the shell process itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Cd(Option<String>),
    Exit,
}

impl Builtin {
    /// Recognize a built-in. Only a lone command qualifies; inside a
    /// pipeline `cd` and `exit` are looked up like any other program.
    pub fn parse(command: &ParsedCommand) -> Option<Self> {
        if command.stages.len() != 1 {
            return None;
        }
        let stage = &command.stages[0];
        match stage.name() {
            "cd" => Some(Builtin::Cd(stage.args().get(1).cloned())),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }

    pub fn execute(&self, session: &mut Session) -> Result<Flow> {
        match self {
            Builtin::Exit => Ok(Flow::Exit),
            Builtin::Cd(dir) => {
                change_directory(dir.as_deref(), session)?;
                Ok(Flow::Continue)
            }
        }
    }
}

/// Move the session to `dir`, or to the home directory when omitted (`/`
/// when there is no home). On any failure the session directory is left as
/// it was.
fn change_directory(dir: Option<&str>, session: &mut Session) -> Result<()> {
    let target = match dir {
        Some(dir) => dir.to_string(),
        None => session
            .home()
            .map(|home| home.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("/")),
    };

    let fail = |reason: &str| ShellError::Cd {
        dir: target.clone(),
        reason: reason.to_string(),
    };

    let path = session.resolve_path(&target);
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => fail("no such file or directory"),
        ErrorKind::PermissionDenied => fail("permission denied"),
        _ => fail(&e.to_string()),
    })?;
    if !metadata.is_dir() {
        return Err(fail("not a directory"));
    }
    if access(&path, AccessFlags::X_OK).is_err() {
        return Err(fail("permission denied"));
    }

    let resolved = path.canonicalize().map_err(|e| fail(&e.to_string()))?;
    let handle = open_directory(&resolved).map_err(|e| fail(&e.to_string()))?;
    debug!(from = %session.cwd().display(), to = %resolved.display(), "cd");
    session.set_cwd(resolved, handle);
    Ok(())
}
