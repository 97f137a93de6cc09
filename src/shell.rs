use std::io::{self, BufRead, Write};

use colored::Colorize;
use crossterm::tty::IsTty;
use tracing::{debug, warn};

use crate::builtin::{Builtin, Flow};
use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::parser::ParsedCommand;
use crate::pipes::{self, Outcome};
use crate::prompt::Prompt;
use crate::session::Session;

/// Interpret one raw line against `session`.
///
/// Every error is reported on stderr here and the loop carries on; only
/// the `exit` built-in asks it to stop.
pub fn interpret(line: &str, session: &mut Session) -> Flow {
    let command = ParsedCommand::parse(line);
    if command.is_blank() {
        return Flow::Continue;
    }

    let result = match command.validate() {
        Err(e) => Err(ShellError::from(e)),
        Ok(()) => match Builtin::parse(&command) {
            Some(builtin) => builtin.execute(session).map(|flow| {
                session.last_status = 0;
                flow
            }),
            None => pipes::run(&command, session).map(|outcome| {
                session.last_status = match outcome {
                    Outcome::Finished(status) => status,
                    Outcome::Empty | Outcome::Background { .. } => 0,
                };
                Flow::Continue
            }),
        },
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, line, "command failed");
        report(&e);
        session.last_status = failure_status(&e);
        Flow::Continue
    })
}

fn report(error: &ShellError) {
    eprintln!("{}", format!("pipesh: {}", error).red());
}

/// Status recorded for a line that failed before anything ran.
pub fn failure_status(error: &ShellError) -> i32 {
    match error {
        ShellError::Syntax(_) => 2,
        _ => 1,
    }
}

/// The read loop: prompt, read a line, interpret it, repeat until EOF or
/// `exit`.
pub struct Shell {
    prompt: Prompt,
    session: Session,
    interactive: bool,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            prompt: Prompt::new(config.prompt.clone()),
            session: Session::new(config),
            interactive: io::stdin().is_tty(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Interpret a single line, as for `pipesh -c`.
    pub fn run_line(&mut self, line: &str) -> Flow {
        interpret(line, &mut self.session)
    }

    /// Run until end of input or `exit`. Returns the shell's exit status.
    pub fn run(&mut self) -> io::Result<i32> {
        if self.interactive {
            // Ctrl-C should reach the foreground program, not end the shell.
            // SAFETY: installing SIG_IGN runs no code in signal context.
            unsafe {
                libc::signal(libc::SIGINT, libc::SIG_IGN);
            }
        }

        let stdin = io::stdin();
        let mut line = String::new();

        loop {
            self.report_finished_jobs();

            if self.interactive {
                print!("{}", self.prompt.get_string(self.session.cwd()));
                io::stdout().flush()?;
            }

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                if self.interactive {
                    println!();
                }
                debug!("end of input");
                return Ok(0);
            }

            if interpret(&line, &mut self.session) == Flow::Exit {
                return Ok(0);
            }
        }
    }

    fn report_finished_jobs(&mut self) {
        for job in self.session.jobs.reap() {
            println!("{}", job.done_line());
        }
    }
}
