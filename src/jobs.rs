use std::collections::HashMap;

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

use crate::launcher::exit_code;

#[derive(Debug)]
pub struct Job {
    pub id: u32,
    pub pids: Vec<Pid>,
    pub command: String,
    pub status: Option<i32>,
}

impl Job {
    /// Completion notice printed before the next prompt.
    pub fn done_line(&self) -> String {
        match self.status {
            Some(code) => format!("[{}] Done    {} (exit: {})", self.id, self.command, code),
            None => format!("[{}] Done    {}", self.id, self.command),
        }
    }
}

/// Background pipelines the shell started but never waited for.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<u32, Job>,
    next_id: u32,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, pids: Vec<Pid>, command: String) -> u32 {
        if self.jobs.is_empty() {
            self.next_id = 1;
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;

        self.jobs.insert(
            id,
            Job {
                id,
                pids,
                command,
                status: None,
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Collect every background child that has exited, without blocking.
    /// Returns the jobs whose processes are all gone, in id order.
    pub fn reap(&mut self) -> Vec<Job> {
        let mut finished = Vec::new();

        for (id, job) in self.jobs.iter_mut() {
            let last = job.pids.last().copied();
            job.pids.retain(|&pid| match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => true,
                Ok(status) => {
                    debug!(%pid, ?status, "background child finished");
                    if Some(pid) == last {
                        job.status = exit_code(status);
                    }
                    false
                }
                Err(_) => false,
            });
            if job.pids.is_empty() {
                finished.push(*id);
            }
        }

        let mut done: Vec<Job> = finished
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect();
        done.sort_by_key(|j| j.id);
        done
    }
}
