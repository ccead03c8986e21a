//! Scripted [`ChildProcess`] and [`Launcher`] doubles.
//!
//! A scripted child reports itself alive for a fixed number of polls, can
//! drop files on disk at spawn time or on a given poll, and replays a queue of
//! output lines (optionally ending in a read error). Every terminate and wait
//! call is appended to a log shared with the launcher so tests can assert on
//! reaping order across phases.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::InitError;
use crate::process::{ChildProcess, ExitState, Invocation, Launcher};

/// Lifecycle call observed on a scripted child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildCall {
    Terminate(&'static str),
    Wait(&'static str),
}

type CallLog = Arc<Mutex<Vec<ChildCall>>>;

#[derive(Debug)]
enum Line {
    Text(String),
    Fail(io::ErrorKind),
}

/// A child whose behaviour is fixed up front.
#[derive(Debug)]
pub struct ScriptedChild {
    label: &'static str,
    program: PathBuf,
    alive_polls: u32,
    polls: u32,
    terminated: bool,
    exit: ExitState,
    observed_exit: Option<ExitState>,
    lines: VecDeque<Line>,
    spawn_files: Vec<(PathBuf, String)>,
    poll_files: Vec<(u32, PathBuf)>,
    calls: CallLog,
}

impl ScriptedChild {
    /// A child labelled `label` that exits with code zero.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            program: PathBuf::new(),
            alive_polls: 0,
            polls: 0,
            terminated: false,
            exit: ExitState::Code(0),
            observed_exit: None,
            lines: VecDeque::new(),
            spawn_files: Vec::new(),
            poll_files: Vec::new(),
            calls: CallLog::default(),
        }
    }

    /// Reports alive for the first `polls` liveness checks.
    #[must_use]
    pub const fn alive_for(mut self, polls: u32) -> Self {
        self.alive_polls = polls;
        self
    }

    /// Exit state returned by `wait`.
    #[must_use]
    pub const fn exits_with(mut self, state: ExitState) -> Self {
        self.exit = state;
        self
    }

    /// Queues output lines.
    #[must_use]
    pub fn prints<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .extend(lines.into_iter().map(|line| Line::Text(line.into())));
        self
    }

    /// Makes the next read after the queued lines fail.
    #[must_use]
    pub fn fails_reading(mut self, kind: io::ErrorKind) -> Self {
        self.lines.push_back(Line::Fail(kind));
        self
    }

    /// Writes `content` to `path` when spawned; relative paths resolve
    /// against the invocation's working directory.
    #[must_use]
    pub fn writes_on_spawn(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.spawn_files.push((path.into(), content.into()));
        self
    }

    /// Creates `path` during liveness check number `poll`, counting from one.
    #[must_use]
    pub fn writes_on_poll(mut self, poll: u32, path: impl Into<PathBuf>) -> Self {
        self.poll_files.push((poll, path.into()));
        self
    }

    fn materialise_spawn_files(&self, working_dir: Option<&Path>) {
        for (path, content) in &self.spawn_files {
            let target = match working_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            };
            fs::write(&target, content).expect("write scripted spawn file");
        }
    }

    fn monitor_error(&self, kind: io::ErrorKind) -> InitError {
        InitError::Monitor {
            program: self.program.clone(),
            source: io::Error::new(kind, "scripted failure"),
        }
    }
}

impl ChildProcess for ScriptedChild {
    fn program(&self) -> &Path {
        &self.program
    }

    fn id(&self) -> Option<u32> {
        None
    }

    fn is_alive(&mut self) -> Result<bool, InitError> {
        self.polls += 1;
        for (poll, path) in &self.poll_files {
            if *poll == self.polls {
                fs::write(path, "").expect("write scripted poll file");
            }
        }
        let alive = !self.terminated && self.polls <= self.alive_polls;
        if !alive && self.observed_exit.is_none() {
            self.observed_exit = Some(self.exit);
        }
        Ok(alive)
    }

    fn exit_state(&self) -> Option<ExitState> {
        self.observed_exit
    }

    fn next_output_line(&mut self) -> Result<Option<String>, InitError> {
        match self.lines.pop_front() {
            Some(Line::Text(line)) => Ok(Some(line)),
            Some(Line::Fail(kind)) => Err(self.monitor_error(kind)),
            None => Ok(None),
        }
    }

    fn terminate(&mut self) -> Result<(), InitError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(ChildCall::Terminate(self.label));
        self.terminated = true;
        Ok(())
    }

    fn wait(&mut self) -> Result<ExitState, InitError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(ChildCall::Wait(self.label));
        self.observed_exit = Some(self.exit);
        Ok(self.exit)
    }
}

/// Hands out queued scripted children in order and records invocations.
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    children: Mutex<VecDeque<ScriptedChild>>,
    invocations: Mutex<Vec<Invocation>>,
    calls: CallLog,
}

impl ScriptedLauncher {
    /// Creates a launcher with the given children queued.
    #[must_use]
    pub fn with_children(children: impl IntoIterator<Item = ScriptedChild>) -> Self {
        let launcher = Self::default();
        for child in children {
            launcher.push(child);
        }
        launcher
    }

    /// Queues another child.
    pub fn push(&self, mut child: ScriptedChild) {
        child.calls = Arc::clone(&self.calls);
        self.children
            .lock()
            .expect("children mutex poisoned")
            .push_back(child);
    }

    /// Every invocation spawned so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .expect("invocations mutex poisoned")
            .clone()
    }

    /// Terminate and wait calls across all children, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ChildCall> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    /// Calls made on the child labelled `label`.
    #[must_use]
    pub fn calls_for(&self, label: &'static str) -> Vec<ChildCall> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                ChildCall::Terminate(owner) | ChildCall::Wait(owner) => *owner == label,
            })
            .collect()
    }
}

impl Launcher for ScriptedLauncher {
    type Child = ScriptedChild;

    fn spawn(&self, invocation: &Invocation) -> Result<Self::Child, InitError> {
        self.invocations
            .lock()
            .expect("invocations mutex poisoned")
            .push(invocation.clone());
        let next = self
            .children
            .lock()
            .expect("children mutex poisoned")
            .pop_front();
        let Some(mut child) = next else {
            return Err(InitError::Spawn {
                program: invocation.program().to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no scripted child queued"),
            });
        };
        child.program = invocation.program().to_path_buf();
        child.materialise_spawn_files(invocation.working_dir());
        Ok(child)
    }
}
