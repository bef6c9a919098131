//! Command runner abstraction for executing external tools.
//!
//! `CommandRunner` is the trait that store backends use to execute system
//! commands. `ProcessRunner` is the production implementation that spawns the
//! program directly (no shell) and checks its exit status. `MockRunner` is the
//! test double that records calls and returns preset responses.

use std::cell::RefCell;
use std::process::Command;

use tracing::debug;

use crate::error::RunError;

/// Trait for executing a command given as an argument vector.
///
/// Returns captured stdout on a zero exit status.
pub trait CommandRunner {
    fn run(&self, argv: &[String]) -> Result<String, RunError>;
}

/// Production runner that spawns `argv[0]` with the remaining arguments.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<String, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
        debug!(command = %argv.join(" "), "spawning");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| RunError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(RunError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

/// Test-double runner that records commands and returns pre-configured responses.
pub struct MockRunner {
    responses: RefCell<Vec<Result<String, RunError>>>,
    commands: RefCell<Vec<Vec<String>>>,
    /// Called with each argv before its response is returned, to stand in
    /// for side effects such as the tool writing a file.
    hook: Option<Box<dyn Fn(&[String])>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<String, RunError>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            commands: RefCell::new(Vec::new()),
            hook: None,
        }
    }

    /// Run `hook` on every command before answering it.
    pub fn on_run(mut self, hook: impl Fn(&[String]) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn executed_commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }

    /// Recorded commands joined with spaces, for compact assertions.
    pub fn executed_lines(&self) -> Vec<String> {
        self.commands.borrow().iter().map(|c| c.join(" ")).collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, argv: &[String]) -> Result<String, RunError> {
        self.commands.borrow_mut().push(argv.to_vec());
        if let Some(hook) = &self.hook {
            hook(argv);
        }
        let mut responses = self.responses.borrow_mut();
        if let Some(response) = responses.pop() {
            response
        } else {
            Ok(String::new())
        }
    }
}
