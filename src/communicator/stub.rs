use crate::communicator::{Communicator, CommunicatorFactory, ExecutionRequest, ExecutionResult};
use crate::error::CommunicatorError;
use crate::template::TemplateContext;
use crate::ui::Ui;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted outcome of a stub run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOutcome {
    /// The command "runs" and exits with this status.
    Exit(i32),
    /// The command cannot be started.
    StartFailure(String),
}

/// Communicator that never spawns anything; it replays a scripted outcome.
pub struct StubCommunicator {
    outcome: StubOutcome,
    stdout: Vec<String>,
    started: Arc<Mutex<Vec<String>>>,
}

impl StubCommunicator {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            stdout: Vec::new(),
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Commands this stub has been asked to start.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Communicator for StubCommunicator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn start(
        &self,
        request: &ExecutionRequest,
        ui: &dyn Ui,
    ) -> Result<ExecutionResult, CommunicatorError> {
        if let Ok(mut started) = self.started.lock() {
            started.push(request.command.clone());
        }

        match &self.outcome {
            StubOutcome::StartFailure(reason) => Err(CommunicatorError::Other(reason.clone())),
            StubOutcome::Exit(code) => {
                for line in &self.stdout {
                    ui.message(line);
                }
                Ok(ExecutionResult::exited(*code))
            }
        }
    }
}

/// Hands out [`StubCommunicator`]s sharing one record of what was created and started.
pub struct StubCommunicatorFactory {
    outcome: StubOutcome,
    stdout: Vec<String>,
    created: Mutex<Vec<Vec<String>>>,
    started: Arc<Mutex<Vec<String>>>,
}

impl StubCommunicatorFactory {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            stdout: Vec::new(),
            created: Mutex::new(Vec::new()),
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn exiting(code: i32) -> Self {
        Self::new(StubOutcome::Exit(code))
    }

    pub fn failing_to_start(reason: &str) -> Self {
        Self::new(StubOutcome::StartFailure(reason.to_string()))
    }

    /// Lines every created communicator writes to `Ui::message` before exiting.
    pub fn with_stdout(mut self, lines: &[&str]) -> Self {
        self.stdout = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Execute templates passed to `create`, one entry per communicator.
    pub fn created(&self) -> Vec<Vec<String>> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commands started across all communicators from this factory.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl CommunicatorFactory for StubCommunicatorFactory {
    fn create(&self, execute_command: &[String], _context: &TemplateContext) -> Box<dyn Communicator> {
        if let Ok(mut created) = self.created.lock() {
            created.push(execute_command.to_vec());
        }

        Box::new(StubCommunicator {
            outcome: self.outcome.clone(),
            stdout: self.stdout.clone(),
            started: Arc::clone(&self.started),
        })
    }
}
