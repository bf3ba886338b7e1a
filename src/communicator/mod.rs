pub mod local;
pub mod stub;

pub use local::{LocalCommunicator, LocalCommunicatorFactory};
pub use stub::{StubCommunicator, StubCommunicatorFactory, StubOutcome};

use crate::error::CommunicatorError;
use crate::template::TemplateContext;
use crate::ui::Ui;
use async_trait::async_trait;

/// A command to run through a communicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub command: String,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Terminal status reported by a communicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_status: i32,
    pub started: bool,
}

impl ExecutionResult {
    pub fn exited(exit_status: i32) -> Self {
        Self {
            exit_status,
            started: true,
        }
    }

    pub fn success(&self) -> bool {
        self.started && self.exit_status == 0
    }
}

/// Capability to start a command, stream its output and report its status.
///
/// Local processes and remote sessions are both valid implementations.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Communicator name (e.g., "local", "stub")
    fn name(&self) -> &str;

    /// Run `request` to completion, streaming stdout to `Ui::message` and
    /// stderr to `Ui::error`. An `Err` means the command never started.
    async fn start(
        &self,
        request: &ExecutionRequest,
        ui: &dyn Ui,
    ) -> Result<ExecutionResult, CommunicatorError>;
}

/// Builds one communicator per provisioning run.
pub trait CommunicatorFactory: Send + Sync {
    fn create(&self, execute_command: &[String], context: &TemplateContext) -> Box<dyn Communicator>;
}
