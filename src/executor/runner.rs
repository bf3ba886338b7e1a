use crate::communicator::{CommunicatorFactory, ExecutionRequest};
use crate::config::NormalizedConfig;
use crate::error::ExecutionError;
use crate::ui::Ui;

/// Runs a normalized configuration once through a fresh communicator.
pub struct CommandRunner<'a> {
    factory: &'a dyn CommunicatorFactory,
}

impl<'a> CommandRunner<'a> {
    pub fn new(factory: &'a dyn CommunicatorFactory) -> Self {
        Self { factory }
    }

    pub async fn execute(&self, config: &NormalizedConfig, ui: &dyn Ui) -> Result<(), ExecutionError> {
        let comm = self.factory.create(&config.execute_command, &config.context);
        let request = ExecutionRequest::new(config.command.clone());

        ui.say(&format!("Executing local command: {}", request.command));
        if config.debug {
            ui.message(&format!("Execute command: {:?}", config.execute_command));
        }

        let outcome = comm.start(&request, ui).await;
        let result = match outcome {
            Ok(result) if result.started => result,
            Ok(_) => {
                tracing::warn!(command = %request.command, communicator = comm.name(), "command did not start");
                return Err(ExecutionError::StartFailure {
                    command: request.command,
                    source: None,
                });
            }
            Err(e) => {
                tracing::warn!(command = %request.command, communicator = comm.name(), error = %e, "failed to start command");
                return Err(ExecutionError::StartFailure {
                    command: request.command,
                    source: Some(e),
                });
            }
        };

        if result.exit_status != 0 {
            tracing::warn!(command = %request.command, exit_status = result.exit_status, "command exited non-zero");
            return Err(ExecutionError::NonZeroExit {
                command: request.command,
                exit_status: result.exit_status,
            });
        }

        tracing::info!(command = %request.command, "command succeeded");
        Ok(())
    }
}
