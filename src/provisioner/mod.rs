use crate::communicator::CommunicatorFactory;
use crate::config::{decode, normalize, NormalizedConfig, Platform};
use crate::error::{ProvisionError, Result};
use crate::executor::CommandRunner;
use crate::ui::Ui;
use serde_json::Value;

/// Lifecycle of one provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerState {
    Unconfigured,
    Prepared,
    Running,
    Succeeded,
    Failed,
}

impl ProvisionerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerState::Unconfigured => "unconfigured",
            ProvisionerState::Prepared => "prepared",
            ProvisionerState::Running => "running",
            ProvisionerState::Succeeded => "succeeded",
            ProvisionerState::Failed => "failed",
        }
    }
}

/// Shell-local provisioner: runs one command on the machine hosting the build.
pub struct Provisioner {
    platform: Platform,
    state: ProvisionerState,
    config: Option<NormalizedConfig>,
}

impl Provisioner {
    pub fn new() -> Self {
        Self::for_platform(Platform::current())
    }

    /// Provisioner choosing default templates for `platform` instead of the host.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            state: ProvisionerState::Unconfigured,
            config: None,
        }
    }

    pub fn state(&self) -> ProvisionerState {
        self.state
    }

    /// Normalized configuration, once `prepare` has succeeded.
    pub fn config(&self) -> Option<&NormalizedConfig> {
        self.config.as_ref()
    }

    /// Decode and validate `raws` (base blob first, overrides after).
    ///
    /// A rejected configuration leaves the provisioner unconfigured so the
    /// caller can fix the input and try again.
    pub fn prepare(&mut self, raws: &[Value]) -> Result<()> {
        self.expect_state(ProvisionerState::Unconfigured)?;

        let config = decode(raws)?;
        let normalized = normalize(config, self.platform)?;

        self.config = Some(normalized);
        self.state = ProvisionerState::Prepared;
        Ok(())
    }

    /// Run the prepared command exactly once and report its outcome.
    pub async fn provision(&mut self, ui: &dyn Ui, factory: &dyn CommunicatorFactory) -> Result<()> {
        self.expect_state(ProvisionerState::Prepared)?;
        let config = self.config.as_ref().ok_or(ProvisionError::InvalidState {
            state: ProvisionerState::Unconfigured.as_str(),
            expected: ProvisionerState::Prepared.as_str(),
        })?;

        self.state = ProvisionerState::Running;
        let outcome = CommandRunner::new(factory).execute(config, ui).await;

        self.state = match outcome {
            Ok(()) => ProvisionerState::Succeeded,
            Err(_) => ProvisionerState::Failed,
        };
        outcome.map_err(ProvisionError::from)
    }

    /// Advisory only. A running command is not interrupted from here; the
    /// communicator owns the process and ends it when its run is dropped.
    pub fn cancel(&self) {
        tracing::debug!(state = self.state.as_str(), "cancel requested");
    }

    fn expect_state(&self, expected: ProvisionerState) -> Result<()> {
        if self.state != expected {
            return Err(ProvisionError::InvalidState {
                state: self.state.as_str(),
                expected: expected.as_str(),
            });
        }
        Ok(())
    }
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new()
    }
}
