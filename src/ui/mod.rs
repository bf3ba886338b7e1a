pub mod console;
pub mod memory;

pub use console::ConsoleUi;
pub use memory::{MemoryUi, UiLevel};

/// Sink for human-readable progress and command output.
///
/// Implementations must swallow display failures; nothing written to a
/// sink can fail a provisioning step.
pub trait Ui: Send + Sync {
    /// Announce a step (e.g. the command about to run).
    fn say(&self, message: &str);

    /// Informational line, including streamed stdout.
    fn message(&self, message: &str);

    /// Error line, including streamed stderr.
    fn error(&self, message: &str);
}
