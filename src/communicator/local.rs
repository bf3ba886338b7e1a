use crate::communicator::{Communicator, CommunicatorFactory, ExecutionRequest, ExecutionResult};
use crate::error::CommunicatorError;
use crate::template::TemplateContext;
use crate::ui::Ui;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Runs commands as child processes of this host.
pub struct LocalCommunicator {
    execute_command: Vec<String>,
    context: TemplateContext,
}

impl LocalCommunicator {
    pub fn new(execute_command: Vec<String>, context: TemplateContext) -> Self {
        Self {
            execute_command,
            context,
        }
    }

    /// Render the execute template with `.Command` bound to `command`.
    pub fn argv(&self, command: &str) -> Result<Vec<String>, CommunicatorError> {
        let ctx = self.context.with_data("Command", command);
        let argv = self
            .execute_command
            .iter()
            .map(|arg| ctx.render(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match argv.first() {
            Some(program) if !program.is_empty() => Ok(argv),
            _ => Err(CommunicatorError::EmptyProgram),
        }
    }
}

#[async_trait]
impl Communicator for LocalCommunicator {
    fn name(&self) -> &str {
        "local"
    }

    async fn start(
        &self,
        request: &ExecutionRequest,
        ui: &dyn Ui,
    ) -> Result<ExecutionResult, CommunicatorError> {
        let argv = self.argv(&request.command)?;
        let (program, args) = (&argv[0], &argv[1..]);

        tracing::debug!(%program, ?args, "spawning local command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommunicatorError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Output errors never abort the wait; the exit status is what counts
        let (_, _, status) = futures::join!(
            forward_lines(stdout, "stdout", |line| ui.message(line)),
            forward_lines(stderr, "stderr", |line| ui.error(line)),
            child.wait(),
        );
        let status = status?;

        let exit_status = exit_code(status);
        tracing::debug!(exit_status, "local command finished");

        Ok(ExecutionResult::exited(exit_status))
    }
}

/// Forward every line of `reader` to `sink` until EOF. Invalid UTF-8 is
/// replaced, and a read error ends forwarding for this stream only.
async fn forward_lines<R, F>(reader: Option<R>, stream: &str, sink: F)
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let Some(reader) = reader else {
        return;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf);
                sink(&*line);
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "failed to read command output");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Creates a [`LocalCommunicator`] per provisioning run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCommunicatorFactory;

impl LocalCommunicatorFactory {
    pub fn new() -> Self {
        Self
    }
}

impl CommunicatorFactory for LocalCommunicatorFactory {
    fn create(&self, execute_command: &[String], context: &TemplateContext) -> Box<dyn Communicator> {
        Box::new(LocalCommunicator::new(execute_command.to_vec(), context.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_execute_command, Platform};
    use crate::ui::{MemoryUi, UiLevel};

    fn sh() -> LocalCommunicator {
        LocalCommunicator::new(default_execute_command(Platform::Unix), TemplateContext::new())
    }

    #[test]
    fn test_argv_substitutes_command_verbatim() {
        let argv = sh().argv("echo 'a b' ; ls").unwrap();
        assert_eq!(argv, vec!["/bin/sh", "-c", "echo 'a b' ; ls"]);
    }

    #[test]
    fn test_argv_renders_user_variables() {
        let mut ctx = TemplateContext::new();
        ctx.user_variables.insert("shell".to_string(), "/bin/bash".to_string());
        let comm = LocalCommunicator::new(
            vec!["{{user `shell`}}".to_string(), "-c".to_string(), "{{.Command}}".to_string()],
            ctx,
        );

        assert_eq!(comm.argv("pwd").unwrap(), vec!["/bin/bash", "-c", "pwd"]);
    }

    #[test]
    fn test_argv_rejects_empty_program() {
        let comm = LocalCommunicator::new(vec!["".to_string()], TemplateContext::new());
        assert!(matches!(comm.argv("ls"), Err(CommunicatorError::EmptyProgram)));

        let comm = LocalCommunicator::new(vec![], TemplateContext::new());
        assert!(matches!(comm.argv("ls"), Err(CommunicatorError::EmptyProgram)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streams_stdout_and_stderr() {
        let ui = MemoryUi::new();
        let result = sh()
            .start(&ExecutionRequest::new("echo out1; echo err1 >&2; echo out2"), &ui)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(ui.at(UiLevel::Message), vec!["out1", "out2"]);
        assert_eq!(ui.at(UiLevel::Error), vec!["err1"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_output_is_forwarded_lossily() {
        let ui = MemoryUi::new();
        let result = sh()
            .start(
                &ExecutionRequest::new("printf 'a\\377b\\n'; printf '\\376\\n' >&2; echo after; exit 0"),
                &ui,
            )
            .await
            .unwrap();

        assert_eq!(result, ExecutionResult::exited(0));
        assert_eq!(ui.at(UiLevel::Message), vec!["a\u{FFFD}b", "after"]);
        assert_eq!(ui.at(UiLevel::Error), vec!["\u{FFFD}"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_keeps_exit_status() {
        let ui = MemoryUi::new();
        let result = sh()
            .start(&ExecutionRequest::new("printf '\\377\\n'; exit 5"), &ui)
            .await
            .unwrap();

        assert!(result.started);
        assert_eq!(result.exit_status, 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_last_line_without_newline() {
        let ui = MemoryUi::new();
        sh().start(&ExecutionRequest::new("printf 'one\\r\\ntwo'"), &ui).await.unwrap();
        assert_eq!(ui.at(UiLevel::Message), vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reports_exit_status() {
        let ui = MemoryUi::new();
        let result = sh().start(&ExecutionRequest::new("exit 3"), &ui).await.unwrap();

        assert!(result.started);
        assert_eq!(result.exit_status, 3);
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_maps_to_128_plus_signal() {
        let ui = MemoryUi::new();
        let result = sh().start(&ExecutionRequest::new("kill -9 $$"), &ui).await.unwrap();
        assert_eq!(result.exit_status, 128 + 9);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let comm = LocalCommunicator::new(
            vec!["/nonexistent/shell".to_string(), "{{.Command}}".to_string()],
            TemplateContext::new(),
        );
        let ui = MemoryUi::new();

        let err = comm.start(&ExecutionRequest::new("ls"), &ui).await.unwrap_err();
        assert!(matches!(err, CommunicatorError::Spawn { .. }));
        assert!(ui.lines().is_empty());
    }
}
