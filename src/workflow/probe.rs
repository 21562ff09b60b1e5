//! Connection probes against a target

use std::ops::RangeInclusive;
use std::time::Duration;

use tracing::info;

use super::stage::{AtStage, FailureKind, Stage, WorkflowError};
use super::{finish, Workflow};
use crate::ssh::{
    AuthMethodUsed, ExecOutput, RemoteCommand, CONNECTION_TEST_MARKER, EXISTS_MARKER,
    NOT_EXISTS_MARKER,
};
use crate::state::TargetRef;

/// Accepted timeout for [`Workflow::execute`], in seconds
pub const EXECUTE_TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 5..=300;

impl Workflow {
    /// Open a session and run a trivial echo through it
    pub async fn test_connection(&self, target: TargetRef) -> Result<AuthMethodUsed, WorkflowError> {
        let descriptor = self.descriptor(target)?;
        let (mut session, method) = self.open(&descriptor).await?;

        let command = RemoteCommand::connection_test();
        let result = match self.run(session.as_mut(), Stage::RunCommand, &command).await {
            Ok(output) if output.stdout_lossy().trim() == CONNECTION_TEST_MARKER => Ok(()),
            Ok(output) => Err(WorkflowError::new(
                Stage::RunCommand,
                FailureKind::Remote {
                    command: command.summary().to_string(),
                    reason: format!("unexpected output {:?}", output.stdout_lossy().trim()),
                },
            )),
            Err(e) => Err(e),
        };
        finish(session, result).await?;

        info!("Connection test to {} passed via {}", descriptor.address(), method);
        Ok(method)
    }

    /// Whether a regular file exists at `path`
    pub async fn check_remote_file(
        &self,
        target: TargetRef,
        path: &str,
    ) -> Result<bool, WorkflowError> {
        let descriptor = self.descriptor(target)?;
        let (mut session, _) = self.open(&descriptor).await?;

        let command = RemoteCommand::exists(path);
        let result = self
            .run(session.as_mut(), Stage::RunCommand, &command)
            .await
            .and_then(|output| match output.stdout_lossy().trim() {
                EXISTS_MARKER => Ok(true),
                NOT_EXISTS_MARKER => Ok(false),
                other => Err(FailureKind::Remote {
                    command: command.summary().to_string(),
                    reason: format!("unexpected output {:?}", other),
                })
                .at(Stage::RunCommand),
            });

        finish(session, result).await
    }

    /// Run an arbitrary command; a non-zero exit is returned, not raised
    ///
    /// `timeout_secs` is clamped to [`EXECUTE_TIMEOUT_RANGE_SECS`].
    pub async fn execute(
        &self,
        target: TargetRef,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ExecOutput, WorkflowError> {
        let timeout = Duration::from_secs(timeout_secs.clamp(
            *EXECUTE_TIMEOUT_RANGE_SECS.start(),
            *EXECUTE_TIMEOUT_RANGE_SECS.end(),
        ));

        let descriptor = self.descriptor(target)?;
        let (mut session, _) = self.open(&descriptor).await?;

        info!(
            "Executing `{}` on {} (timeout {}s)",
            RemoteCommand::raw(command).summary(),
            descriptor.address(),
            timeout.as_secs()
        );

        let result = session.run(command, timeout).await.at(Stage::RunCommand);
        finish(session, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded_workflow, MockReply, MockTransport};
    use crate::workflow::ErrorCategory;

    const SERVER: TargetRef = TargetRef::Server { server_id: 1 };

    #[tokio::test]
    async fn test_connection_ok() {
        let transport = MockTransport::new()
            .reply("echo", MockReply::stdout("Connection test successful\n"));
        let (workflow, _store) = seeded_workflow(&transport);

        let method = workflow.test_connection(SERVER).await.unwrap();
        assert_eq!(method, AuthMethodUsed::Password);
        assert_eq!(transport.commands(), vec!["echo 'Connection test successful'"]);
        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test]
    async fn test_connection_wrong_output() {
        let transport = MockTransport::new().reply("echo", MockReply::stdout("motd banner\n"));
        let (workflow, _store) = seeded_workflow(&transport);

        let err = workflow.test_connection(SERVER).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test]
    async fn test_check_remote_file() {
        let transport = MockTransport::new()
            .reply("test -f '/etc/XrayR/config.yml'", MockReply::stdout("EXISTS\n"))
            .reply("test -f", MockReply::stdout("NOT_EXISTS\n"));
        let (workflow, _store) = seeded_workflow(&transport);

        assert!(workflow.check_remote_file(SERVER, "/etc/XrayR/config.yml").await.unwrap());
        assert!(!workflow.check_remote_file(SERVER, "/etc/XrayR/missing.yml").await.unwrap());
        assert_eq!(transport.closes(), 2);
    }

    #[tokio::test]
    async fn test_check_remote_file_stderr() {
        let transport = MockTransport::new().reply(
            "test -f",
            MockReply::Output(ExecOutput {
                stdout: b"NOT_EXISTS\n".to_vec(),
                stderr: "sh: permission denied".to_string(),
                exit_code: Some(0),
            }),
        );
        let (workflow, _store) = seeded_workflow(&transport);

        let err = workflow.check_remote_file(SERVER, "/x").await.unwrap_err();
        assert!(matches!(err.kind, FailureKind::Remote { .. }));
    }

    #[tokio::test]
    async fn test_execute_returns_nonzero_exit() {
        let transport =
            MockTransport::new().reply("systemctl", MockReply::exit(3, "inactive"));
        let (workflow, _store) = seeded_workflow(&transport);

        let output = workflow
            .execute(SERVER, "systemctl is-active XrayR", 1)
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr, "inactive");
        assert_eq!(transport.closes(), 1);
        // Raised to the lower bound
        assert_eq!(transport.timeouts(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_execute_timeout_retryable() {
        let transport = MockTransport::new().reply("sleep", MockReply::Timeout);
        let (workflow, _store) = seeded_workflow(&transport);

        let err = workflow.execute(SERVER, "sleep 999", 999).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(transport.closes(), 1);
        // Capped at the upper bound
        assert_eq!(transport.timeouts(), vec![Duration::from_secs(300)]);
    }

    #[tokio::test]
    async fn test_execute_keeps_timeout_in_range() {
        let transport = MockTransport::new();
        let (workflow, _store) = seeded_workflow(&transport);

        workflow.execute(SERVER, "uptime", 45).await.unwrap();
        assert_eq!(transport.timeouts(), vec![Duration::from_secs(45)]);
    }

    #[tokio::test]
    async fn test_missing_server() {
        let transport = MockTransport::new();
        let (workflow, _store) = seeded_workflow(&transport);

        let err = workflow
            .test_connection(TargetRef::Server { server_id: 5 })
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::ResolveTarget);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
