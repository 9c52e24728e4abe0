//! Task actions: the opaque work a task performs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::task::TaskId;

/// Error raised by a task action
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Command ran and exited unsuccessfully
    #[error("command `{command}` {}", exit_summary(.code, .stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Command could not be started
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Action-specific failure
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    /// Create a failure with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

fn exit_summary(code: &Option<i32>, stderr: &str) -> String {
    let status = match *code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    };
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => format!("{}: {}", status, last.trim()),
        None => status,
    }
}

/// The work performed by a task
pub trait TaskAction: Send + Sync {
    /// Perform the work
    fn run(&self, ctx: &BuildContext) -> Result<(), ActionError>;

    /// Short description for progress output
    fn describe(&self) -> String {
        "<action>".to_string()
    }
}

impl<F> TaskAction for F
where
    F: Fn(&BuildContext) -> Result<(), ActionError> + Send + Sync,
{
    fn run(&self, ctx: &BuildContext) -> Result<(), ActionError> {
        self(ctx)
    }
}

/// Action that succeeds without doing anything; used for aggregate targets
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl TaskAction for NoopAction {
    fn run(&self, _ctx: &BuildContext) -> Result<(), ActionError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "<no command>".to_string()
    }
}

/// Runs a command line through the platform shell
#[derive(Debug, Clone)]
pub struct ShellAction {
    task: TaskId,
    command: String,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ShellAction {
    /// Create a shell action for a task
    pub fn new(task: impl Into<TaskId>, command: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            command: command.into(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory, relative to the project root
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl TaskAction for ShellAction {
    fn run(&self, ctx: &BuildContext) -> Result<(), ActionError> {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        let shell_arg = if cfg!(windows) { "/C" } else { "-c" };

        let cwd = match &self.cwd {
            Some(dir) => ctx.resolve(dir),
            None => ctx.root_dir().to_path_buf(),
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(&self.command).current_dir(&cwd);

        for (k, v) in ctx.to_env(&self.task) {
            cmd.env(k, v);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(task = %self.task, command = %self.command, cwd = %cwd.display(), "running command");
        let output = cmd.output().map_err(|e| ActionError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(task = %self.task, "{}", line);
        }
        for line in stderr.lines() {
            warn!(task = %self.task, "{}", line);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(ActionError::CommandFailed {
                command: self.command.clone(),
                code: output.status.code(),
                stderr: stderr.to_string(),
            })
        }
    }

    fn describe(&self) -> String {
        self.command.clone()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_action_success() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(temp.path());
        let action = ShellAction::new("compile", "true");
        assert!(action.run(&ctx).is_ok());
        assert_eq!(action.describe(), "true");
    }

    #[test]
    fn test_shell_action_failure_reports_code_and_stderr() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(temp.path());
        let action = ShellAction::new("compile", "echo 'error CS1002' >&2; exit 3");

        let err = action.run(&ctx).unwrap_err();
        match &err {
            ActionError::CommandFailed { code, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert!(stderr.contains("CS1002"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("exited with code 3: error CS1002"));
    }

    #[test]
    fn test_shell_action_exports_context() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(temp.path()).with_variable("version", "1.2.3");
        let action = ShellAction::new("pack", "echo \"$GANTRY_TASK $GANTRY_VERSION $EXTRA\" > out.txt")
            .with_env("EXTRA", "yes");

        action.run(&ctx).unwrap();
        let written = std::fs::read_to_string(temp.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "pack 1.2.3 yes");
    }

    #[test]
    fn test_shell_action_cwd() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        let ctx = BuildContext::new(temp.path());
        let action = ShellAction::new("touch", "touch marker").with_cwd("src");

        action.run(&ctx).unwrap();
        assert!(temp.path().join("src").join("marker").exists());
    }

    #[test]
    fn test_spawn_failure() {
        let ctx = BuildContext::new("/definitely/not/a/dir");
        let err = ShellAction::new("x", "true").run(&ctx).unwrap_err();
        assert!(matches!(err, ActionError::Spawn { .. }));
    }

    #[test]
    fn test_noop_action() {
        let ctx = BuildContext::new("/tmp");
        assert!(NoopAction.run(&ctx).is_ok());
    }
}
