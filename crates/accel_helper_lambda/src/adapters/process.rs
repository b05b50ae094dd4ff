use std::path::{Path, PathBuf};
use std::process::Command;

use accel_helper_core::HelperError;
use serde_json::json;

use crate::logging::{log_error, log_info};

/// Flags whose following argument must never reach the logs.
const SECRET_FLAGS: &[&str] = &["-k"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program and arguments with secret flag values masked.
    pub fn redacted_command_line(&self) -> Vec<String> {
        let mut line = Vec::with_capacity(self.args.len() + 1);
        line.push(self.program.clone());
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                line.push("***".to_string());
            } else {
                line.push(arg.clone());
            }
            mask_next = SECRET_FLAGS.contains(&arg.as_str());
        }
        line
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one external program to completion.
///
/// `Err` means the program could not be started or awaited; a non-zero exit
/// is reported through [`CommandOutput`].
pub trait CommandRunner {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, HelperError>;
}

/// Blocking runner over `std::process`. No timeout is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, HelperError> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .output()
            .map_err(|source| HelperError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: normalize_lines(&output.stdout),
            stderr: normalize_lines(&output.stderr),
        })
    }
}

/// Runs one required step. A non-zero exit fails with `failure_message`
/// followed by the captured stdout and stderr.
pub fn run_step(
    runner: &dyn CommandRunner,
    invocation: &CommandInvocation,
    success_message: &str,
    failure_message: &str,
) -> Result<(), HelperError> {
    let command_line = invocation.redacted_command_line();
    log_info(
        "command_runner",
        "command_started",
        json!({ "command": command_line }),
    );

    let output = runner.run(invocation)?;
    if output.success() {
        log_info(
            "command_runner",
            "command_succeeded",
            json!({ "command": command_line, "message": success_message }),
        );
        return Ok(());
    }

    log_error(
        "command_runner",
        "command_failed",
        json!({
            "command": command_line,
            "exit_code": output.exit_code,
            "message": failure_message,
        }),
    );
    Err(HelperError::CommandFailed {
        message: failure_message.to_string(),
        output: format!("{}\n{}", output.stdout, output.stderr),
    })
}

/// Every captured line ends with `\n`, including the last one.
fn normalize_lines(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut normalized = String::with_capacity(text.len() + 1);
    for line in text.lines() {
        normalized.push_str(line);
        normalized.push('\n');
    }
    normalized
}


#[cfg(test)]
mod tests {
    use super::testing::{failed_output, ScriptedRunner};
    use super::*;

    fn shell(script: &str, working_dir: &Path) -> CommandInvocation {
        CommandInvocation::new("sh", working_dir).args(["-c", script])
    }

    #[test]
    fn system_runner_captures_both_streams_and_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = SystemCommandRunner
            .run(&shell("echo out; echo err >&2; exit 3", dir.path()))
            .expect("sh should start");

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.success());
    }

    #[test]
    fn system_runner_uses_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "x").expect("write marker");

        let output = SystemCommandRunner
            .run(&shell("ls", dir.path()))
            .expect("sh should start");

        assert!(output.success());
        assert!(output.stdout.contains("marker.txt"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let invocation = CommandInvocation::new("/nonexistent/quickstart.sh", dir.path());

        let error = SystemCommandRunner
            .run(&invocation)
            .expect_err("spawn should fail");
        assert!(matches!(error, HelperError::Spawn { .. }));
    }

    #[test]
    fn failed_step_reports_message_and_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = "echo partial; echo 'Permission denied' >&2; exit 1";
        let error = run_step(
            &SystemCommandRunner,
            &shell(script, dir.path()),
            "chmod u+x ossutil64 success",
            "chmod u+x ossutil64 error",
        )
        .expect_err("step should fail");

        let text = error.to_string();
        assert!(text.contains("chmod u+x ossutil64 error"));
        assert!(text.contains("partial"));
        assert!(text.contains("Permission denied"));
    }

    #[test]
    fn failed_step_orders_stdout_before_stderr() {
        let runner = ScriptedRunner::with_outputs(vec![failed_output("out\n", "err\n")]);
        let invocation = CommandInvocation::new("cp", "/tmp/");

        let error = run_step(&runner, &invocation, "ok", "cp error").expect_err("step fails");
        assert_eq!(error.to_string(), "cp error, Output:out\n\nerr\n");
    }

    #[test]
    fn secret_values_are_masked_in_command_line() {
        let args = [
            "mb",
            "oss://b/",
            "-e",
            "oss.example.com",
            "-i",
            "id",
            "-k",
            "secret",
        ];
        let invocation = CommandInvocation::new("/tmp/ossutil64", "/tmp/").args(args);

        let line = invocation.redacted_command_line().join(" ");
        assert_eq!(
            line,
            "/tmp/ossutil64 mb oss://b/ -e oss.example.com -i id -k ***"
        );
    }
}
