//! Running external commands and capturing their output.
//!
//! The daemon CLI and the platform firewall tooling are driven through
//! [`CommandRunner`] so tests can substitute scripted output.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Best single-line explanation of a failure: stderr, else stdout, else
    /// the exit code.
    pub fn message(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        if !text.is_empty() {
            return text.lines().last().unwrap_or(text).trim().to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by a signal".to_string(),
        }
    }
}

/// Runs a program to completion.
///
/// Blocking; async callers go through `tokio::task::spawn_blocking`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandOutput> {
        debug!(program = %program.display(), ?args, "Running command");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Runner that replays queued outputs and records every invocation as
    /// `program arg1 arg2 ...`.
    #[derive(Default)]
    pub struct ScriptedRunner {
        outputs: Mutex<VecDeque<io::Result<CommandOutput>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn then(self, output: CommandOutput) -> Self {
            self.outputs.lock().unwrap().push_back(Ok(output));
            self
        }

        pub fn then_spawn_error(self, kind: io::ErrorKind) -> Self {
            self.outputs
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "spawn failed")));
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandOutput> {
            let mut call = vec![program.display().to_string()];
            call.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
            self.calls.lock().unwrap().push(call);
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::success("")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_last_stderr_line() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "progress".into(),
            stderr: "pulling manifest\nError: model not found\n".into(),
        };
        assert_eq!(output.message(), "Error: model not found");
    }

    #[test]
    fn test_message_falls_back_to_exit_code() {
        assert_eq!(CommandOutput::failure(3, "").message(), "exited with code 3");
        let killed = CommandOutput {
            code: None,
            ..CommandOutput::default()
        };
        assert_eq!(killed.message(), "terminated by a signal");
        assert!(!killed.is_success());
    }

    #[test]
    #[cfg(unix)]
    fn test_system_runner_captures_output() {
        let output = SystemCommandRunner
            .run(Path::new("sh"), &["-c".into(), "echo out; echo err >&2; exit 2".into()])
            .unwrap();
        assert_eq!(output.code, Some(2));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let result = SystemCommandRunner.run(Path::new("modelkeep-no-such-program"), &[]);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
