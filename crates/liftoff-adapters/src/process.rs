//! Subprocess execution shared by the adapters

use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Flags whose following argument is never logged
const SECRET_FLAGS: &[&str] = &["--password", "--token"];

/// Where the child's stdout/stderr go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Pipe, capture and mirror to tracing
    #[default]
    Capture,
    /// Share the parent's terminal
    Inherit,
}

/// A command line for an external tool
#[derive(Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    output_mode: OutputMode,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            output_mode: OutputMode::default(),
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line with secrets replaced, safe for logs and errors
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());

        let mut redact_next = false;
        for arg in &self.args {
            if redact_next {
                parts.push("****".to_string());
                redact_next = false;
                continue;
            }

            if let Some((flag, _)) = arg.split_once('=') {
                if SECRET_FLAGS.contains(&flag) {
                    parts.push(format!("{}=****", flag));
                    continue;
                }
            }

            redact_next = SECRET_FLAGS.contains(&arg.as_str());
            parts.push(arg.clone());
        }

        parts.join(" ")
    }

    /// Spawn the command and wait for it to finish
    pub async fn run(&self) -> std::io::Result<CommandOutput> {
        let start = Instant::now();
        debug!(command = %self.display(), "running command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        let (stdout, stderr, status) = match self.output_mode {
            OutputMode::Inherit => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await?;
                (String::new(), String::new(), status)
            }
            OutputMode::Capture => {
                let mut child = cmd
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()?;

                let program = self.program.as_str();
                let (stdout, stderr) = tokio::join!(
                    drain(child.stdout.take(), program, false),
                    drain(child.stderr.take(), program, true),
                );
                let status = child.wait().await?;
                (stdout, stderr, status)
            }
        };

        let output = CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            duration: start.elapsed(),
        };
        debug!(
            command = %self.display(),
            exit_code = ?output.exit_code,
            duration_ms = output.duration.as_millis() as u64,
            "command finished"
        );
        Ok(output)
    }
}

impl fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCommand")
            .field("command", &self.display())
            .field("output_mode", &self.output_mode)
            .finish()
    }
}

/// Read a child stream to EOF, mirroring each line to tracing.
///
/// Bytes that are not UTF-8 are replaced rather than ending the read, so the
/// child never sees its pipe close early.
async fn drain<R>(stream: Option<R>, program: &str, is_stderr: bool) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return String::new();
    };

    let mut captured = String::new();
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\r', '\n']);
                if is_stderr {
                    warn!("[{}] {}", program, line);
                } else {
                    debug!("[{}] {}", program, line);
                }
                captured.push_str(line);
                captured.push('\n');
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(program, error = %e, "reading child output failed");
                break;
            }
        }
    }
    captured
}

/// Outcome of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout (empty when inherited)
    pub stdout: String,
    /// Captured stderr (empty when inherited)
    pub stderr: String,
    /// Wall clock time
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_password() {
        let cmd = ToolCommand::new("appc").args([
            "login",
            "--username",
            "ci@example.com",
            "--password",
            "hunter2",
            "--token=abc",
        ]);
        let shown = cmd.display();
        assert_eq!(
            shown,
            "appc login --username ci@example.com --password **** --token=****"
        );
        assert!(!format!("{:?}", cmd).contains("hunter2"));
    }

    #[test]
    fn test_display_without_args() {
        assert_eq!(ToolCommand::new("appium").display(), "appium");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run()
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_keeps_reading_past_invalid_utf8() {
        let output = ToolCommand::new("sh")
            .args(["-c", "printf 'BUILD \\377\\n'; sleep 0.2; echo after; echo done"])
            .run()
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "BUILD \u{FFFD}\nafter\ndone\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_handles_crlf_and_missing_final_newline() {
        let output = ToolCommand::new("sh")
            .args(["-c", "printf 'one\\r\\ntwo'"])
            .run()
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_sets_env() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo $LIFTOFF_TEST_VALUE"])
            .env("LIFTOFF_TEST_VALUE", "hello")
            .run()
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "hello
");
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = ToolCommand::new("liftoff-definitely-not-a-real-program")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
