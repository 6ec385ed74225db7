// crates/probes/src/remote.rs
//! Remote command probe over the system `ssh` client
//!
//! The session is non-interactive (`BatchMode=yes`): a host that would
//! prompt for a password or passphrase fails fast as an auth failure.
//! Credentials are only forwarded to `ssh` and never logged.

use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use vigil_common::{Payload, ProbeError, ProbeKind, ProbeParams, ProbeRequest, Prober, RemoteCredentials};

/// Exit status `ssh` uses for its own errors.
const SSH_ERROR_STATUS: i32 = 255;

const AUTH_MARKERS: &[&str] = &[
    "permission denied",
    "authentication failed",
    "too many authentication failures",
    "host key verification failed",
];

pub struct RemoteExecProbe {
    program: String,
}

impl RemoteExecProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different ssh executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Build the ssh argument vector for one command on one host.
    pub fn build_args(
        host: &str,
        command: &str,
        credentials: &RemoteCredentials,
        timeout: Duration,
    ) -> Vec<String> {
        let connect_secs = ((timeout.as_millis() + 999) / 1000).max(1);
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", connect_secs),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        if let Some(ref key) = credentials.key_file {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push("-l".to_string());
        args.push(credentials.user.clone());
        args.push("--".to_string());
        args.push(host.to_string());
        args.push(command.to_string());
        args
    }
}

impl Default for RemoteExecProbe {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
        }
    }
}

/// Turn a finished ssh process into a payload or a categorised error.
pub fn interpret_output(output: &Output) -> Result<Payload, ProbeError> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    match output.status.code() {
        Some(0) => Ok(Payload::Output(stdout)),
        Some(SSH_ERROR_STATUS) => {
            let lower = stderr.to_lowercase();
            let reason = first_line(&stderr, "ssh session failed");
            if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
                Err(ProbeError::Auth(reason))
            } else {
                Err(ProbeError::Transport(reason))
            }
        }
        Some(code) => Err(ProbeError::Protocol(format!(
            "command exited with status {}: {}",
            code,
            first_line(&stderr, "no error output")
        ))),
        None => Err(ProbeError::Transport("ssh terminated by signal".to_string())),
    }
}

fn first_line(text: &str, fallback: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[async_trait]
impl Prober for RemoteExecProbe {
    #[instrument(skip(self, request), fields(target = %request.target))]
    async fn probe(&self, request: &ProbeRequest) -> Result<Payload, ProbeError> {
        let (command, credentials) = match &request.params {
            ProbeParams::RemoteExec { command, credentials } => (command, credentials),
            _ => {
                return Err(ProbeError::Protocol(
                    "remote-exec request carries no command".to_string(),
                ))
            }
        };

        let host = request.target.as_str();
        let args = Self::build_args(host, command, credentials, request.timeout);
        debug!(command = %command, "opening ssh session");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::Transport(format!("failed to launch {}: {}", self.program, e)))?;

        interpret_output(&output)
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::RemoteExec
    }

    fn name(&self) -> &str {
        "SSH Remote Exec Probe"
    }
}
