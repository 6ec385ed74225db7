// crates/probes/src/ping.rs
//! ICMP echo probe backed by the platform `ping` utility

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use vigil_common::{Payload, ProbeError, ProbeKind, ProbeParams, ProbeRequest, Prober};

/// Platform ping spelling, resolved once per process.
pub static PING_CAPABILITY: Lazy<PingCapability> = Lazy::new(PingCapability::detect);

static LATENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"time\s*[=<]\s*([\d.]+)\s*ms").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineUnit {
    Seconds,
    Millis,
}

/// How to spell "send N echoes and wait at most T" for the local `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingCapability {
    pub program: &'static str,
    pub count_flag: &'static str,
    pub deadline_flag: &'static str,
    pub deadline_unit: DeadlineUnit,
}

impl PingCapability {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self {
                program: "ping",
                count_flag: "-n",
                deadline_flag: "-w",
                deadline_unit: DeadlineUnit::Millis,
            }
        } else if cfg!(target_os = "macos") {
            Self {
                program: "ping",
                count_flag: "-c",
                deadline_flag: "-t",
                deadline_unit: DeadlineUnit::Seconds,
            }
        } else {
            Self {
                program: "ping",
                count_flag: "-c",
                deadline_flag: "-W",
                deadline_unit: DeadlineUnit::Seconds,
            }
        }
    }

    /// Argument vector for one ping invocation.
    pub fn args(&self, host: &str, count: u8, deadline: Duration) -> Vec<String> {
        let deadline = match self.deadline_unit {
            // round up so ping never gives up before the wall-clock deadline
            DeadlineUnit::Seconds => ((deadline.as_millis() + 999) / 1000).max(1),
            DeadlineUnit::Millis => deadline.as_millis().max(1),
        };
        vec![
            self.count_flag.to_string(),
            count.to_string(),
            self.deadline_flag.to_string(),
            deadline.to_string(),
            host.to_string(),
        ]
    }
}

/// Extract the round-trip latency from ping output.
///
/// Returns `None` when no `time=<n>ms` or `time<<n>ms` field is present.
pub fn parse_latency(output: &str) -> Option<f64> {
    LATENCY_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub struct PingProbe {
    program: String,
}

impl PingProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable than the detected `ping`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self {
            program: PING_CAPABILITY.program.to_string(),
        }
    }
}

#[async_trait]
impl Prober for PingProbe {
    #[instrument(skip(self, request), fields(target = %request.target))]
    async fn probe(&self, request: &ProbeRequest) -> Result<Payload, ProbeError> {
        let host = request.target.as_str();
        if host.starts_with('-') {
            return Err(ProbeError::Transport(format!("invalid host '{}'", host)));
        }

        let count = match request.params {
            ProbeParams::Ping { count } => count.clamp(1, 2),
            _ => 1,
        };
        let args = PING_CAPABILITY.args(host, count, request.timeout);

        // The subprocess is killed if the caller drops us at its deadline.
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::Transport(format!("failed to launch {}: {}", self.program, e)))?;

        if !output.status.success() {
            debug!(status = ?output.status.code(), "ping reported no reply");
            return Err(ProbeError::Transport("host unreachable".to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let latency = parse_latency(&stdout);
        if latency.is_none() {
            debug!("reply received but latency not found in output");
        }
        Ok(Payload::Latency(latency))
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Ping
    }

    fn name(&self) -> &str {
        "ICMP Ping Probe"
    }
}
