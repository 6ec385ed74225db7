//! Core data types for the Vigil prober
//!
//! Requests are built once per target per sweep and consumed by exactly one
//! probe; outcomes are immutable once produced. Fields are `pub` so the pool
//! and the collector can read them without accessor noise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Default number of simultaneously running probes per sweep.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default per-probe timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opaque identifier of what to probe: a host, an IP or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which operation a probe performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Ping,
    #[serde(alias = "fetch", alias = "http")]
    HttpFetch,
    #[serde(alias = "exec", alias = "ssh")]
    RemoteExec,
}

impl ProbeKind {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
            ProbeKind::HttpFetch => "fetch",
            ProbeKind::RemoteExec => "exec",
        }
    }

    /// Human readable sweep title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "Parallel Ping",
            ProbeKind::HttpFetch => "Parallel URL Fetch",
            ProbeKind::RemoteExec => "Parallel Remote Exec",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login material for remote execution. Opaque to the prober core.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub user: String,
    pub key_file: Option<PathBuf>,
}

impl RemoteCredentials {
    #[must_use]
    pub fn new<S: Into<String>>(user: S) -> Self {
        Self {
            user: user.into(),
            key_file: None,
        }
    }

    #[must_use]
    pub fn with_key_file<P: Into<PathBuf>>(mut self, key_file: P) -> Self {
        self.key_file = Some(key_file.into());
        self
    }
}

// Credentials end up in tracing spans through request Debug output.
impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("user", &"<redacted>")
            .field("key_file", &self.key_file.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Kind-specific request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProbeParams {
    #[default]
    None,
    /// Number of echo requests for a ping probe (1 or 2).
    Ping { count: u8 },
    RemoteExec {
        command: String,
        credentials: RemoteCredentials,
    },
}

/// One unit of work handed to a prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub target: Target,
    pub kind: ProbeKind,
    pub timeout: Duration,
    pub params: ProbeParams,
}

impl ProbeRequest {
    #[inline]
    #[must_use]
    pub fn new(target: Target, kind: ProbeKind, timeout: Duration) -> Self {
        Self {
            target,
            kind,
            timeout,
            params: ProbeParams::None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: ProbeParams) -> Self {
        self.params = params;
        self
    }
}

/// What a successful probe reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// Round-trip latency in milliseconds, `None` when the reply could not be parsed.
    Latency(Option<f64>),
    /// HTTP status code.
    Status(u16),
    /// Trimmed standard output of the remote command.
    Output(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Latency(Some(ms)) => write!(f, "{} ms", ms),
            Payload::Latency(None) => f.write_str("? ms"),
            Payload::Status(code) => write!(f, "{}", code),
            Payload::Output(out) => f.write_str(out),
        }
    }
}

/// Failure categories of a probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Protocol,
    Auth,
    /// The probe task panicked or no prober handles the request kind.
    Internal,
}

impl FailureKind {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Protocol => "protocol",
            FailureKind::Auth => "auth",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of probe results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProbeStatus {
    Success { payload: Payload },
    Failure { kind: FailureKind, message: String },
    Timeout,
}

impl ProbeStatus {
    #[inline]
    #[must_use]
    pub fn success(payload: Payload) -> Self {
        ProbeStatus::Success { payload }
    }

    #[inline]
    #[must_use]
    pub fn failure<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        ProbeStatus::Failure {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            ProbeStatus::Success { .. } => "success",
            ProbeStatus::Failure { .. } => "failure",
            ProbeStatus::Timeout => "timeout",
        }
    }
}

/// Result of executing one `ProbeRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub target: Target,
    pub kind: ProbeKind,
    pub status: ProbeStatus,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

impl ProbeOutcome {
    #[inline]
    #[must_use]
    pub fn new(target: Target, kind: ProbeKind, status: ProbeStatus, elapsed: Duration) -> Self {
        Self {
            target,
            kind,
            status,
            elapsed,
            finished_at: Utc::now(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, ProbeStatus::Success { .. })
    }

    #[inline]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, ProbeStatus::Failure { .. })
    }

    #[inline]
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.status, ProbeStatus::Timeout)
    }
}

/// Probe tuning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub concurrency: usize,
    pub ping_count: u8,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            ping_count: 1,
        }
    }
}

impl ProbeOptions {
    /// Fast preset: short timeout, more workers.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            concurrency: 16,
            ping_count: 1,
        }
    }

    /// Accurate preset: long timeout, two echoes, fewer workers.
    #[must_use]
    pub fn accurate() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            concurrency: 3,
            ping_count: 2,
        }
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "fast" => Some(Self::fast()),
            "balanced" => Some(Self::default()),
            "accurate" => Some(Self::accurate()),
            _ => None,
        }
    }
}

/// An ordered submission of targets sharing one kind, one timeout and one concurrency cap.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub kind: ProbeKind,
    pub targets: Vec<Target>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub params: ProbeParams,
}

impl SweepPlan {
    #[must_use]
    pub fn new(kind: ProbeKind, targets: Vec<Target>) -> Self {
        Self {
            kind,
            targets,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            params: ProbeParams::None,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ProbeParams) -> Self {
        self.params = params;
        self
    }

    /// Apply timeout, concurrency and ping count from a preset.
    #[must_use]
    pub fn with_options(mut self, options: &ProbeOptions) -> Self {
        self.timeout = options.timeout;
        self.concurrency = options.concurrency;
        if self.kind == ProbeKind::Ping {
            self.params = ProbeParams::Ping {
                count: options.ping_count,
            };
        }
        self
    }

    /// One request per target, in submission order.
    #[must_use]
    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.targets
            .iter()
            .map(|t| {
                ProbeRequest::new(t.clone(), self.kind, self.timeout).with_params(self.params.clone())
            })
            .collect()
    }
}

/// Ordered sequence of sweeps run one after another.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub sweeps: Vec<SweepPlan>,
}

impl Campaign {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            sweeps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sweep(mut self, sweep: SweepPlan) -> Self {
        self.sweeps.push(sweep);
        self
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.sweeps.iter().map(|s| s.targets.len()).sum()
    }
}

impl Default for Campaign {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-sweep counters collected incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    /// Mean of the parsed ping latencies, if any were parsed.
    pub average_latency_ms: Option<f64>,
    #[serde(skip)]
    latency_samples: usize,
    /// Wall-clock duration of the sweep.
    pub elapsed: Duration,
}

impl SweepStats {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.timed_out
    }

    /// Success percentage in [0.0, 100.0].
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    pub fn update(&mut self, outcome: &ProbeOutcome) {
        match &outcome.status {
            ProbeStatus::Success { payload } => {
                self.succeeded += 1;
                if let Payload::Latency(Some(ms)) = payload {
                    self.latency_samples += 1;
                    let n = self.latency_samples as f64;
                    let avg = self.average_latency_ms.unwrap_or(0.0);
                    self.average_latency_ms = Some(avg + (ms - avg) / n);
                }
            }
            ProbeStatus::Failure { kind, .. } => {
                self.failed += 1;
                *self.failures_by_kind.entry(*kind).or_insert(0) += 1;
            }
            ProbeStatus::Timeout => self.timed_out += 1,
        }
    }

    /// Fold another sweep's counters into this one.
    pub fn merge(&mut self, other: &SweepStats) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        for (kind, count) in &other.failures_by_kind {
            *self.failures_by_kind.entry(*kind).or_insert(0) += count;
        }
        if let Some(other_avg) = other.average_latency_ms {
            let total = self.latency_samples + other.latency_samples;
            let mine = self.average_latency_ms.unwrap_or(0.0) * self.latency_samples as f64;
            let theirs = other_avg * other.latency_samples as f64;
            if total > 0 {
                self.average_latency_ms = Some((mine + theirs) / total as f64);
            }
            self.latency_samples = total;
        }
        self.elapsed += other.elapsed;
    }
}

/// Outcomes and statistics of one finished (or interrupted) sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub kind: ProbeKind,
    pub outcomes: Vec<ProbeOutcome>,
    pub stats: SweepStats,
}

/// Aggregated result of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub id: Uuid,
    pub sweeps: Vec<SweepReport>,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl CampaignReport {
    /// Statistics over every sweep of the campaign.
    #[must_use]
    pub fn totals(&self) -> SweepStats {
        let mut totals = SweepStats::default();
        for sweep in &self.sweeps {
            totals.merge(&sweep.stats);
        }
        totals.elapsed = self.elapsed;
        totals
    }
}
