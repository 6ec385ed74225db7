//! Result collection and streaming output

use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use vigil_common::{
    Payload, ProbeKind, ProbeOutcome, ProbeStatus, SweepReport, SweepStats,
};

pub const SUCCESS_MARKER: &str = "✅";
pub const FAILURE_MARKER: &str = "❌";
pub const TIMEOUT_MARKER: &str = "⏰";

struct SweepInProgress {
    kind: ProbeKind,
    outcomes: Vec<ProbeOutcome>,
    stats: SweepStats,
    started: Instant,
}

impl SweepInProgress {
    fn report(&self) -> SweepReport {
        let mut stats = self.stats.clone();
        stats.elapsed = self.started.elapsed();
        SweepReport {
            kind: self.kind,
            outcomes: self.outcomes.clone(),
            stats,
        }
    }
}

struct CollectorState {
    sink: Option<Box<dyn Write + Send>>,
    current: Option<SweepInProgress>,
    finished: Vec<SweepReport>,
}

impl CollectorState {
    fn emit(&mut self, text: &str) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = writeln!(sink, "{}", text).and_then(|_| sink.flush()) {
                warn!("failed to write report line: {}", e);
            }
        }
    }
}

/// Receives probe outcomes as they complete.
///
/// Every outcome is rendered as one line the moment it arrives and kept
/// for the sweep summary. One collector lives for one campaign.
pub struct ResultCollector {
    state: Mutex<CollectorState>,
}

impl ResultCollector {
    /// Stream lines to stdout.
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    /// Accumulate only; nothing is printed.
    pub fn quiet() -> Self {
        Self::build(None)
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::build(Some(Box::new(writer)))
    }

    fn build(sink: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            state: Mutex::new(CollectorState {
                sink,
                current: None,
                finished: Vec::new(),
            }),
        }
    }

    pub async fn begin_sweep(&self, kind: ProbeKind, total: usize) {
        let mut state = self.state.lock().await;
        if let Some(unfinished) = state.current.take() {
            warn!(kind = %unfinished.kind, "previous sweep was never closed");
            let report = unfinished.report();
            state.finished.push(report);
        }
        state.emit(&render_header(kind, total));
        state.current = Some(SweepInProgress {
            kind,
            outcomes: Vec::with_capacity(total),
            stats: SweepStats::new(total),
            started: Instant::now(),
        });
    }

    pub async fn record(&self, outcome: &ProbeOutcome) {
        let mut state = self.state.lock().await;
        state.emit(&render_line(outcome));
        match state.current.as_mut() {
            Some(sweep) => {
                sweep.stats.update(outcome);
                sweep.outcomes.push(outcome.clone());
            }
            None => warn!(target = %outcome.target, "outcome recorded outside of a sweep"),
        }
    }

    /// Close the current sweep, print its summary and return its report.
    pub async fn end_sweep(&self) -> Option<SweepReport> {
        let mut state = self.state.lock().await;
        let report = state.current.take()?.report();
        state.emit(&render_summary(&report));

        info!(
            kind = %report.kind,
            total = report.stats.total,
            succeeded = report.stats.succeeded,
            failed = report.stats.failed,
            timed_out = report.stats.timed_out,
            "sweep finished"
        );
        state.finished.push(report.clone());
        Some(report)
    }

    /// Finished sweeps plus whatever the running sweep has collected so far.
    pub async fn snapshot(&self) -> Vec<SweepReport> {
        let state = self.state.lock().await;
        let mut reports = state.finished.clone();
        if let Some(current) = state.current.as_ref() {
            reports.push(current.report());
        }
        reports
    }
}

/// One report line: `<marker> <target> <detail>`.
pub fn render_line(outcome: &ProbeOutcome) -> String {
    match &outcome.status {
        ProbeStatus::Success { payload } => {
            let detail = match payload {
                Payload::Latency(_) => format!("reachable ({})", payload),
                Payload::Status(_) => format!("→ {}", payload),
                Payload::Output(out) => format!("→ {}", single_line(out)),
            };
            format!("{} {} {}", SUCCESS_MARKER, outcome.target, detail)
        }
        ProbeStatus::Failure { kind, message } => {
            format!("{} {} [{}] {}", FAILURE_MARKER, outcome.target, kind, single_line(message))
        }
        ProbeStatus::Timeout => format!(
            "{} {} timed out after {}",
            TIMEOUT_MARKER,
            outcome.target,
            format_duration(outcome.elapsed)
        ),
    }
}

/// First non-empty line of `text`, with a `(+N lines)` suffix for the rest.
fn single_line(text: &str) -> String {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next().unwrap_or_default();
    match lines.count() {
        0 => first.to_string(),
        rest => format!("{} (+{} lines)", first, rest),
    }
}

pub fn render_header(kind: ProbeKind, total: usize) -> String {
    format!("\n{} ({} targets)\n{:─<40}", kind.title(), total, "")
}

pub fn render_summary(report: &SweepReport) -> String {
    let stats = &report.stats;
    let mut line = format!(
        "📊 {}: {} probed, {} {} ok, {} {} failed",
        report.kind,
        stats.completed(),
        SUCCESS_MARKER,
        stats.succeeded,
        FAILURE_MARKER,
        stats.failed
    );
    if !stats.failures_by_kind.is_empty() {
        let parts: Vec<String> = stats
            .failures_by_kind
            .iter()
            .map(|(k, n)| format!("{}: {}", k, n))
            .collect();
        line.push_str(&format!(" ({})", parts.join(", ")));
    }
    line.push_str(&format!(
        ", {} {} timed out in {}",
        TIMEOUT_MARKER,
        stats.timed_out,
        format_duration(stats.elapsed)
    ));
    if let Some(avg) = stats.average_latency_ms {
        line.push_str(&format!(", avg latency {:.1} ms", avg));
    }
    line
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use vigil_common::{FailureKind, Target};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn outcome(target: &str, kind: ProbeKind, status: ProbeStatus) -> ProbeOutcome {
        ProbeOutcome::new(Target::new(target), kind, status, Duration::from_millis(1500))
    }

    #[test]
    fn test_render_lines() {
        let ok = outcome("8.8.8.8", ProbeKind::Ping, ProbeStatus::success(Payload::Latency(Some(12.4))));
        assert_eq!(render_line(&ok), "✅ 8.8.8.8 reachable (12.4 ms)");

        let unknown = outcome("1.1.1.1", ProbeKind::Ping, ProbeStatus::success(Payload::Latency(None)));
        assert_eq!(render_line(&unknown), "✅ 1.1.1.1 reachable (? ms)");

        let fetched = outcome("https://example.com", ProbeKind::HttpFetch, ProbeStatus::success(Payload::Status(200)));
        assert_eq!(render_line(&fetched), "✅ https://example.com → 200");

        let failed = outcome(
            "https://000.invalid",
            ProbeKind::HttpFetch,
            ProbeStatus::failure(FailureKind::Transport, "dns error"),
        );
        assert_eq!(render_line(&failed), "❌ https://000.invalid [transport] dns error");

        let slow = outcome("10.255.255.1", ProbeKind::Ping, ProbeStatus::Timeout);
        assert_eq!(render_line(&slow), "⏰ 10.255.255.1 timed out after 1.500s");
    }

    #[test]
    fn test_multi_line_output_stays_on_one_line() {
        let df = outcome(
            "web1",
            ProbeKind::RemoteExec,
            ProbeStatus::success(Payload::Output("Filesystem Size\r\n/dev/sda1 20G\n\ntmpfs 1G".into())),
        );
        let line = render_line(&df);
        assert_eq!(line.lines().count(), 1);
        assert_eq!(line, "✅ web1 → Filesystem Size (+2 lines)");

        let single = outcome("web2", ProbeKind::RemoteExec, ProbeStatus::success(Payload::Output("web2".into())));
        assert_eq!(render_line(&single), "✅ web2 → web2");

        let failed = outcome(
            "web3",
            ProbeKind::RemoteExec,
            ProbeStatus::failure(FailureKind::Protocol, "first\nsecond"),
        );
        assert_eq!(render_line(&failed).lines().count(), 1);
    }

    #[tokio::test]
    async fn test_collector_streams_and_summarises() {
        let buf = SharedBuf::default();
        let collector = ResultCollector::with_writer(buf.clone());

        collector.begin_sweep(ProbeKind::Ping, 2).await;
        collector
            .record(&outcome("8.8.8.8", ProbeKind::Ping, ProbeStatus::success(Payload::Latency(Some(5.0)))))
            .await;
        // line is visible before the sweep ends
        assert!(buf.text().contains("✅ 8.8.8.8 reachable (5 ms)"));

        collector
            .record(&outcome("10.255.255.1", ProbeKind::Ping, ProbeStatus::Timeout))
            .await;
        let report = collector.end_sweep().await.unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.timed_out, 1);
        let text = buf.text();
        assert!(text.contains("Parallel Ping (2 targets)"));
        assert!(text.contains("📊 ping: 2 probed"));
    }

    #[tokio::test]
    async fn test_snapshot_includes_running_sweep() {
        let collector = ResultCollector::quiet();
        collector.begin_sweep(ProbeKind::HttpFetch, 1).await;
        collector
            .record(&outcome("https://a", ProbeKind::HttpFetch, ProbeStatus::success(Payload::Status(204))))
            .await;
        collector.end_sweep().await;

        collector.begin_sweep(ProbeKind::Ping, 3).await;
        collector
            .record(&outcome("h1", ProbeKind::Ping, ProbeStatus::Timeout))
            .await;

        let snap = collector.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[1].kind, ProbeKind::Ping);
        assert_eq!(snap[1].stats.completed(), 1);
        assert_eq!(snap[1].stats.total, 3);
    }

    #[tokio::test]
    async fn test_end_without_begin() {
        let collector = ResultCollector::quiet();
        assert!(collector.end_sweep().await.is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_millis(5500)), "5.500s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
    }
}
