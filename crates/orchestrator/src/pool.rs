// crates/orchestrator/src/pool.rs
//! Worker pool - bounded concurrent execution of one sweep

use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use vigil_common::{
    FailureKind, ProbeKind, ProbeOutcome, ProbeRequest, ProbeStatus, Prober, VigilError,
};

use crate::collector::ResultCollector;

/// Aborts the wrapped task when dropped (no-op once it has finished).
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one request to completion and fold every result into an outcome.
///
/// The probe body runs in its own task so a panic stays local and the task
/// can be aborted once `request.timeout` has passed. Never fails.
pub async fn execute(prober: Option<Arc<dyn Prober>>, request: ProbeRequest) -> ProbeOutcome {
    let start = Instant::now();
    let target = request.target.clone();
    let kind = request.kind;
    let deadline = request.timeout;

    let prober = match prober {
        Some(p) => p,
        None => {
            let status = ProbeStatus::failure(
                FailureKind::Internal,
                format!("no prober registered for {}", kind),
            );
            return ProbeOutcome::new(target, kind, status, start.elapsed());
        }
    };

    let mut handle = tokio::spawn(async move { prober.probe(&request).await });
    let _guard = AbortOnDrop(handle.abort_handle());

    let status = match timeout(deadline, &mut handle).await {
        Ok(Ok(Ok(payload))) => ProbeStatus::success(payload),
        Ok(Ok(Err(e))) => match e.failure_kind() {
            Some(failure) => ProbeStatus::failure(failure, e.to_string()),
            None => ProbeStatus::Timeout,
        },
        Ok(Err(join_err)) => {
            warn!(target = %target, "probe task failed: {}", join_err);
            ProbeStatus::failure(FailureKind::Internal, "probe task panicked")
        }
        Err(_) => {
            handle.abort();
            ProbeStatus::Timeout
        }
    };

    ProbeOutcome::new(target, kind, status, start.elapsed())
}

/// Worker tasks of one `run`, aborted if the run is dropped early.
struct Workers(Vec<JoinHandle<()>>);

impl Drop for Workers {
    fn drop(&mut self) {
        for w in &self.0 {
            w.abort();
        }
    }
}

/// Fixed-size pool of workers pulling requests from a shared FIFO queue.
///
/// The pool is reusable: every `run` spawns its own workers and returns
/// once all of them have drained the queue.
#[derive(Clone, Default)]
pub struct WorkerPool {
    probers: HashMap<ProbeKind, Arc<dyn Prober>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probers(probers: impl IntoIterator<Item = Arc<dyn Prober>>) -> Self {
        let mut pool = Self::new();
        for p in probers {
            pool.add_prober(p);
        }
        pool
    }

    /// Register a prober for the kind it reports. Replaces an earlier one.
    pub fn add_prober(&mut self, prober: Arc<dyn Prober>) {
        debug!(kind = %prober.kind(), name = prober.name(), "registering prober");
        self.probers.insert(prober.kind(), prober);
    }

    pub fn prober(&self, kind: ProbeKind) -> Option<Arc<dyn Prober>> {
        self.probers.get(&kind).cloned()
    }

    /// Execute `requests` with at most `concurrency` probes in flight.
    ///
    /// Outcomes are handed to `collector` in completion order and returned
    /// in that same order. Exactly one outcome is produced per request.
    pub async fn run(
        &self,
        requests: Vec<ProbeRequest>,
        concurrency: usize,
        collector: &ResultCollector,
    ) -> Result<Vec<ProbeOutcome>> {
        let run = self
            .run_until(requests, concurrency, collector, std::future::pending::<()>())
            .await?;
        Ok(run.outcomes)
    }

    /// Like `run`, but stops dispatching once `shutdown` resolves.
    ///
    /// Probes still in flight are abandoned. Every probe that already
    /// finished is recorded before this returns.
    #[instrument(skip_all, fields(requests = requests.len(), concurrency = concurrency))]
    pub async fn run_until<F>(
        &self,
        requests: Vec<ProbeRequest>,
        concurrency: usize,
        collector: &ResultCollector,
        shutdown: F,
    ) -> Result<SweepRun>
    where
        F: Future<Output = ()>,
    {
        if concurrency == 0 {
            return Err(VigilError::Config("concurrency must be at least 1".to_string()).into());
        }

        let total = requests.len();
        if total == 0 {
            debug!("empty sweep, nothing to dispatch");
            return Ok(SweepRun::default());
        }

        let probers = Arc::new(self.probers.clone());
        let queue = Arc::new(Mutex::new(VecDeque::from(requests)));
        let (tx, mut rx) = mpsc::unbounded_channel::<ProbeOutcome>();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let worker_count = concurrency.min(total);
        let mut workers = Workers(Vec::with_capacity(worker_count));
        for worker_id in 0..worker_count {
            let queue = queue.clone();
            let probers = probers.clone();
            let tx = tx.clone();
            let mut cancel = cancel_rx.clone();

            workers.0.push(tokio::spawn(async move {
                loop {
                    if *cancel.borrow() {
                        break;
                    }
                    let next = queue.lock().await.pop_front();
                    let request = match next {
                        Some(r) => r,
                        None => break, // queue empty, exit worker
                    };

                    trace!(worker_id, target = %request.target, "dispatching");
                    let prober = probers.get(&request.kind).cloned();
                    // a probe that has already finished wins over cancellation
                    let outcome = tokio::select! {
                        biased;
                        outcome = execute(prober, request) => outcome,
                        _ = cancel.changed() => break,
                    };
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        // Only the workers hold senders now; the channel closes when they exit.
        drop(tx);

        tokio::pin!(shutdown);
        let mut interrupted = false;
        let mut outcomes = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(outcome) => {
                        collector.record(&outcome).await;
                        outcomes.push(outcome);
                    }
                    None => break,
                },
                _ = &mut shutdown, if !interrupted => {
                    warn!(completed = outcomes.len(), "sweep interrupted, abandoning in-flight probes");
                    interrupted = true;
                    let _ = cancel_tx.send(true);
                }
            }
        }

        for w in workers.0.drain(..) {
            w.await?;
        }

        debug!(completed = outcomes.len(), interrupted, "sweep drained");
        Ok(SweepRun {
            outcomes,
            interrupted,
        })
    }
}

/// Outcomes of one pool run, in completion order.
#[derive(Debug, Default)]
pub struct SweepRun {
    pub outcomes: Vec<ProbeOutcome>,
    /// The run was stopped before every request was dispatched.
    pub interrupted: bool,
}
