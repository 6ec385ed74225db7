//! Scriptable prober shared by the pool and campaign tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use vigil_common::{
    Payload, ProbeError, ProbeKind, ProbeOutcome, ProbeRequest, ProbeStatus, Prober, Target,
};

#[derive(Debug, Clone)]
pub(crate) struct Dispatch {
    pub target: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Fake prober whose behaviour is chosen by the target name:
/// `fail*` errors, `panic*` panics, `hang*` never answers, `slow*` takes
/// ten times the base delay, `trip*` fires the trip wire just before it
/// succeeds, anything else succeeds after `delay`.
pub(crate) struct FakeProber {
    kind: ProbeKind,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    log: Arc<StdMutex<Vec<Dispatch>>>,
    trip: StdMutex<Option<oneshot::Sender<()>>>,
}

impl FakeProber {
    pub fn new(kind: ProbeKind, delay: Duration) -> Arc<Self> {
        Self::with_log(kind, delay, Arc::new(StdMutex::new(Vec::new())))
    }

    pub fn with_log(kind: ProbeKind, delay: Duration, log: Arc<StdMutex<Vec<Dispatch>>>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            log,
            trip: StdMutex::new(None),
        })
    }

    /// Fake prober plus a future that resolves when a `trip*` target finishes.
    pub fn with_trip_wire(kind: ProbeKind, delay: Duration) -> (Arc<Self>, impl std::future::Future<Output = ()>) {
        let (tx, rx) = oneshot::channel();
        let prober = Self::new(kind, delay);
        *prober.trip.lock().unwrap() = Some(tx);
        (prober, async move {
            let _ = rx.await;
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<Payload, ProbeError> {
        let started = Instant::now();
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        let name = request.target.as_str().to_string();
        let delay = if name.starts_with("hang") {
            Duration::from_secs(3600)
        } else if name.starts_with("slow") {
            self.delay * 10
        } else {
            self.delay
        };
        tokio::time::sleep(delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.log.lock().unwrap().push(Dispatch {
            target: name.clone(),
            started,
            finished: Instant::now(),
        });

        if name.starts_with("panic") {
            panic!("prober bug");
        }
        if name.starts_with("fail") {
            return Err(ProbeError::Transport("connection refused".into()));
        }
        if name.starts_with("trip") {
            if let Some(tx) = self.trip.lock().unwrap().take() {
                let _ = tx.send(());
            }
        }
        Ok(match self.kind {
            ProbeKind::Ping => Payload::Latency(Some(1.0)),
            ProbeKind::HttpFetch => Payload::Status(200),
            ProbeKind::RemoteExec => Payload::Output("ok".into()),
        })
    }

    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub(crate) fn requests(kind: ProbeKind, targets: &[&str], timeout: Duration) -> Vec<ProbeRequest> {
    targets
        .iter()
        .map(|t| ProbeRequest::new(Target::new(*t), kind, timeout))
        .collect()
}

pub(crate) fn status_of<'a>(outcomes: &'a [ProbeOutcome], target: &str) -> &'a ProbeStatus {
    &outcomes
        .iter()
        .find(|o| o.target.as_str() == target)
        .expect("outcome present")
        .status
}
