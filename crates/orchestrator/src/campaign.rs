// crates/orchestrator/src/campaign.rs
//! Campaign runner - sequential sweeps over a shared worker pool

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Instant;
use tracing::{info, instrument, warn};

use vigil_common::{Campaign, CampaignReport, ProbeKind, ProbeParams, VigilError};

use crate::collector::ResultCollector;
use crate::pool::WorkerPool;

/// Runs the sweeps of a campaign one after another.
///
/// A sweep starts only after the previous sweep's pool has fully drained.
pub struct CampaignRunner {
    pool: WorkerPool,
}

impl CampaignRunner {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Reject campaigns that cannot run. Empty target lists are allowed.
    pub fn validate(campaign: &Campaign) -> Result<(), VigilError> {
        for (index, sweep) in campaign.sweeps.iter().enumerate() {
            if sweep.concurrency == 0 {
                return Err(VigilError::Config(format!(
                    "sweep {} ({}): concurrency must be at least 1",
                    index, sweep.kind
                )));
            }
            if sweep.timeout.is_zero() {
                return Err(VigilError::Config(format!(
                    "sweep {} ({}): timeout must be positive",
                    index, sweep.kind
                )));
            }
            if sweep.kind == ProbeKind::RemoteExec
                && !sweep.targets.is_empty()
                && !matches!(sweep.params, ProbeParams::RemoteExec { .. })
            {
                return Err(VigilError::Config(format!(
                    "sweep {} (exec): a command and credentials are required",
                    index
                )));
            }
        }
        Ok(())
    }

    pub async fn run(&self, campaign: &Campaign, collector: &ResultCollector) -> Result<CampaignReport> {
        self.run_until(campaign, collector, std::future::pending::<()>()).await
    }

    /// Like `run`, but stops the whole campaign when `shutdown` resolves.
    ///
    /// In-flight probes are abandoned and later sweeps never start. The
    /// report holds every outcome that completed before the interrupt and
    /// is marked `interrupted`.
    #[instrument(skip_all, fields(campaign = %campaign.id))]
    pub async fn run_until<F>(
        &self,
        campaign: &Campaign,
        collector: &ResultCollector,
        shutdown: F,
    ) -> Result<CampaignReport>
    where
        F: Future<Output = ()>,
    {
        Self::validate(campaign)?;
        tokio::pin!(shutdown);

        let start = Instant::now();
        info!(
            sweeps = campaign.sweeps.len(),
            requests = campaign.request_count(),
            "starting campaign"
        );

        let mut sweeps = Vec::with_capacity(campaign.sweeps.len());
        for (index, plan) in campaign.sweeps.iter().enumerate() {
            info!(
                sweep = index,
                kind = %plan.kind,
                targets = plan.targets.len(),
                concurrency = plan.concurrency,
                "starting sweep"
            );
            if plan.targets.is_empty() {
                warn!(sweep = index, kind = %plan.kind, "sweep has no targets");
            }

            collector.begin_sweep(plan.kind, plan.targets.len()).await;
            let run = self
                .pool
                .run_until(plan.requests(), plan.concurrency, collector, shutdown.as_mut())
                .await?;

            if run.interrupted {
                warn!(sweep = index, completed = run.outcomes.len(), "campaign interrupted");
                return Ok(CampaignReport {
                    id: campaign.id,
                    sweeps: collector.snapshot().await,
                    elapsed: start.elapsed(),
                    interrupted: true,
                });
            }

            let report = collector
                .end_sweep()
                .await
                .ok_or_else(|| anyhow!("collector lost sweep {}", index))?;

            debug_assert_eq!(run.outcomes.len(), plan.targets.len());
            debug_assert_eq!(report.outcomes.len(), run.outcomes.len());
            sweeps.push(report);
        }

        let elapsed = start.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "campaign finished");
        Ok(CampaignReport {
            id: campaign.id,
            sweeps,
            elapsed,
            interrupted: false,
        })
    }
}
