// runner.rs
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use vigil_common::{Campaign, CampaignReport, ProbeKind, Target};
use vigil_orchestrator::{CampaignRunner, ResultCollector, WorkerPool};
use vigil_probes::default_probers;
use vigil_target_resolver::TargetResolver;

use crate::args::{ExecArgs, OutputFormat, SweepArgs, TargetArgs};
use crate::config::{exec_params, load_targets, plan_sweep, CampaignConfig, SweepSettings, DEFAULT_HOSTS, DEFAULT_URLS};
use crate::output::print_report;

impl From<&SweepArgs> for SweepSettings {
    fn from(args: &SweepArgs) -> Self {
        SweepSettings {
            preset: Some(args.preset.clone()),
            concurrency: args.concurrency,
            timeout_ms: args.timeout,
            ping_count: None,
        }
    }
}

/// Single-sweep campaign for the `ping`, `fetch` and `exec` subcommands.
pub fn single_sweep(
    kind: ProbeKind,
    targets: &TargetArgs,
    sweep: &SweepArgs,
    ping_count: Option<u8>,
    exec: Option<&ExecArgs>,
) -> Result<Campaign> {
    let list = load_targets(targets.targets.as_deref(), targets.file.as_deref())?;
    let mut settings = SweepSettings::from(sweep);
    settings.ping_count = ping_count;

    let mut plan = plan_sweep(kind, list, &settings)?;
    if let Some(exec) = exec {
        plan = plan.with_params(exec_params(&exec.remote_command, &exec.user, exec.key_file.clone()));
    }
    Ok(Campaign::new().with_sweep(plan))
}

/// Ping sweep, fetch sweep and, with `ssh_hosts`, a remote-exec sweep.
pub fn default_campaign(
    hosts: Option<&Path>,
    urls: Option<&Path>,
    ssh_hosts: Option<&Path>,
    sweep: &SweepArgs,
    exec: &ExecArgs,
) -> Result<Campaign> {
    let settings = SweepSettings::from(sweep);

    let host_list = match hosts {
        Some(path) => TargetResolver::from_file(path)?,
        None => DEFAULT_HOSTS.iter().map(|h| Target::new(*h)).collect(),
    };
    let url_list = match urls {
        Some(path) => TargetResolver::from_file(path)?,
        None => DEFAULT_URLS.iter().map(|u| Target::new(*u)).collect(),
    };

    let mut campaign = Campaign::new()
        .with_sweep(plan_sweep(ProbeKind::Ping, host_list, &settings)?)
        .with_sweep(plan_sweep(ProbeKind::HttpFetch, url_list, &settings)?);

    if let Some(path) = ssh_hosts {
        let ssh_list = TargetResolver::from_file(path)?;
        let plan = plan_sweep(ProbeKind::RemoteExec, ssh_list, &settings)?.with_params(exec_params(
            &exec.remote_command,
            &exec.user,
            exec.key_file.clone(),
        ));
        campaign = campaign.with_sweep(plan);
    }
    Ok(campaign)
}

/// Load a JSON campaign; relative target files resolve against its directory.
pub fn campaign_from_config(path: &Path) -> Result<Campaign> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    CampaignConfig::from_file(path)?.into_campaign(base_dir)
}

/// Run a campaign with the standard probers until done or interrupted.
pub async fn run_campaign(campaign: Campaign, output_format: OutputFormat) -> Result<CampaignReport> {
    info!(
        campaign = %campaign.id,
        sweeps = campaign.sweeps.len(),
        requests = campaign.request_count(),
        "Starting campaign..."
    );

    // Structured formats are printed once at the end.
    let collector = if output_format == OutputFormat::Text {
        ResultCollector::stdout()
    } else {
        ResultCollector::quiet()
    };

    let runner = CampaignRunner::new(WorkerPool::with_probers(default_probers()?));
    let report = runner.run_until(&campaign, &collector, shutdown_signal()).await?;

    print_report(&report, output_format)?;
    Ok(report)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
