//! Campaign configuration: presets, CLI overrides and JSON campaign files

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use vigil_common::{
    Campaign, ProbeKind, ProbeOptions, ProbeParams, RemoteCredentials, SweepPlan, Target,
    VigilError,
};
use vigil_target_resolver::TargetResolver;

/// Hosts pinged by `vigil campaign` when no host list is given.
pub const DEFAULT_HOSTS: &[&str] = &["8.8.8.8", "1.1.1.1", "github.com", "example.com"];

/// URLs fetched by `vigil campaign` when no URL list is given.
pub const DEFAULT_URLS: &[&str] = &[
    "https://google.com",
    "https://github.com",
    "https://example.com",
    "https://example.org",
];

/// Per-sweep tuning as given on the command line or in a campaign file.
#[derive(Debug, Clone, Default)]
pub struct SweepSettings {
    pub preset: Option<String>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub ping_count: Option<u8>,
}

impl SweepSettings {
    fn options(&self) -> Result<ProbeOptions, VigilError> {
        let name = self.preset.as_deref().unwrap_or("balanced");
        ProbeOptions::preset(name).ok_or_else(|| VigilError::Config(format!("unknown preset '{}'", name)))
    }
}

/// Remote-exec parameters.
pub fn exec_params(command: &str, user: &str, key_file: Option<PathBuf>) -> ProbeParams {
    let mut credentials = RemoteCredentials::new(user);
    if let Some(key) = key_file {
        credentials = credentials.with_key_file(key);
    }
    ProbeParams::RemoteExec {
        command: command.to_string(),
        credentials,
    }
}

/// Build one sweep: preset first, explicit settings on top.
///
/// Host targets of ping and remote-exec sweeps get CIDR/range expansion.
pub fn plan_sweep(kind: ProbeKind, targets: Vec<Target>, settings: &SweepSettings) -> Result<SweepPlan> {
    let options = settings.options()?;
    let targets = match kind {
        ProbeKind::Ping | ProbeKind::RemoteExec => TargetResolver::expand_hosts(targets)?,
        ProbeKind::HttpFetch => targets,
    };

    let mut plan = SweepPlan::new(kind, targets).with_options(&options);
    if let Some(concurrency) = settings.concurrency {
        plan = plan.with_concurrency(concurrency);
    }
    if let Some(ms) = settings.timeout_ms {
        plan = plan.with_timeout(Duration::from_millis(ms));
    }
    if let (ProbeKind::Ping, Some(count)) = (kind, settings.ping_count) {
        plan = plan.with_params(ProbeParams::Ping { count });
    }
    debug!(kind = %plan.kind, targets = plan.targets.len(), concurrency = plan.concurrency, "sweep planned");
    Ok(plan)
}

/// Targets from a literal list and/or a file, literal ones first.
pub fn load_targets(literal: Option<&str>, file: Option<&Path>) -> Result<Vec<Target>> {
    if literal.is_none() && file.is_none() {
        return Err(VigilError::Config("no targets given (use --targets or --file)".to_string()).into());
    }
    let mut targets = literal.map(TargetResolver::parse_literal).unwrap_or_default();
    if let Some(path) = file {
        targets.extend(TargetResolver::from_file(path)?);
    }
    Ok(targets)
}

/// JSON campaign file.
///
/// ```json
/// {
///   "preset": "balanced",
///   "sweeps": [
///     { "kind": "ping", "targets": ["8.8.8.8"], "concurrency": 5 },
///     { "kind": "fetch", "targets_file": "urls.txt", "timeout_ms": 3000 },
///     { "kind": "exec", "targets": ["web1"], "command": "uptime", "user": "ops" }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    #[serde(default)]
    pub preset: Option<String>,
    pub sweeps: Vec<SweepConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub kind: ProbeKind,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub targets_file: Option<PathBuf>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub count: Option<u8>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

impl CampaignConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| VigilError::Parse(format!("campaign config: {}", e)).into())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read campaign config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid campaign config {}", path.display()))
    }

    /// Resolve target files (relative to `base_dir`) and build the campaign.
    pub fn into_campaign(self, base_dir: &Path) -> Result<Campaign> {
        if self.sweeps.is_empty() {
            return Err(VigilError::Config("campaign config has no sweeps".to_string()).into());
        }

        let mut campaign = Campaign::new();
        for sweep in self.sweeps {
            let mut targets: Vec<Target> = sweep.targets.iter().map(|t| Target::new(t.trim())).collect();
            if let Some(ref file) = sweep.targets_file {
                let path = if file.is_absolute() { file.clone() } else { base_dir.join(file) };
                targets.extend(TargetResolver::from_file(&path)?);
            }

            if let Some(count) = sweep.count {
                if !(1..=2).contains(&count) {
                    return Err(VigilError::Config(format!("ping count must be 1 or 2, got {}", count)).into());
                }
            }

            let settings = SweepSettings {
                preset: sweep.preset.or_else(|| self.preset.clone()),
                concurrency: sweep.concurrency,
                timeout_ms: sweep.timeout_ms,
                ping_count: sweep.count,
            };
            let mut plan = plan_sweep(sweep.kind, targets, &settings)?;

            if sweep.kind == ProbeKind::RemoteExec {
                plan = plan.with_params(exec_params(
                    sweep.command.as_deref().unwrap_or("hostname"),
                    sweep.user.as_deref().unwrap_or("root"),
                    sweep.key_file,
                ));
            }
            campaign = campaign.with_sweep(plan);
        }
        Ok(campaign)
    }
}
