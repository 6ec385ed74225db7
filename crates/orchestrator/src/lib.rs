//! Orchestrator - bounded probe execution, result collection and campaigns

mod campaign;
mod collector;
#[cfg(test)]
mod fake;
mod pool;

pub use campaign::CampaignRunner;
pub use collector::{
    format_duration, render_header, render_line, render_summary, ResultCollector, FAILURE_MARKER,
    SUCCESS_MARKER, TIMEOUT_MARKER,
};
pub use pool::{execute, SweepRun, WorkerPool};
