//! Vigil Common - Shared types and traits
//!
//! This crate provides the data model, error taxonomy and the `Prober`
//! trait used across the Vigil workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{ProbeError, VigilError, VigilResult};
pub use traits::Prober;
pub use types::{
    Campaign, CampaignReport, FailureKind, Payload, ProbeKind, ProbeOptions, ProbeOutcome,
    ProbeParams, ProbeRequest, ProbeStatus, RemoteCredentials, SweepPlan, SweepReport,
    SweepStats, Target, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
