//! Core traits for Vigil probe implementations

use crate::error::ProbeError;
use crate::types::{Payload, ProbeKind, ProbeRequest};
use async_trait::async_trait;

/// One kind of reachability check. All probers must implement this.
///
/// Implementations perform exactly one external operation per call and
/// report every failure through `ProbeError`; deadlines and panics are
/// handled by the caller.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single target
    async fn probe(&self, request: &ProbeRequest) -> Result<Payload, ProbeError>;

    /// Which requests this prober serves
    fn kind(&self) -> ProbeKind;

    /// Prober name/identifier
    fn name(&self) -> &str;
}
