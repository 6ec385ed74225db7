//! Vigil Probes - concrete reachability checks
//!
//! - `PingProbe`: platform `ping`, latency parsed from the reply
//! - `HttpProbe`: single GET, status code as payload
//! - `RemoteExecProbe`: one command over a non-interactive ssh session

pub mod http;
pub mod ping;
pub mod remote;

pub use http::HttpProbe;
pub use ping::{parse_latency, PingCapability, PingProbe, PING_CAPABILITY};
pub use remote::RemoteExecProbe;

use anyhow::{Context, Result};
use std::sync::Arc;
use vigil_common::Prober;

/// The three standard probers, ready to register with a worker pool.
pub fn default_probers() -> Result<Vec<Arc<dyn Prober>>> {
    let http = HttpProbe::new().context("Failed to build HTTP client")?;
    Ok(vec![
        Arc::new(PingProbe::new()),
        Arc::new(http),
        Arc::new(RemoteExecProbe::new()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::ProbeKind;

    #[test]
    fn default_probers_cover_every_kind() {
        let probers = default_probers().unwrap();
        let kinds: Vec<ProbeKind> = probers.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProbeKind::Ping, ProbeKind::HttpFetch, ProbeKind::RemoteExec]);
    }
}
