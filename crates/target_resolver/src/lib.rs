//! Target Resolver - target list parsing and host expansion
//!
//! Target lists are newline-delimited plain text, one target per line.
//! Blank lines and `#` comments are ignored. Host targets (ping and
//! remote-exec sweeps) may additionally use:
//! - CIDR: "192.168.1.0/30"
//! - range: "192.168.1.1-192.168.1.10"
//!
//! URLs and hostnames are passed through untouched; they are opaque to the
//! prober until a probe runs.

use anyhow::{Context, Result};
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;
use vigil_common::Target;

/// Maximum number of hosts a single CIDR or range token may expand to.
pub const MAX_EXPANDED_HOSTS: u64 = 4096;

/// Env var lifting `MAX_EXPANDED_HOSTS`.
pub const ALLOW_LARGE_CIDR_ENV: &str = "VIGIL_ALLOW_LARGE_CIDR";

pub struct TargetResolver;

impl TargetResolver {
    pub fn new() -> Self {
        Self
    }

    /// Parse newline-delimited text into targets, preserving order.
    pub fn parse_list(text: &str) -> Vec<Target> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(Target::from)
            .collect()
    }

    /// Parse a literal list given on the command line (comma or newline separated).
    pub fn parse_literal(list: &str) -> Vec<Target> {
        list.split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Target::from)
            .collect()
    }

    /// Read a target file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<Target>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read target list {}", path.display()))?;
        Ok(Self::parse_list(&text))
    }

    /// Expand CIDR and range tokens into individual host targets.
    ///
    /// Duplicates are dropped, first occurrence wins. The per-token limit is
    /// `MAX_EXPANDED_HOSTS` unless `VIGIL_ALLOW_LARGE_CIDR=1`.
    pub fn expand_hosts(targets: Vec<Target>) -> Result<Vec<Target>> {
        let allow_large = std::env::var(ALLOW_LARGE_CIDR_ENV)
            .map(|v| v == "1")
            .unwrap_or(false);
        let limit = if allow_large { u64::MAX } else { MAX_EXPANDED_HOSTS };
        Self::expand_hosts_with_limit(targets, limit)
    }

    pub fn expand_hosts_with_limit(targets: Vec<Target>, limit: u64) -> Result<Vec<Target>> {
        let mut hosts: Vec<Target> = Vec::with_capacity(targets.len());
        let mut seen: HashSet<Target> = HashSet::with_capacity(targets.len());
        let mut push = |t: Target| {
            if seen.insert(t.clone()) {
                hosts.push(t);
            }
        };

        for target in targets {
            let token = target.as_str();

            if let Ok(net) = token.parse::<Ipv4Net>() {
                let prefix = net.prefix_len();
                let count = if prefix >= 32 { 1u64 } else { 1u64 << (32 - prefix) };
                if count > limit {
                    anyhow::bail!(
                        "CIDR {} expands to {} hosts which exceeds the allowed limit of {}. Set {}=1 to override.",
                        net, count, limit, ALLOW_LARGE_CIDR_ENV
                    );
                }
                for addr in net.hosts() {
                    push(Target::new(addr.to_string()));
                }
                continue;
            }

            if looks_like_range(token) {
                for addr in parse_ip_range(token, limit)? {
                    push(Target::new(addr.to_string()));
                }
                continue;
            }

            push(target);
        }

        Ok(hosts)
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}

// Hostnames may contain '-', so only treat "a.b.c.d-e.f.g.h" as a range.
fn looks_like_range(token: &str) -> bool {
    match token.split_once('-') {
        Some((a, b)) => a.parse::<Ipv4Addr>().is_ok() && b.parse::<Ipv4Addr>().is_ok(),
        None => false,
    }
}

fn parse_ip_range(range: &str, limit: u64) -> Result<Vec<Ipv4Addr>> {
    let (start, end) = range
        .split_once('-')
        .with_context(|| format!("Invalid IP range: {}", range))?;

    let start: Ipv4Addr = start.parse().context(format!("Invalid start IP: {}", start))?;
    let end: Ipv4Addr = end.parse().context(format!("Invalid end IP: {}", end))?;

    let start_u32 = u32::from(start);
    let end_u32 = u32::from(end);
    if start_u32 > end_u32 {
        anyhow::bail!("Invalid IP range {}: start > end", range);
    }
    let count = u64::from(end_u32 - start_u32) + 1;
    if count > limit {
        anyhow::bail!(
            "Range {} expands to {} hosts which exceeds the allowed limit of {}",
            range,
            count,
            limit
        );
    }

    Ok((start_u32..=end_u32).map(Ipv4Addr::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(targets: &[Target]) -> Vec<&str> {
        targets.iter().map(Target::as_str).collect()
    }

    #[test]
    fn test_parse_list_skips_blank_and_comments() {
        let text = "8.8.8.8\n\n  1.1.1.1  \n# internal\nexample.com\n";
        let targets = TargetResolver::parse_list(text);
        assert_eq!(names(&targets), vec!["8.8.8.8", "1.1.1.1", "example.com"]);
    }

    #[test]
    fn test_parse_literal() {
        let targets = TargetResolver::parse_literal("https://a.example, https://b.example,,");
        assert_eq!(names(&targets), vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_empty_list_is_empty() {
        assert!(TargetResolver::parse_list("\n   \n").is_empty());
        assert!(TargetResolver::parse_literal("").is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://example.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://000.invalid").unwrap();

        let targets = TargetResolver::from_file(file.path()).unwrap();
        assert_eq!(names(&targets), vec!["https://example.com", "https://000.invalid"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TargetResolver::from_file(dir.path().join("nope.txt")).is_err());
    }

    #[test]
    fn test_expand_cidr() {
        let hosts =
            TargetResolver::expand_hosts_with_limit(vec!["192.168.1.0/30".into()], MAX_EXPANDED_HOSTS)
                .unwrap();
        assert_eq!(names(&hosts), vec!["192.168.1.1", "192.168.1.2"]);
    }

    #[test]
    fn test_expand_range_and_dedupe() {
        let hosts = TargetResolver::expand_hosts_with_limit(
            vec!["10.0.0.1-10.0.0.3".into(), "10.0.0.2".into(), "my-host.lan".into()],
            MAX_EXPANDED_HOSTS,
        )
        .unwrap();
        assert_eq!(names(&hosts), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "my-host.lan"]);
    }

    #[test]
    fn test_large_cidr_rejected() {
        let r = TargetResolver::expand_hosts_with_limit(vec!["10.0.0.0/16".into()], MAX_EXPANDED_HOSTS);
        assert!(r.is_err());
    }

    #[test]
    fn test_large_cidr_allowed_with_higher_limit() {
        let r = TargetResolver::expand_hosts_with_limit(vec!["10.0.0.0/20".into()], u64::MAX).unwrap();
        assert_eq!(r.len(), 4094);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_across_large_expansions() {
        let hosts = TargetResolver::expand_hosts_with_limit(
            vec![
                "10.1.0.0/20".into(),
                "10.1.0.0/20".into(),
                "10.1.15.254".into(),
                "10.1.16.0/20".into(),
            ],
            MAX_EXPANDED_HOSTS,
        )
        .unwrap();
        assert_eq!(hosts.len(), 2 * 4094);
        assert_eq!(hosts[0].as_str(), "10.1.0.1");
        assert_eq!(hosts[4093].as_str(), "10.1.15.254");
        assert_eq!(hosts[4094].as_str(), "10.1.16.1");
    }

    #[test]
    fn test_expand_hosts_honours_env_override() {
        std::env::remove_var(ALLOW_LARGE_CIDR_ENV);
        assert!(TargetResolver::expand_hosts(vec!["10.2.0.0/19".into()]).is_err());

        std::env::set_var(ALLOW_LARGE_CIDR_ENV, "1");
        let hosts = TargetResolver::expand_hosts(vec!["10.2.0.0/19".into()]);
        std::env::remove_var(ALLOW_LARGE_CIDR_ENV);
        assert_eq!(hosts.unwrap().len(), 8190);

        std::env::set_var(ALLOW_LARGE_CIDR_ENV, "yes");
        let hosts = TargetResolver::expand_hosts(vec!["10.2.0.0/19".into()]);
        std::env::remove_var(ALLOW_LARGE_CIDR_ENV);
        assert!(hosts.is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let r = TargetResolver::expand_hosts_with_limit(vec!["10.0.0.9-10.0.0.1".into()], MAX_EXPANDED_HOSTS);
        assert!(r.is_err());
    }
}
