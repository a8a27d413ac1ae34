//! `EngineConfig`: the typed surface the core consumes (§6 Config surface).
//!
//! A thin CLI layer in `enumctl` builds one of these and hands it to
//! [`crate::enumeration::Enumeration::new`]; the core itself never parses
//! flags or files.

use std::collections::HashSet;

use ipnet::IpNet;

/// Default public resolvers used when the caller does not supply its own
/// list via [`EngineConfig::resolvers`]. Kept small and well-known; a real
/// deployment is expected to override this with its own vetted set.
pub const DEFAULT_RESOLVERS: &[&str] = &[
    "8.8.8.8:53",
    "8.8.4.4:53",
    "1.1.1.1:53",
    "1.0.0.1:53",
    "9.9.9.9:53",
    "208.67.222.222:53",
];

/// Default sinkhole blacklist (§4.4, §9): known netblocks whose presence in
/// an A answer invalidates the whole record set.
pub fn default_blacklist() -> Vec<IpNet> {
    ["198.105.244.0/24", "198.105.254.0/24", "88.204.137.0/24"]
        .iter()
        .map(|s| s.parse().expect("built-in blacklist CIDR is valid"))
        .collect()
}

/// Everything the core needs to run one enumeration (§6 Config surface).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root domains to enumerate. Every in-scope check is relative to this set.
    pub root_domains: Vec<String>,
    /// Source names (matching a `SourceWorker`'s identifier) to skip.
    pub disabled_sources: HashSet<String>,
    /// Enables AXFR attempts and widens the reverse-sweep window to 500 (§4.5, §4.6).
    pub active_mode: bool,
    /// Overrides the compiled-in sinkhole blacklist when non-empty.
    pub blacklist: Vec<IpNet>,
    /// Overrides the compiled-in default resolver list when non-empty.
    pub resolvers: Vec<String>,
    /// Cap on concurrent in-flight DNS transactions across the whole pool.
    pub sem_max_dns_queries: usize,
    /// Emit `Output` for in-scope names that never resolved, with empty addresses.
    pub include_unresolvable: bool,
    /// Names (or suffixes thereof) dropped before resolution, independent of
    /// the IP-based sinkhole blacklist (§6 `Blacklisted(name)`).
    pub name_blacklist: Vec<String>,
}

impl EngineConfig {
    pub fn new(root_domains: Vec<String>) -> Self {
        EngineConfig {
            root_domains: root_domains
                .into_iter()
                .map(|d| crate::model::canonicalize_name(&d))
                .collect(),
            disabled_sources: HashSet::new(),
            active_mode: false,
            blacklist: Vec::new(),
            resolvers: Vec::new(),
            sem_max_dns_queries: 2_000,
            include_unresolvable: false,
            name_blacklist: Vec::new(),
        }
    }

    /// Resolver addresses to dial, falling back to [`DEFAULT_RESOLVERS`].
    pub fn resolver_addrs(&self) -> Vec<String> {
        if self.resolvers.is_empty() {
            DEFAULT_RESOLVERS.iter().map(|s| s.to_string()).collect()
        } else {
            self.resolvers.clone()
        }
    }

    /// Blacklist CIDRs to screen A answers against, falling back to
    /// [`default_blacklist`].
    pub fn blacklist_nets(&self) -> Vec<IpNet> {
        if self.blacklist.is_empty() {
            default_blacklist()
        } else {
            self.blacklist.clone()
        }
    }

    /// Width of the Reverse-DNS Sweeper's window: 250, or 500 under active mode (§4.6).
    pub fn sweep_window(&self) -> usize {
        if self.active_mode {
            500
        } else {
            250
        }
    }

    pub fn is_source_enabled(&self, source_name: &str) -> bool {
        !self.disabled_sources.contains(source_name)
    }

    /// §6 `IsDomainInScope`: `name` is in scope iff it equals, or is a
    /// subdomain of, one of the configured root domains.
    pub fn is_domain_in_scope(&self, name: &str) -> bool {
        let name = crate::model::canonicalize_name(name);
        self.root_domains
            .iter()
            .any(|root| name == *root || name.ends_with(&format!(".{root}")))
    }

    /// §6 `Blacklisted`: does `ip` fall inside any configured/default
    /// blacklist CIDR?
    pub fn blacklisted(&self, ip: std::net::IpAddr) -> bool {
        self.blacklist_nets().iter().any(|net| net.contains(&ip))
    }

    /// §6 `Blacklisted(name)`: does `name` equal, or fall under, any
    /// configured name-blacklist entry? Checked pre-resolution so a
    /// blacklisted branch never reaches the resolver at all.
    pub fn blacklisted_name(&self, name: &str) -> bool {
        let name = crate::model::canonicalize_name(name);
        self.name_blacklist.iter().any(|entry| {
            let entry = crate::model::canonicalize_name(entry);
            name == entry || name.ends_with(&format!(".{entry}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_scope_matches_root_and_subdomains() {
        let cfg = EngineConfig::new(vec!["Example.COM.".to_string()]);
        assert!(cfg.is_domain_in_scope("example.com"));
        assert!(cfg.is_domain_in_scope("www.example.com"));
        assert!(!cfg.is_domain_in_scope("example.org"));
    }

    #[test]
    fn blacklist_falls_back_to_default() {
        let cfg = EngineConfig::new(vec!["example.com".to_string()]);
        assert!(cfg.blacklisted("198.105.244.5".parse().unwrap()));
        assert!(!cfg.blacklisted("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn sweep_window_widens_in_active_mode() {
        let mut cfg = EngineConfig::new(vec!["example.com".to_string()]);
        assert_eq!(cfg.sweep_window(), 250);
        cfg.active_mode = true;
        assert_eq!(cfg.sweep_window(), 500);
    }

    #[test]
    fn name_blacklist_matches_root_and_subdomains() {
        let mut cfg = EngineConfig::new(vec!["example.com".to_string()]);
        cfg.name_blacklist.push("internal.example.com".to_string());
        assert!(cfg.blacklisted_name("internal.example.com"));
        assert!(cfg.blacklisted_name("vpn.internal.example.com"));
        assert!(!cfg.blacklisted_name("other.example.com"));
    }

    #[test]
    fn disabled_sources_are_respected() {
        let mut cfg = EngineConfig::new(vec!["example.com".to_string()]);
        cfg.disabled_sources.insert("scrape".to_string());
        assert!(!cfg.is_source_enabled("scrape"));
        assert!(cfg.is_source_enabled("cert"));
    }
}
