//! Dedup filters (§3 Filters, §4 throughout): small `HashSet`-backed guards
//! that stop the same name, address, or request from being processed twice
//! across the lifetime of an enumeration.
//!
//! Each filter is scoped narrowly on purpose. The sweep filter in particular
//! is created fresh per `ReverseSweep` call rather than held for the whole
//! enumeration, so its memory is bounded by one sweep's address count
//! instead of growing across an entire run (§9 Design Notes).

use std::collections::HashSet;

/// Guards the Enumeration Driver's dedup of `(name, tag)` pairs so the same
/// candidate from the same source class isn't queued twice (§4.5 "never
/// enqueues a `(name, tag)` pair it has already enqueued").
#[derive(Debug, Default)]
pub struct NameFilter {
    seen: HashSet<String>,
}

impl NameFilter {
    pub fn new() -> Self {
        NameFilter::default()
    }

    /// Returns `true` the first time `name` is seen, `false` on every
    /// subsequent call.
    pub fn insert(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Guards the Reverse-DNS Sweeper's per-call in-filter (§4.6: "never
/// queries the same address twice within one sweep call"). Created fresh
/// by each `ReverseSweep` invocation.
#[derive(Debug, Default)]
pub struct SweepFilter {
    seen: HashSet<std::net::IpAddr>,
}

impl SweepFilter {
    pub fn new() -> Self {
        SweepFilter::default()
    }

    pub fn insert(&mut self, addr: std::net::IpAddr) -> bool {
        self.seen.insert(addr)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_filter_dedups_case_insensitively() {
        let mut f = NameFilter::new();
        assert!(f.insert("WWW.Example.com"));
        assert!(!f.insert("www.example.com"));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn sweep_filter_is_independent_per_instance() {
        let mut a = SweepFilter::new();
        let mut b = SweepFilter::new();
        let addr: std::net::IpAddr = "10.0.0.1".parse().unwrap();
        assert!(a.insert(addr));
        assert!(b.insert(addr));
        assert!(!a.insert(addr));
    }
}
