//! Graph Store (§4.8, §2 10% share): an in-memory typed property graph.
//!
//! No graph crate from the pack is grounded for this role (none of the
//! example manifests pull one in for this kind of data), so the store is a
//! small hand-rolled adjacency structure behind one coarse lock, matching
//! §5's "single writer lock held only for the duration of a synchronous
//! mutation, never across an `.await`" requirement directly.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Mutex as StdMutex;

use ipnet::IpNet;

use crate::model::AddressInfo;

const MAX_CNAME_HOPS: usize = 10;

/// Tag applied to a subdomain node by the expander when it discovers the
/// name plays the NS or MX role for some zone (§4.8 output classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Ns,
    Mx,
}

/// §4.8 output classification, decided at walk time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Web,
    Ns,
    Mx,
    Norm,
}

#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub name: String,
    pub addresses: Vec<AddressInfo>,
    pub classification: Classification,
}

#[derive(Default)]
struct SubdomainNode {
    occurrence_count: u32,
    sent: bool,
    role: Option<NodeRole>,
}

#[derive(Default)]
struct Inner {
    domains: HashSet<String>,
    subdomains: HashMap<String, SubdomainNode>,
    netblocks: HashSet<IpNet>,
    asns: HashMap<u32, Option<String>>,

    root_of: HashMap<String, HashSet<String>>,
    cname_to: HashMap<String, String>,
    a_to: HashMap<String, HashSet<IpAddr>>,
    aaaa_to: HashMap<String, HashSet<IpAddr>>,
    ptr_to: HashMap<IpAddr, HashSet<String>>,
    mx_to: HashMap<String, HashSet<String>>,
    ns_to: HashMap<String, HashSet<String>>,
    srv_to: HashMap<String, HashSet<String>>,
    has_prefix: HashMap<u32, HashSet<IpNet>>,

    address_netblock: HashMap<IpAddr, IpNet>,
    address_asn: HashMap<IpAddr, u32>,
}

pub struct GraphStore {
    inner: StdMutex<Inner>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore { inner: StdMutex::new(Inner::default()) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("graph mutex poisoned")
    }

    pub fn insert_domain(&self, domain: &str) {
        self.lock().domains.insert(domain.to_string());
    }

    /// Insert-or-get a subdomain node, incrementing its occurrence count.
    /// Returns the occurrence count *after* this mention, so callers can
    /// detect "first sighting" by checking the result equals 1 (§4.4 step 4).
    pub fn touch_subdomain(&self, name: &str) -> u32 {
        let node = self.lock().subdomains.entry(name.to_string()).or_default();
        node.occurrence_count += 1;
        node.occurrence_count
    }

    pub fn add_root_of(&self, domain: &str, subdomain: &str) {
        let mut inner = self.lock();
        inner.domains.insert(domain.to_string());
        inner.subdomains.entry(subdomain.to_string()).or_default();
        inner.root_of.entry(domain.to_string()).or_default().insert(subdomain.to_string());
    }

    pub fn add_cname(&self, from: &str, to: &str) {
        self.lock().cname_to.insert(from.to_string(), to.to_string());
    }

    pub fn add_a(&self, name: &str, ip: IpAddr) {
        self.lock().a_to.entry(name.to_string()).or_default().insert(ip);
    }

    pub fn add_aaaa(&self, name: &str, ip: IpAddr) {
        self.lock().aaaa_to.entry(name.to_string()).or_default().insert(ip);
    }

    pub fn add_ptr(&self, ip: IpAddr, name: &str) {
        self.lock().ptr_to.entry(ip).or_default().insert(name.to_string());
    }

    pub fn add_mx(&self, name: &str, target: &str) {
        self.lock().mx_to.entry(name.to_string()).or_default().insert(target.to_string());
    }

    pub fn add_ns(&self, name: &str, target: &str) {
        self.lock().ns_to.entry(name.to_string()).or_default().insert(target.to_string());
    }

    pub fn add_srv(&self, name: &str, target: &str) {
        self.lock().srv_to.entry(name.to_string()).or_default().insert(target.to_string());
    }

    pub fn tag_role(&self, name: &str, role: NodeRole) {
        self.lock().subdomains.entry(name.to_string()).or_default().role = Some(role);
    }

    /// §3: one netblock belongs to exactly one ASN, one IP belongs to at
    /// most one netblock in the store — the second insertion for the same
    /// IP silently wins over the first, matching "idempotent" insertion.
    pub fn set_address_info(&self, info: &AddressInfo) {
        let mut inner = self.lock();
        if let Some(netblock) = info.netblock {
            inner.netblocks.insert(netblock);
            inner.address_netblock.insert(info.ip, netblock);
            if let Some(asn) = info.asn {
                inner.has_prefix.entry(asn).or_default().insert(netblock);
            }
        }
        if let Some(asn) = info.asn {
            inner.address_asn.insert(info.ip, asn);
            inner.asns.entry(asn).or_insert_with(|| info.asn_description.clone());
        }
    }

    /// Marks the subdomain as emitted; returns `true` the first time (the
    /// caller should publish `Output`), `false` on every later call (§3
    /// "sent" idempotence property).
    pub fn mark_sent(&self, name: &str) -> bool {
        let node = self.lock().subdomains.entry(name.to_string()).or_default();
        if node.sent {
            false
        } else {
            node.sent = true;
            true
        }
    }

    pub fn node_counts(&self) -> (usize, usize, usize, usize) {
        let inner = self.lock();
        (inner.domains.len(), inner.subdomains.len(), inner.netblocks.len(), inner.asns.len())
    }

    /// §4.8 Output walking: follow `CNAME_TO` to fixpoint (capped at
    /// [`MAX_CNAME_HOPS`]), gather the final node's A/AAAA targets, attach
    /// netblock/ASN, and classify. Returns `None` if the chain never
    /// reaches an addressed node (suppressed per §4.8).
    pub fn walk_name(&self, name: &str) -> Option<OutputRecord> {
        let inner = self.lock();
        let mut cursor = name.to_string();
        let mut visited = HashSet::new();
        visited.insert(cursor.clone());

        for _ in 0..MAX_CNAME_HOPS {
            match inner.cname_to.get(&cursor) {
                Some(target) if !visited.contains(target) => {
                    visited.insert(target.clone());
                    cursor = target.clone();
                }
                _ => break,
            }
        }

        let mut ips: Vec<IpAddr> = inner.a_to.get(&cursor).into_iter().flatten().copied().collect();
        ips.extend(inner.aaaa_to.get(&cursor).into_iter().flatten().copied());
        if ips.is_empty() {
            return None;
        }

        let addresses = ips
            .into_iter()
            .map(|ip| AddressInfo {
                ip,
                netblock: inner.address_netblock.get(&ip).copied(),
                asn: inner.address_asn.get(&ip).copied(),
                asn_description: inner
                    .address_asn
                    .get(&ip)
                    .and_then(|asn| inner.asns.get(asn))
                    .cloned()
                    .flatten(),
            })
            .collect();

        let classification = classify(name, inner.subdomains.get(name).and_then(|n| n.role));
        Some(OutputRecord { name: name.to_string(), addresses, classification })
    }

    pub fn ns_targets_of(&self, name: &str) -> Vec<String> {
        self.lock().ns_to.get(name).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn subdomains_of(&self, domain: &str) -> Vec<String> {
        self.lock().root_of.get(domain).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn is_sent(&self, name: &str) -> bool {
        self.lock().subdomains.get(name).map(|n| n.sent).unwrap_or(false)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        GraphStore::new()
    }
}

fn classify(name: &str, role: Option<NodeRole>) -> Classification {
    let leftmost = name.split('.').next().unwrap_or("");
    if leftmost.eq_ignore_ascii_case("web") || leftmost.eq_ignore_ascii_case("www") {
        return Classification::Web;
    }
    match role {
        Some(NodeRole::Ns) => Classification::Ns,
        Some(NodeRole::Mx) => Classification::Mx,
        None => Classification::Norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_subdomain_reports_first_sighting() {
        let g = GraphStore::new();
        assert_eq!(g.touch_subdomain("a.example.com"), 1);
        assert_eq!(g.touch_subdomain("a.example.com"), 2);
    }

    #[test]
    fn mark_sent_is_idempotent() {
        let g = GraphStore::new();
        assert!(g.mark_sent("a.example.com"));
        assert!(!g.mark_sent("a.example.com"));
    }

    #[test]
    fn cname_chain_walks_to_addressed_terminus() {
        let g = GraphStore::new();
        g.add_cname("a.example.com", "b.example.com");
        g.add_cname("b.example.com", "c.example.com");
        g.add_a("c.example.com", "5.6.7.8".parse().unwrap());

        let record = g.walk_name("a.example.com").expect("chain resolves to an address");
        assert_eq!(record.addresses.len(), 1);
        assert_eq!(record.addresses[0].ip, "5.6.7.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn cname_cycle_is_bounded_and_suppressed() {
        let g = GraphStore::new();
        g.add_cname("a.example.com", "b.example.com");
        g.add_cname("b.example.com", "a.example.com");
        assert!(g.walk_name("a.example.com").is_none());
    }

    #[test]
    fn classification_prefers_web_prefix_over_role() {
        let g = GraphStore::new();
        g.add_a("www.example.com", "1.2.3.4".parse().unwrap());
        g.tag_role("www.example.com", NodeRole::Ns);
        let record = g.walk_name("www.example.com").unwrap();
        assert_eq!(record.classification, Classification::Web);
    }
}
