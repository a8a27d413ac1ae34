//! Filters & Utilities (§2 share 6%): deterministic, dependency-free helpers
//! used by the resolver, wildcard detector, and sweeper. Kept separate from
//! those modules so each function can be reasoned about (and tested) in
//! isolation from any async machinery.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use rand::Rng;

const LDH_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an unguessable LDH label for wildcard probing (§4.3, §9).
///
/// Returns a random lowercase alphanumeric string of 6-24 bytes with no
/// leading/trailing hyphen (this alphabet never produces a hyphen at all,
/// which trivially satisfies that constraint while staying LDH-valid).
/// Returns `None` per the boundary behavior in §8 when `sub` is already too
/// long to leave room for even the minimum 6-byte label under `max_name_len`.
pub fn unlikely_name(sub: &str, max_name_len: usize) -> Option<String> {
    let budget = max_name_len.checked_sub(sub.len() + 1)?;
    if budget < 6 {
        return None;
    }
    let len = rand::thread_rng().gen_range(6..=24.min(budget));
    let mut rng = rand::thread_rng();
    let label: String = (0..len)
        .map(|_| LDH_ALPHABET[rng.gen_range(0..LDH_ALPHABET.len())] as char)
        .collect();
    Some(label)
}

/// Format an IPv4 address as the reversed-octet `in-addr.arpa` owner name
/// (§6 PTR name formats), without the trailing `.in-addr.arpa` suffix.
pub fn reverse_ip4(addr: Ipv4Addr) -> String {
    let o = addr.octets();
    format!("{}.{}.{}.{}", o[3], o[2], o[1], o[0])
}

/// Build the full PTR query name for an address (§6 PTR name formats).
pub fn ptr_name(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => format!("{}.in-addr.arpa", reverse_ip4(v4)),
        IpAddr::V6(v6) => format!("{}.ip6.arpa", reverse_ip6(v6)),
    }
}

/// Format an IPv6 address as the nibble-reversed `ip6.arpa` owner name
/// (§6 PTR name formats), without the trailing `.ip6.arpa` suffix.
fn reverse_ip6(addr: Ipv6Addr) -> String {
    let hex: String = addr.octets().iter().map(|b| format!("{b:02x}")).collect();
    hex.chars().rev().map(|c| c.to_string()).collect::<Vec<_>>().join(".")
}

/// A request name "resembles an arpa suffix" (§4.2 `Reverse`'s loop guard)
/// when it already ends in one of the reverse-lookup zones, which would
/// otherwise let a PTR answer feed straight back into another PTR query.
pub fn looks_like_arpa(name: &str) -> bool {
    let n = name.trim_end_matches('.').to_ascii_lowercase();
    n.ends_with("in-addr.arpa") || n.ends_with("ip6.arpa")
}

/// Every proper suffix of `name` between (exclusive) `name` itself and
/// (inclusive) `root`, used by the wildcard detector to walk from the
/// leaf label up to the enumerated root (§4.3).
///
/// Returns the empty vector if `name` is not actually a subdomain of
/// `root` (or is equal to it).
pub fn suffixes_between(name: &str, root: &str) -> Vec<String> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let root = root.trim_end_matches('.').to_ascii_lowercase();

    if name == root || !name.ends_with(&format!(".{root}")) {
        return Vec::new();
    }

    let labels: Vec<&str> = name.split('.').collect();
    let root_labels = root.split('.').count();
    let mut out = Vec::new();
    // Walk from one label short of `name` up to and including `root`.
    for take in (root_labels..labels.len()).rev() {
        out.push(labels[labels.len() - take..].join("."));
    }
    out
}

/// Select up to `n` addresses in a window centered on `addr`, clipped at the
/// boundaries of `cidr` (§4.6, §8 boundary behavior: at most `n+1` hosts).
///
/// The window is built by walking outward from `addr` in both directions so
/// the result stays centered rather than skewed towards one edge when a
/// clip occurs.
pub fn cidr_window(addr: IpAddr, cidr: IpNet, n: usize) -> Vec<IpAddr> {
    match (addr, cidr) {
        (IpAddr::V4(a), IpNet::V4(net)) => cidr_window_v4(a, net, n).into_iter().map(IpAddr::V4).collect(),
        (IpAddr::V6(a), IpNet::V6(net)) => cidr_window_v6(a, net, n).into_iter().map(IpAddr::V6).collect(),
        _ => Vec::new(),
    }
}

fn cidr_window_v4(addr: Ipv4Addr, net: ipnet::Ipv4Net, n: usize) -> Vec<Ipv4Addr> {
    let lo = u32::from(net.network());
    let hi = u32::from(net.broadcast());
    let center = u32::from(addr).clamp(lo, hi);

    let mut out = Vec::with_capacity(n + 1);
    out.push(Ipv4Addr::from(center));

    let mut below = center;
    let mut above = center;
    while out.len() <= n {
        let mut advanced = false;
        if above < hi {
            above += 1;
            out.push(Ipv4Addr::from(above));
            advanced = true;
            if out.len() > n {
                break;
            }
        }
        if below > lo {
            below -= 1;
            out.push(Ipv4Addr::from(below));
            advanced = true;
        }
        if !advanced {
            break;
        }
    }
    out
}

fn cidr_window_v6(addr: Ipv6Addr, net: ipnet::Ipv6Net, n: usize) -> Vec<Ipv6Addr> {
    let lo = u128::from(net.network());
    let hi = u128::from(net.broadcast());
    let center = u128::from(addr).clamp(lo, hi);

    let mut out = Vec::with_capacity(n + 1);
    out.push(Ipv6Addr::from(center));

    let mut below = center;
    let mut above = center;
    while out.len() <= n {
        let mut advanced = false;
        if above < hi {
            above += 1;
            out.push(Ipv6Addr::from(above));
            advanced = true;
            if out.len() > n {
                break;
            }
        }
        if below > lo {
            below -= 1;
            out.push(Ipv6Addr::from(below));
            advanced = true;
        }
        if !advanced {
            break;
        }
    }
    out
}

/// `walkHostPart` from §8 boundary behaviors: the host-only portion of `n`
/// relative to `d` (everything left of `.d`). Empty when `n == d`, which the
/// NSEC walker must treat as "no progress" rather than looping.
pub fn walk_host_part<'a>(n: &'a str, d: &str) -> &'a str {
    if n == d {
        return "";
    }
    n.strip_suffix(&format!(".{d}")).unwrap_or(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlikely_name_respects_length_budget() {
        assert!(unlikely_name("a.b.c", 253).is_some());
        assert_eq!(unlikely_name(&"x".repeat(250), 253), None);
    }

    #[test]
    fn reverse_ip4_formats_octets_backwards() {
        assert_eq!(reverse_ip4(Ipv4Addr::new(10, 0, 0, 10)), "10.0.0.10");
        assert_eq!(ptr_name(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))), "4.3.2.1.in-addr.arpa");
    }

    #[test]
    fn looks_like_arpa_matches_both_families() {
        assert!(looks_like_arpa("4.3.2.1.in-addr.arpa"));
        assert!(looks_like_arpa("b.a.ip6.arpa."));
        assert!(!looks_like_arpa("www.example.com"));
    }

    #[test]
    fn suffixes_between_walks_leaf_to_root() {
        let got = suffixes_between("a.b.example.com", "example.com");
        assert_eq!(got, vec!["b.example.com", "example.com"]);
        assert!(suffixes_between("example.com", "example.com").is_empty());
        assert!(suffixes_between("other.org", "example.com").is_empty());
    }

    #[test]
    fn cidr_window_clips_at_boundary_and_caps_size() {
        let net: IpNet = "10.0.0.0/30".parse().unwrap();
        let addr: IpAddr = "10.0.0.1".parse().unwrap();
        let hosts = cidr_window(addr, net, 250);
        assert!(hosts.len() <= 251);
        assert!(hosts.iter().all(|h| net.contains(h)));
    }

    #[test]
    fn walk_host_part_is_empty_for_equal_names() {
        assert_eq!(walk_host_part("example.com", "example.com"), "");
        assert_eq!(walk_host_part("www.example.com", "example.com"), "www");
    }
}
