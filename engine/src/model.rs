//! Core data model shared by every stage of the enumeration pipeline.
//!
//! Types here are deliberately plain data: the pipeline stages (resolver,
//! driver, graph, expander, sweeper) own the behavior, these just carry it
//! between them over the event bus.

use std::fmt;
use std::net::IpAddr;

/// Provenance of a candidate name, fixed by the source that produced it.
///
/// `Trusted` tags (currently just `Cert`) bypass wildcard suppression: a
/// certificate-transparency match is evidence-grade and should not be
/// second-guessed by a same-process wildcard probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Dns,
    Cert,
    Scrape,
    Api,
    Axfr,
    Archive,
}

impl Tag {
    /// Tags whose data is evidence-grade and bypasses wildcard suppression.
    pub fn is_trusted(self) -> bool {
        matches!(self, Tag::Cert)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::Dns => "dns",
            Tag::Cert => "cert",
            Tag::Scrape => "scrape",
            Tag::Api => "api",
            Tag::Axfr => "axfr",
            Tag::Archive => "archive",
        };
        write!(f, "{s}")
    }
}

/// Resolver-facing record type. Kept as a closed enum rather than the raw
/// numeric RR type so callers can't typo a qtype string; `RecordKind::code`
/// gives the wire value used in §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Aaaa,
    Cname,
    Ptr,
    Ns,
    Mx,
    Txt,
    Soa,
    Spf,
    Srv,
    Axfr,
}

impl RecordKind {
    /// Numeric RR type per §6 EXTERNAL INTERFACES.
    pub fn code(self) -> u16 {
        match self {
            RecordKind::A => 1,
            RecordKind::Ns => 2,
            RecordKind::Cname => 5,
            RecordKind::Soa => 6,
            RecordKind::Ptr => 12,
            RecordKind::Mx => 15,
            RecordKind::Txt => 16,
            RecordKind::Aaaa => 28,
            RecordKind::Srv => 33,
            RecordKind::Spf => 99,
            RecordKind::Axfr => 252,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single normalized answer record (§3 Answer record).
///
/// `data` has already had the per-type normalization applied: lowercased,
/// trailing dot stripped, target-only for NS/MX/SRV/CNAME/PTR, SOA's two
/// fields concatenated, TXT/SPF pieces joined with a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub name: String,
    pub kind: RecordKind,
    pub ttl: u32,
    pub data: String,
}

impl AnswerRecord {
    pub fn new(name: impl Into<String>, kind: RecordKind, ttl: u32, data: impl Into<String>) -> Self {
        AnswerRecord {
            name: name.into(),
            kind,
            ttl,
            data: normalize_data(&data.into()),
        }
    }
}

/// Apply the §3 data-normalization rule: lowercase, no trailing dot.
pub fn normalize_data(raw: &str) -> String {
    raw.trim_end_matches('.').to_ascii_lowercase()
}

/// A name moving through the pipeline (§3 DNSRequest).
#[derive(Debug, Clone)]
pub struct DnsRequest {
    /// Canonicalized lowercase FQDN without trailing dot.
    pub name: String,
    /// The root domain this name was enumerated under.
    pub root: String,
    pub tag: Tag,
    pub source: String,
    /// Populated once the name has been resolved.
    pub answers: Vec<AnswerRecord>,
}

impl DnsRequest {
    pub fn new(name: impl Into<String>, root: impl Into<String>, tag: Tag, source: impl Into<String>) -> Self {
        DnsRequest {
            name: canonicalize_name(&name.into()),
            root: canonicalize_name(&root.into()),
            tag,
            source: source.into(),
            answers: Vec::new(),
        }
    }
}

/// Lowercase a name and strip a trailing dot, the canonical form used as
/// the key for every dedup filter and graph node in this crate.
pub fn canonicalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// A resolved address plus the infrastructure it sits inside (§3 Address info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    pub ip: IpAddr,
    pub netblock: Option<ipnet::IpNet>,
    pub asn: Option<u32>,
    pub asn_description: Option<String>,
}

/// Per-subdomain wildcard classification (§3 Wildcard entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardClass {
    None,
    /// Carries the canonical answer-set `data` values observed during probing.
    Static(Vec<String>),
    Dynamic,
}

/// Priority levels for the Resolve API (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    High,
    Critical,
}
