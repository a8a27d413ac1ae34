//! Event bus (§4.4, §9 Design Notes): the source→driver→graph relationship
//! lowered to a fixed, closed `Event` enum carried over
//! `tokio::sync::mpsc`, rather than a dynamic string-keyed publish/subscribe
//! bus. The topics named in §6 are exactly this enum's variants, so a typo'd
//! topic name is a compile error instead of a silent no-op subscriber.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::graph::OutputRecord;
use crate::model::DnsRequest;

/// Fire-and-forget, at-least-once event. Published by any stage, consumed
/// by whichever stage(s) care (§4.4: "control flow is strictly
/// event-driven; components never call one another synchronously").
#[derive(Debug)]
pub enum Event {
    NewName(DnsRequest),
    NameResolved(DnsRequest),
    NewSubdomain(DnsRequest, u32),
    NewAddress(String, IpAddr),
    ReverseSweep(IpAddr, IpNet),
    NewAsn(u32, Option<String>),
    Output(OutputRecord),
}

/// Bounded enough to apply real backpressure on a runaway source while
/// staying generous relative to `SemMaxDNSQueries`, which is the primary
/// concurrency throttle (§4.4 Backpressure).
pub const CHANNEL_CAPACITY: usize = 8192;

pub fn channel() -> (tokio::sync::mpsc::Sender<Event>, tokio::sync::mpsc::Receiver<Event>) {
    tokio::sync::mpsc::channel(CHANNEL_CAPACITY)
}
