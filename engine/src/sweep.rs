//! Reverse-DNS Sweeper (§4.6, §2 8% share): on a `ReverseSweep(addr, cidr)`
//! event, PTR-probes a window of nearby hosts and feeds any discovered
//! in-scope name back into the normal enrichment path.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::driver::{self, DriverContext};
use crate::filters::SweepFilter;
use crate::model::{DnsRequest, Tag};
use crate::resolve;
use crate::source::SourceRequest;

/// Handle one `ReverseSweep` event. The in-filter here (`SweepFilter`) is
/// constructed fresh per call and dropped at the end, per §9's resolution
/// of the sweep-filter-lifetime open question.
pub async fn run(ctx: &DriverContext, addr: IpAddr, cidr: IpNet) {
    let window = ctx.config.sweep_window();
    let hosts = crate::util::cidr_window(addr, cidr, window);
    let mut filter = SweepFilter::new();

    for host in hosts {
        if !filter.insert(host) {
            continue;
        }
        probe_one(ctx, host).await;
    }
}

async fn probe_one(ctx: &DriverContext, host: IpAddr) {
    let _permit = ctx.acquire_dns().await;
    let name = match resolve::reverse(&ctx.pool, host).await {
        Ok(name) => name,
        Err(_) => return,
    };
    drop(_permit);

    let Some(root) = ctx
        .config
        .root_domains
        .iter()
        .find(|root| ctx.config.is_domain_in_scope(&name) && (name == **root || name.ends_with(&format!(".{root}"))))
        .cloned()
    else {
        return;
    };

    ctx.request_source(SourceRequest { name: name.clone(), root: root.clone() }).await;

    // Only the name is known at this point (PTR carries no A/AAAA data), so
    // it re-enters through the same in-filter-deduped `submit` path a source
    // worker's candidate would, picking up the normal CNAME/TXT/A/AAAA probe
    // rather than skipping straight to `NameResolved` with empty answers.
    let req = DnsRequest::new(name, root, Tag::Dns, "Reverse DNS");
    driver::submit(ctx, req).await;
}
