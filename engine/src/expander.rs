//! Subdomain Expander (§4.5, §2 10% share): on first sighting of a new
//! subdomain, issues NS/MX/SOA/SPF queries, optionally attempts AXFR
//! against each advertised nameserver, optionally walks NSEC chains, and
//! probes a fixed list of SRV service labels.

use crate::axfr;
use crate::bus::Event;
use crate::driver::DriverContext;
use crate::graph::NodeRole;
use crate::model::{DnsRequest, Priority, RecordKind, Tag};
use crate::resolve;
use crate::source::SourceRequest;

/// A representative slice of the well-known SRV service names probed
/// against every newly sighted subdomain (§4.5 "~100 SRV labels").
pub const SRV_LABELS: &[&str] = &[
    "_http._tcp",
    "_https._tcp",
    "_ldap._tcp",
    "_ldaps._tcp",
    "_kerberos._tcp",
    "_kerberos._udp",
    "_kerberos-master._tcp",
    "_kpasswd._tcp",
    "_gc._tcp",
    "_ntp._udp",
    "_smtp._tcp",
    "_submission._tcp",
    "_pop3._tcp",
    "_pop3s._tcp",
    "_imap._tcp",
    "_imaps._tcp",
    "_caldav._tcp",
    "_caldavs._tcp",
    "_carddav._tcp",
    "_carddavs._tcp",
    "_xmpp-client._tcp",
    "_xmpp-server._tcp",
    "_sip._tcp",
    "_sip._udp",
    "_sips._tcp",
    "_stun._udp",
    "_turn._udp",
    "_autodiscover._tcp",
    "_ftp._tcp",
    "_telnet._tcp",
    "_rsync._tcp",
    "_nntp._tcp",
    "_ipp._tcp",
    "_printer._tcp",
    "_matrix._tcp",
    "_jabber._tcp",
    "_presence._tcp",
    "_vlmcs._tcp",
    "_dns._udp",
];

/// Handle `NewSubdomain(req, 1)` (first sighting only — the driver only
/// publishes this event when the graph's occurrence counter reaches 1).
pub async fn expand(ctx: &DriverContext, req: DnsRequest) {
    ctx.request_source(SourceRequest { name: req.name.clone(), root: req.root.clone() }).await;

    basic_queries(ctx, &req).await;

    if ctx.config.active_mode {
        axfr_against_nameservers(ctx, &req).await;
        axfr::nsec_walk(ctx, &req.root, &req.name).await;
    }

    service_probes(ctx, &req).await;
}

async fn basic_queries(ctx: &DriverContext, req: &DnsRequest) {
    for kind in [RecordKind::Ns, RecordKind::Mx, RecordKind::Soa, RecordKind::Spf] {
        let _permit = ctx.acquire_dns().await;
        let answers = match resolve::resolve(&ctx.pool, &req.name, kind, Priority::High).await {
            Ok(answers) => answers,
            Err(_) => continue,
        };
        drop(_permit);

        for answer in &answers {
            match kind {
                RecordKind::Ns => {
                    ctx.graph.add_ns(&req.name, &answer.data);
                    ctx.graph.tag_role(&answer.data, NodeRole::Ns);
                }
                RecordKind::Mx => {
                    ctx.graph.add_mx(&req.name, &answer.data);
                    ctx.graph.tag_role(&answer.data, NodeRole::Mx);
                }
                _ => {}
            }
        }

        if !answers.is_empty() {
            let mut resolved = req.clone();
            resolved.answers = answers;
            let _ = ctx.tx.send(Event::NameResolved(resolved)).await;
        }
    }
}

async fn axfr_against_nameservers(ctx: &DriverContext, req: &DnsRequest) {
    let ns_targets = ctx.graph.ns_targets_of(&req.name);
    for ns in ns_targets {
        axfr::attempt(ctx, &req.root, &ns).await;
    }
}

async fn service_probes(ctx: &DriverContext, req: &DnsRequest) {
    for label in SRV_LABELS {
        let composite = format!("{label}.{}", req.name);
        if !ctx.srv_filter.lock().await.insert(&composite) {
            continue;
        }

        let _permit = ctx.acquire_dns().await;
        let answers = resolve::resolve(&ctx.pool, &composite, RecordKind::Srv, Priority::High).await;
        drop(_permit);

        if let Ok(answers) = answers {
            if answers.is_empty() {
                continue;
            }
            let mut srv_req = DnsRequest::new(composite, req.root.clone(), Tag::Dns, "SRV probe");
            srv_req.answers = answers;
            let _ = ctx.tx.send(Event::NameResolved(srv_req)).await;
        }
    }
}
