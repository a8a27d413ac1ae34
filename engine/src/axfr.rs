//! Zone Transfer and NSEC Walking (§4.7, part of the Subdomain Expander's
//! 10% share): two independent techniques for enumerating a zone directly
//! against its own nameservers, both gated behind active mode.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::bus::Event;
use crate::driver::DriverContext;
use crate::model::{AnswerRecord, DnsRequest, Priority, RecordKind, Tag};
use crate::resolve;
use crate::util;
use crate::wire;

const AXFR_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const AXFR_READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_WALK_STEPS: usize = 500;

/// AXFR against one advertised nameserver (§4.7 AXFR): resolve its
/// addresses, then attempt a zone transfer against each.
pub async fn attempt(ctx: &DriverContext, root: &str, ns_name: &str) {
    for addr in resolve_ns_addresses(ctx, ns_name).await {
        if let Err(err) = axfr_one(ctx, root, ns_name, addr).await {
            log::debug!("AXFR against {ns_name} ({addr}) for zone {root} failed: {err}");
        }
    }
}

async fn resolve_ns_addresses(ctx: &DriverContext, ns_name: &str) -> Vec<IpAddr> {
    let mut out = Vec::new();
    for kind in [RecordKind::A, RecordKind::Aaaa] {
        let _permit = ctx.acquire_dns().await;
        let answers = resolve::resolve(&ctx.pool, ns_name, kind, Priority::High).await;
        drop(_permit);
        if let Ok(answers) = answers {
            out.extend(answers.into_iter().filter_map(|a| a.data.parse().ok()));
        }
    }
    out
}

async fn axfr_one(ctx: &DriverContext, root: &str, ns_name: &str, addr: IpAddr) -> Result<(), crate::error::DnsError> {
    let _permit = ctx.acquire_dns().await;
    let sock = SocketAddr::new(addr, 53);
    let mut stream = timeout(AXFR_CONNECT_TIMEOUT, TcpStream::connect(sock))
        .await
        .map_err(|e| crate::error::DnsError::transport(e.to_string()))?
        .map_err(crate::error::DnsError::from)?;

    let id = rand::random();
    let message = wire::build_query(id, root, RecordKind::Axfr)?;
    let bytes = wire::encode(&message)?;
    let len = (bytes.len() as u16).to_be_bytes();

    timeout(AXFR_READ_TIMEOUT, async {
        stream.write_all(&len).await?;
        stream.write_all(&bytes).await?;
        Ok::<_, std::io::Error>(())
    })
    .await
    .map_err(|e| crate::error::DnsError::transport(e.to_string()))?
    .map_err(crate::error::DnsError::from)?;

    let mut owners: HashMap<String, Vec<AnswerRecord>> = HashMap::new();
    let mut soa_seen = 0u32;

    loop {
        let reply = timeout(AXFR_READ_TIMEOUT, read_framed(&mut stream))
            .await
            .map_err(|e| crate::error::DnsError::transport(e.to_string()))?
            .map_err(crate::error::DnsError::from)?;

        let parsed = wire::decode(&reply)?;
        if parsed.answers.is_empty() {
            break;
        }
        for answer in &parsed.answers {
            if answer.kind == RecordKind::Soa {
                soa_seen += 1;
            }
            owners.entry(answer.name.clone()).or_default().push(answer.clone());
        }
        // A full AXFR response starts and ends with the zone's SOA record.
        if soa_seen >= 2 {
            break;
        }
    }

    for (owner, answers) in owners {
        let mut req = DnsRequest::new(owner, root.to_string(), Tag::Axfr, format!("AXFR {ns_name}"));
        req.answers = answers;
        let _ = ctx.tx.send(Event::NameResolved(req)).await;
    }
    Ok(())
}

async fn read_framed(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

/// NSEC walk (§4.7): forces NXDOMAIN/NSEC responses by querying synthesized
/// names the zone almost certainly doesn't contain, then follows each
/// reply's `NextDomain` forward. Terminates as soon as a step makes no
/// progress, per the §8 boundary behavior around `walkHostPart`.
pub async fn nsec_walk(ctx: &DriverContext, domain: &str, trigger_name: &str) {
    let mut cursor = format!("0.{domain}");
    let mut previous_host = String::new();

    for _ in 0..MAX_WALK_STEPS {
        let _permit = ctx.acquire_dns().await;
        let reply = query_for_nsec(ctx, &cursor).await;
        drop(_permit);

        let Some(parsed) = reply else { break };

        let host = util::walk_host_part(&cursor, domain);
        if !host.is_empty() && is_valid_label_string(host) && host > previous_host.as_str() {
            let mut req = DnsRequest::new(cursor.clone(), domain.to_string(), Tag::Dns, "NSEC Walk");
            req.answers = parsed.answers;
            let _ = ctx.tx.send(Event::NameResolved(req)).await;
            previous_host = host.to_string();
        }

        match parsed.nsec_next {
            Some(next) if next != cursor => cursor = crate::model::canonicalize_name(&next),
            _ => break,
        }
    }

    log::debug!("NSEC walk of {domain} (triggered by {trigger_name}) stopped at {cursor}");
}

async fn query_for_nsec(ctx: &DriverContext, name: &str) -> Option<wire::ParsedReply> {
    let query_id = rand::random();
    let message = wire::build_query(query_id, name, RecordKind::A).ok()?;
    let bytes = wire::encode(&message).ok()?;
    let client = ctx.pool.next_resolver().await.ok()?;
    // The authority-section NSEC data isn't exposed through the
    // higher-level `resolve` API, so this goes straight at a pool client's
    // socket the same way `ResolverClient::resolve` does internally.
    client.round_trip(query_id, &bytes).await.ok()
}

fn is_valid_label_string(host: &str) -> bool {
    !host.is_empty() && host.split('.').all(|label| {
        !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}
