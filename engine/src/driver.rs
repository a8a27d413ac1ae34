//! Enumeration Driver (§4.4, §2 18% share): the event-bus coordinator that
//! wires `NewName` → dedup → DNS resolve → `NameResolved` → graph →
//! `NewSubdomain` → expansion/sweeps back into the loop. Every stage is a
//! plain async function taking a shared [`DriverContext`]; the driver's
//! `run` loop just pattern-matches the next [`Event`] and spawns the right
//! one.

use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, Ordering};

use ipnet::IpNet;
use tokio::sync::{mpsc, Mutex as TokioMutex, Semaphore};

use crate::bus::Event;
use crate::config::EngineConfig;
use crate::expander;
use crate::filters::NameFilter;
use crate::graph::{self, GraphStore, OutputRecord};
use crate::model::{AddressInfo, DnsRequest, Priority, RecordKind, Tag};
use crate::resolve;
use crate::resolver::ResolverPool;
use crate::source::SourceRequest;
use crate::sweep;
use crate::wildcard::WildcardDetector;

/// Initial probe order (§4.4 step 2): CNAME first — a non-empty CNAME
/// answer short-circuits the rest — then TXT, A, AAAA.
const INITIAL_TYPES_AFTER_CNAME: &[RecordKind] = &[RecordKind::Txt, RecordKind::A, RecordKind::Aaaa];

/// Everything the driver's stage functions share. Owned by
/// [`crate::enumeration::Enumeration`] and handed out by `&` reference —
/// never cloned wholesale, since the channels and lock-guarded state inside
/// are meant to be shared, not duplicated.
pub struct DriverContext {
    pub config: EngineConfig,
    pub pool: ResolverPool,
    pub wildcard: WildcardDetector,
    pub graph: GraphStore,
    pub sem: Semaphore,
    pub tx: mpsc::Sender<Event>,
    pub output_tx: mpsc::Sender<OutputRecord>,
    pub name_filter: TokioMutex<NameFilter>,
    pub srv_filter: TokioMutex<NameFilter>,
    /// Populated once by [`crate::source::SourceCoordinator::start`] with
    /// the request senders of every running subdomain-accepting source, so
    /// the expander/sweeper can reach them without holding a coordinator
    /// reference of their own.
    pub source_requests: tokio::sync::OnceCell<Vec<mpsc::Sender<SourceRequest>>>,
    in_flight: AtomicI64,
}

impl DriverContext {
    pub fn new(
        config: EngineConfig,
        pool: ResolverPool,
        tx: mpsc::Sender<Event>,
        output_tx: mpsc::Sender<OutputRecord>,
    ) -> Self {
        let sem_permits = config.sem_max_dns_queries;
        DriverContext {
            config,
            pool,
            wildcard: WildcardDetector::new(),
            graph: GraphStore::new(),
            sem: Semaphore::new(sem_permits),
            tx,
            output_tx,
            name_filter: TokioMutex::new(NameFilter::new()),
            srv_filter: TokioMutex::new(NameFilter::new()),
            source_requests: tokio::sync::OnceCell::new(),
            in_flight: AtomicI64::new(0),
        }
    }

    /// In-flight + queued names, the metric the driver's shutdown poll
    /// watches (§4.4 "driver polls a metrics callback `namesRemaining()`").
    pub fn names_remaining(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn begin_name(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn end_name(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Acquire the DNS concurrency semaphore and count the transaction
    /// against `names_remaining()` for its whole lifetime (§4.4: every
    /// in-flight DNS transaction counts, not just the top-level `NewName`
    /// lifecycle). Dropping the returned guard releases both.
    pub async fn acquire_dns(&self) -> DnsPermit<'_> {
        let permit = self.sem.acquire().await.expect("semaphore is never closed");
        self.begin_name();
        DnsPermit { _permit: permit, ctx: self }
    }

    /// Forward an on-demand per-name lookup to every running source that
    /// accepts subdomain-level requests (§4.9/§6). A no-op until
    /// [`crate::source::SourceCoordinator::start`] has populated
    /// `source_requests`.
    pub async fn request_source(&self, req: SourceRequest) {
        if let Some(senders) = self.source_requests.get() {
            for tx in senders {
                let _ = tx.send(req.clone()).await;
            }
        }
    }
}

/// RAII guard returned by [`DriverContext::acquire_dns`]: holds the
/// semaphore permit and decrements `in_flight` on drop.
pub struct DnsPermit<'a> {
    _permit: tokio::sync::SemaphorePermit<'a>,
    ctx: &'a DriverContext,
}

impl Drop for DnsPermit<'_> {
    fn drop(&mut self) {
        self.ctx.end_name();
    }
}

/// Drain `rx`, dispatching each event to its handler on a fresh task so no
/// stage ever blocks the bus (§5 Scheduling model).
pub async fn run(ctx: std::sync::Arc<DriverContext>, mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            match event {
                Event::NewName(req) => handle_new_name(&ctx, req).await,
                Event::NameResolved(req) => handle_name_resolved(&ctx, req).await,
                Event::NewSubdomain(req, _count) => expander::expand(&ctx, req).await,
                Event::NewAddress(owner, ip) => handle_new_address(&ctx, owner, ip).await,
                Event::ReverseSweep(addr, cidr) => sweep::run(&ctx, addr, cidr).await,
                Event::NewAsn(_, _) => {}
                Event::Output(record) => {
                    let _ = ctx.output_tx.send(record).await;
                }
            }
        });
    }
}

/// Submit a brand-new candidate name for enumeration (§4.4 step 1).
/// Deduplicates against the in-filter; returns `true` if it was admitted.
pub async fn submit(ctx: &DriverContext, req: DnsRequest) -> bool {
    if ctx.config.blacklisted_name(&req.name) {
        log::debug!("{}: dropped by name blacklist before resolution", req.name);
        return false;
    }
    let admitted = ctx.name_filter.lock().await.insert(&req.name);
    if admitted {
        ctx.begin_name();
        let _ = ctx.tx.send(Event::NewName(req)).await;
    }
    admitted
}

async fn handle_new_name(ctx: &DriverContext, req: DnsRequest) {
    let mut resolved = req.clone();

    let cname_answers = probe(ctx, &req.name, RecordKind::Cname, Priority::Low).await;
    if !cname_answers.is_empty() {
        resolved.answers = cname_answers;
    } else {
        let mut answers = Vec::new();
        for kind in INITIAL_TYPES_AFTER_CNAME {
            answers.extend(probe(ctx, &req.name, *kind, Priority::Low).await);
        }
        resolved.answers = answers;
    }

    if has_blacklisted_answer(ctx, &resolved) {
        log::warn!("{}: answer set rejected by sinkhole blacklist", resolved.name);
        ctx.end_name();
        return;
    }

    let suppressed = if req.tag.is_trusted() {
        false
    } else {
        let answer_data: Vec<String> = resolved.answers.iter().map(|a| a.data.clone()).collect();
        ctx.wildcard.matches(ctx, &resolved.name, &resolved.root, &answer_data).await
    };

    ctx.end_name();

    if !suppressed {
        let _ = ctx.tx.send(Event::NameResolved(resolved)).await;
    }
}

async fn probe(ctx: &DriverContext, name: &str, kind: RecordKind, priority: Priority) -> Vec<crate::model::AnswerRecord> {
    let _permit = ctx.acquire_dns().await;
    resolve::resolve(&ctx.pool, name, kind, priority).await.unwrap_or_default()
}

fn has_blacklisted_answer(ctx: &DriverContext, req: &DnsRequest) -> bool {
    req.answers.iter().any(|a| {
        a.kind == RecordKind::A && a.data.parse::<IpAddr>().map(|ip| ctx.config.blacklisted(ip)).unwrap_or(false)
    })
}

async fn handle_name_resolved(ctx: &DriverContext, req: DnsRequest) {
    ctx.graph.add_root_of(&req.root, &req.name);
    let occurrence_count = ctx.graph.touch_subdomain(&req.name);

    for answer in &req.answers {
        match answer.kind {
            RecordKind::Cname => ctx.graph.add_cname(&req.name, &answer.data),
            RecordKind::Ns => {
                ctx.graph.add_ns(&req.name, &answer.data);
                ctx.graph.tag_role(&answer.data, graph::NodeRole::Ns);
            }
            RecordKind::Mx => {
                ctx.graph.add_mx(&req.name, &answer.data);
                ctx.graph.tag_role(&answer.data, graph::NodeRole::Mx);
            }
            RecordKind::Srv => ctx.graph.add_srv(&req.name, &answer.data),
            RecordKind::A | RecordKind::Aaaa => {
                if let Ok(ip) = answer.data.parse::<IpAddr>() {
                    if answer.kind == RecordKind::A {
                        ctx.graph.add_a(&req.name, ip);
                    } else {
                        ctx.graph.add_aaaa(&req.name, ip);
                    }
                    let _ = ctx.tx.send(Event::NewAddress(req.name.clone(), ip)).await;
                }
            }
            _ => {}
        }
    }

    if occurrence_count == 1 {
        let _ = ctx.tx.send(Event::NewSubdomain(req.clone(), occurrence_count)).await;
    }

    emit_output_if_ready(ctx, &req).await;
}

async fn emit_output_if_ready(ctx: &DriverContext, req: &DnsRequest) {
    if let Some(record) = ctx.graph.walk_name(&req.name) {
        if ctx.graph.mark_sent(&req.name) {
            let _ = ctx.tx.send(Event::Output(record)).await;
        }
    } else if ctx.config.include_unresolvable && ctx.config.is_domain_in_scope(&req.name) && ctx.graph.mark_sent(&req.name)
    {
        let record = OutputRecord {
            name: req.name.clone(),
            addresses: Vec::new(),
            classification: graph::Classification::Norm,
        };
        let _ = ctx.tx.send(Event::Output(record)).await;
    }
}

async fn handle_new_address(ctx: &DriverContext, _owner: String, ip: IpAddr) {
    // No ASN/netblock data source is in scope for the core (§1 lists only
    // passive name sources); the containing CIDR used for the sweep window
    // is the address's own aligned /24 (v4) or /64 (v6) rather than a real
    // routing-registry prefix. See DESIGN.md for this decision.
    let prefix_len = if ip.is_ipv4() { 24 } else { 64 };
    let Ok(cidr) = IpNet::new(ip, prefix_len).map(|n| n.trunc()) else { return };

    ctx.graph.set_address_info(&AddressInfo { ip, netblock: Some(cidr), asn: None, asn_description: None });
    let _ = ctx.tx.send(Event::ReverseSweep(ip, cidr)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig::new(vec!["example.com".to_string()])
    }

    #[tokio::test]
    async fn submit_dedups_the_same_name() {
        let pool = ResolverPool::new(&[]).await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let (out_tx, _out_rx) = mpsc::channel(16);
        let ctx = DriverContext::new(test_config(), pool, tx, out_tx);

        let req_a = DnsRequest::new("www.example.com", "example.com", Tag::Dns, "test");
        let req_b = DnsRequest::new("WWW.example.com.", "example.com", Tag::Dns, "test");

        assert!(submit(&ctx, req_a).await);
        assert!(!submit(&ctx, req_b).await);
        assert!(matches!(rx.try_recv().unwrap(), Event::NewName(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sinkhole_answer_is_flagged_by_the_blacklist_check() {
        let pool = ResolverPool::new(&[]).await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let (out_tx, _out_rx) = mpsc::channel(16);
        let ctx = DriverContext::new(test_config(), pool, tx, out_tx);

        let mut req = DnsRequest::new("foo.example.com", "example.com", Tag::Dns, "test");
        req.answers = vec![crate::model::AnswerRecord::new("foo.example.com", RecordKind::A, 60, "198.105.244.5")];
        assert!(has_blacklisted_answer(&ctx, &req));

        req.answers = vec![crate::model::AnswerRecord::new("foo.example.com", RecordKind::A, 60, "1.2.3.4")];
        assert!(!has_blacklisted_answer(&ctx, &req));
    }
}
