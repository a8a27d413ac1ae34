//! Source Coordinator (§4.9, §2 6% share, ambient): owns the lifecycle of
//! every configured [`SourceWorker`], demultiplexes on-demand per-name
//! requests from the expander/sweeper, multiplexes each source's `NewName`
//! stream onto the driver's event bus, and rate-limits archive-style
//! crawlers.
//!
//! This module knows nothing about any specific source's scraping logic —
//! only the trait surface below. Concrete sources (certificate-transparency
//! scraper, search-engine scraper, passive-API scraper, web-archive
//! crawler) live in the CLI crate and implement this trait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::driver::{self, DriverContext};
use crate::model::DnsRequest;

/// On-demand request a source may receive once running: "look up whatever
/// you know about this name", used by the expander/sweeper to query
/// sources that accept targeted lookups rather than only free-running scrapes.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub name: String,
    pub root: String,
}

/// External collaborator contract (§6 Source-worker contract). A source
/// produces `NewName` candidates, either by free-running (search engines,
/// certificate-transparency logs, archives) or by responding to targeted
/// [`SourceRequest`]s (passive-data APIs).
#[async_trait::async_trait]
pub trait SourceWorker: Send + Sync {
    /// Stable identifier, matched against `EngineConfig::disabled_sources`.
    fn name(&self) -> &str;

    /// Whether this source accepts subdomain-level on-demand requests, as
    /// opposed to only root-domain free-running scrapes.
    fn accepts_subdomains(&self) -> bool;

    /// Start producing `NewName` events onto `out` for every domain in
    /// `roots`, reading on-demand requests from `requests` until either
    /// `out`'s receiver is dropped or `stop` is called. Must return once
    /// the work driving it is done; the coordinator doesn't poll for
    /// completion otherwise.
    async fn start(&self, roots: Vec<String>, out: mpsc::Sender<DnsRequest>, requests: mpsc::Receiver<SourceRequest>);

    /// Request cooperative shutdown; `start`'s loop should observe this on
    /// its next iteration and return.
    async fn stop(&self);
}

/// Per-source archive-style rate limit (§4.9): a fixed delay a rate-limited
/// source's own request loop should sleep before each outgoing request.
pub struct RateLimit {
    pub min_interval: Duration,
}

impl RateLimit {
    pub fn new(min_interval: Duration) -> Self {
        RateLimit { min_interval }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(self.min_interval).await;
    }
}

struct RunningSource {
    worker: Arc<dyn SourceWorker>,
    request_tx: mpsc::Sender<SourceRequest>,
}

/// Owns every enabled source's task and forwards their output onto the
/// driver bus.
pub struct SourceCoordinator {
    running: Vec<RunningSource>,
}

impl SourceCoordinator {
    /// Start every `source` not named in `ctx.config.disabled_sources`, one
    /// task per source, fed every configured root domain at once.
    pub fn start(ctx: Arc<DriverContext>, sources: Vec<Arc<dyn SourceWorker>>) -> Self {
        let mut running = Vec::new();
        let roots = ctx.config.root_domains.clone();

        for worker in sources {
            if !ctx.config.is_source_enabled(worker.name()) {
                log::info!("source {} disabled by config, skipping", worker.name());
                continue;
            }

            let (request_tx, request_rx) = mpsc::channel::<SourceRequest>(256);
            let (out_tx, mut out_rx) = mpsc::channel::<DnsRequest>(1024);

            let task_worker = worker.clone();
            let task_roots = roots.clone();
            tokio::spawn(async move {
                task_worker.start(task_roots, out_tx, request_rx).await;
            });

            let ctx_clone = ctx.clone();
            tokio::spawn(async move {
                while let Some(req) = out_rx.recv().await {
                    driver::submit(&ctx_clone, req).await;
                }
            });

            running.push(RunningSource { worker, request_tx });
        }

        let subdomain_senders: Vec<_> = running
            .iter()
            .filter(|r| r.worker.accepts_subdomains())
            .map(|r| r.request_tx.clone())
            .collect();
        // Best-effort: `start` only ever runs once per `Enumeration`, so this
        // always succeeds, but a stray second call shouldn't panic.
        let _ = ctx.source_requests.set(subdomain_senders);

        SourceCoordinator { running }
    }

    /// Forward an on-demand lookup to every running source that accepts
    /// subdomain-level requests (used by the expander/sweeper for
    /// on-the-fly enrichment of a freshly discovered name).
    pub async fn request(&self, req: SourceRequest) {
        for source in &self.running {
            if source.worker.accepts_subdomains() {
                let _ = source.request_tx.send(req.clone()).await;
            }
        }
    }

    pub async fn stop_all(&self) {
        for source in &self.running {
            source.worker.stop().await;
        }
    }
}
