//! The `Enumeration` object (§3 "Enumeration object", §9 "Global state"):
//! one value per run, owning the resolver pool, wildcard cache, graph,
//! filters, and driver task. No process-wide singleton holds any of this,
//! so multiple `Enumeration`s can run concurrently in the same process
//! without cross-talk.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::bus;
use crate::config::EngineConfig;
use crate::driver::{self, DriverContext};
use crate::error::EngineError;
use crate::graph::OutputRecord;
use crate::model::{DnsRequest, Tag};
use crate::resolver::ResolverPool;
use crate::source::SourceCoordinator;
use crate::source::SourceWorker;

/// Output channel capacity: generous relative to typical walked-output
/// batch sizes so the CLI's sink consumer rarely backpressures the driver.
const OUTPUT_CHANNEL_CAPACITY: usize = 4096;

/// How often [`Enumeration::wait_until_idle`] polls `namesRemaining()`.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Enumeration {
    ctx: Arc<DriverContext>,
    coordinator: SourceCoordinator,
    output_rx: mpsc::Receiver<OutputRecord>,
}

impl Enumeration {
    /// Build a fresh enumeration: dial the resolver pool, start the driver
    /// loop, and start every enabled source.
    pub async fn new(config: EngineConfig, sources: Vec<Arc<dyn SourceWorker>>) -> Result<Self, EngineError> {
        let pool = ResolverPool::new(&config.resolver_addrs()).await?;
        let (tx, rx) = bus::channel();
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        let ctx = Arc::new(DriverContext::new(config, pool, tx, output_tx));

        tokio::spawn(driver::run(ctx.clone(), rx));
        let coordinator = SourceCoordinator::start(ctx.clone(), sources);

        Ok(Enumeration { ctx, coordinator, output_rx })
    }

    /// Seed the pipeline with the root domains themselves, so they flow
    /// through the same `NewName` → resolve → graph path as any other
    /// discovered candidate.
    pub async fn seed_roots(&self) {
        for root in self.ctx.config.root_domains.clone() {
            let req = DnsRequest::new(root.clone(), root, Tag::Dns, "seed");
            driver::submit(&self.ctx, req).await;
        }
    }

    /// Next walked output record, or `None` once the channel closes (the
    /// driver task exited).
    pub async fn next_output(&mut self) -> Option<OutputRecord> {
        self.output_rx.recv().await
    }

    /// Non-blocking drain, used after [`Enumeration::wait_until_idle`] to
    /// pick up anything emitted in the gap between the idle check and the
    /// caller noticing it.
    pub fn try_next_output(&mut self) -> Result<OutputRecord, mpsc::error::TryRecvError> {
        self.output_rx.try_recv()
    }

    /// In-flight + queued names across the whole enumeration.
    pub fn names_remaining(&self) -> i64 {
        self.ctx.names_remaining()
    }

    /// Block until no names are in flight or queued (§4.4 Shutdown: "the
    /// driver polls a metrics callback `namesRemaining()`").
    pub async fn wait_until_idle(&self) {
        loop {
            if self.ctx.names_remaining() <= 0 {
                return;
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Graph node counts, exposed for progress reporting and tests
    /// (§8 invariant 5: graph counts are monotonic non-decreasing).
    pub fn node_counts(&self) -> (usize, usize, usize, usize) {
        self.ctx.graph.node_counts()
    }

    /// Stop every source and every resolver client. Call once
    /// [`Enumeration::wait_until_idle`] has returned.
    pub async fn shutdown(&self) {
        self.coordinator.stop_all().await;
        self.ctx.pool.stop_all().await;
    }
}

/// Submit a name directly, bypassing the root-domain seeding helper — used
/// by callers feeding in names discovered outside the normal source
/// workers (e.g. a CLI `--also-resolve` flag).
pub async fn submit_name(enumeration: &Enumeration, req: DnsRequest) -> bool {
    driver::submit(&enumeration.ctx, req).await
}
