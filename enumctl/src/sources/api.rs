//! Passive-DNS API scraper (§6 Source-worker contract, tag `api`).
//!
//! Unlike [`super::cert::CertSource`] and [`super::archive::ArchiveSource`],
//! this source `accepts_subdomains`: the expander/sweeper can ask it "what
//! do you know about this specific name" on the fly via its `SourceRequest`
//! channel, in addition to the free-running per-root lookup it does at
//! startup. Stands in for any of the passive-DNS API providers a real
//! deployment would wire in; the base URL is a constructor parameter rather
//! than a hardcoded vendor endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use engine::source::SourceRequest;
use engine::{DnsRequest, Tag};

use crate::sources::extract_subdomains;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    names: Vec<String>,
}

pub struct ApiSource {
    base_url: String,
    stopped: Arc<AtomicBool>,
}

impl ApiSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiSource { base_url: base_url.into(), stopped: Arc::new(AtomicBool::new(false)) }
    }
}

#[async_trait::async_trait]
impl engine::source::SourceWorker for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    fn accepts_subdomains(&self) -> bool {
        true
    }

    async fn start(&self, roots: Vec<String>, out: mpsc::Sender<DnsRequest>, mut requests: mpsc::Receiver<SourceRequest>) {
        for root in &roots {
            if self.stopped.load(Ordering::Relaxed) {
                return;
            }
            self.lookup_and_publish(root, root, &out).await;
        }

        loop {
            if self.stopped.load(Ordering::Relaxed) {
                return;
            }

            tokio::select! {
                maybe_req = requests.recv() => {
                    match maybe_req {
                        Some(req) => self.lookup_and_publish(&req.name, &req.root, &out).await,
                        None => return,
                    }
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

impl ApiSource {
    async fn lookup_and_publish(&self, query: &str, root: &str, out: &mpsc::Sender<DnsRequest>) {
        let base_url = self.base_url.clone();
        let query = query.to_string();
        let fetch = tokio::task::spawn_blocking(move || fetch_names(&base_url, &query));
        let names = match fetch.await {
            Ok(Ok(names)) => names,
            Ok(Err(e)) => {
                log::warn!("api source: lookup failed for {query}: {e}");
                return;
            }
            Err(e) => {
                log::warn!("api source: lookup task panicked for {query}: {e}");
                return;
            }
        };

        for name in names {
            let req = DnsRequest::new(name, root, Tag::Api, "passive-api");
            if out.send(req).await.is_err() {
                return;
            }
        }
    }
}

fn fetch_names(base_url: &str, query: &str) -> reqwest::Result<Vec<String>> {
    let url = format!("{base_url}/api/v1/dns/{query}");
    let client = reqwest::blocking::Client::builder().timeout(std::time::Duration::from_secs(15)).build()?;
    let resp: ApiResponse = client.get(&url).send()?.json()?;

    let mut names = std::collections::HashSet::new();
    for name in resp.names {
        names.extend(extract_subdomains(&name, query));
    }
    Ok(names.into_iter().collect())
}
