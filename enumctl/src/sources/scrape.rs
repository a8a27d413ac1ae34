//! Search-engine scraper (§6 Source-worker contract, tag `scrape`).
//!
//! Issues a handful of `site:` queries against a search engine's HTML
//! results page per root domain and pulls subdomain-shaped hostnames out of
//! the raw markup. Best-effort: search engines vary their result markup and
//! rate-limit aggressively, so a miss here is silent rather than fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use engine::{DnsRequest, Tag};

use crate::sources::extract_subdomains;

/// Result pages to walk per root domain before moving on.
const PAGES_PER_ROOT: u32 = 3;
const RESULTS_PER_PAGE: u32 = 20;

pub struct ScrapeSource {
    stopped: Arc<AtomicBool>,
}

impl ScrapeSource {
    pub fn new() -> Self {
        ScrapeSource { stopped: Arc::new(AtomicBool::new(false)) }
    }
}

impl Default for ScrapeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl engine::source::SourceWorker for ScrapeSource {
    fn name(&self) -> &str {
        "scrape"
    }

    fn accepts_subdomains(&self) -> bool {
        false
    }

    async fn start(
        &self,
        roots: Vec<String>,
        out: mpsc::Sender<DnsRequest>,
        mut requests: mpsc::Receiver<engine::source::SourceRequest>,
    ) {
        requests.close();

        for root in roots {
            if self.stopped.load(Ordering::Relaxed) {
                return;
            }

            for page in 0..PAGES_PER_ROOT {
                if self.stopped.load(Ordering::Relaxed) {
                    return;
                }

                let root_clone = root.clone();
                let fetch = tokio::task::spawn_blocking(move || fetch_page(&root_clone, page));
                let names = match fetch.await {
                    Ok(Ok(names)) => names,
                    Ok(Err(e)) => {
                        log::warn!("scrape source: page {page} failed for {root}: {e}");
                        break;
                    }
                    Err(e) => {
                        log::warn!("scrape source: page {page} task panicked for {root}: {e}");
                        break;
                    }
                };

                if names.is_empty() {
                    break;
                }

                log::info!("scrape source: {} candidate name(s) for {root} (page {page})", names.len());
                for name in names {
                    let req = DnsRequest::new(name, root.clone(), Tag::Scrape, "search-engine scrape");
                    if out.send(req).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

fn fetch_page(root: &str, page: u32) -> reqwest::Result<Vec<String>> {
    let first = page * RESULTS_PER_PAGE;
    let url = format!("https://www.bing.com/search?q=site%3A{root}&first={first}&count={RESULTS_PER_PAGE}");
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(20))
        .user_agent("Mozilla/5.0 (compatible; enumctl-scrape/0.1)")
        .build()?;

    let body = client.get(&url).send()?.text()?;
    Ok(extract_subdomains(&body, root).into_iter().collect())
}
