//! Web-archive crawler (§6 Source-worker contract, tag `archive`).
//!
//! Walks the Wayback Machine's CDX index for each root domain, rate-limited
//! per §4.9 since a burst of CDX queries gets this source's IP rate-limited
//! by the upstream service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use engine::source::RateLimit;
use engine::{DnsRequest, Tag};

use crate::sources::extract_subdomains;

const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(2);

pub struct ArchiveSource {
    stopped: Arc<AtomicBool>,
    rate_limit: RateLimit,
}

impl ArchiveSource {
    pub fn new() -> Self {
        ArchiveSource { stopped: Arc::new(AtomicBool::new(false)), rate_limit: RateLimit::new(RATE_LIMIT_INTERVAL) }
    }
}

impl Default for ArchiveSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl engine::source::SourceWorker for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
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

            self.rate_limit.wait().await;

            let root_clone = root.clone();
            let fetch = tokio::task::spawn_blocking(move || fetch_cdx(&root_clone));
            let names = match fetch.await {
                Ok(Ok(names)) => names,
                Ok(Err(e)) => {
                    log::warn!("archive source: CDX lookup failed for {root}: {e}");
                    continue;
                }
                Err(e) => {
                    log::warn!("archive source: CDX task panicked for {root}: {e}");
                    continue;
                }
            };

            log::info!("archive source: {} candidate name(s) for {root}", names.len());
            for name in names {
                let req = DnsRequest::new(name, root.clone(), Tag::Archive, "web.archive.org");
                if out.send(req).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

fn fetch_cdx(root: &str) -> reqwest::Result<Vec<String>> {
    let url = format!(
        "https://web.archive.org/cdx/search/cdx?url=*.{root}&output=json&fl=original&collapse=urlkey&limit=5000"
    );
    let client = reqwest::blocking::Client::builder().timeout(std::time::Duration::from_secs(30)).build()?;
    let rows: Vec<Vec<String>> = client.get(&url).send()?.json().unwrap_or_default();

    let mut names = std::collections::HashSet::new();
    for row in rows.iter().skip(1) {
        if let Some(url) = row.first() {
            if let Some(host) = host_of(url) {
                names.extend(extract_subdomains(&host, root));
            }
        }
    }
    Ok(names.into_iter().collect())
}

/// Pull the host out of a URL without a full URL-parsing dependency: strip
/// the scheme, then take everything up to the next `/`, `:`, `?`, or `#`.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let end = rest.find(['/', ':', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];
    if host.is_empty() { None } else { Some(host.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("http://sub.example.com/a/b?c=1"), Some("sub.example.com".to_string()));
        assert_eq!(host_of("https://example.com:8080/"), Some("example.com".to_string()));
    }
}
