//! Certificate-transparency scraper (§6 Source-worker contract, tag `cert`).
//!
//! Queries crt.sh's JSON search endpoint for each root domain once at
//! startup. Names surfaced this way are evidence-grade (a CA actually
//! issued a certificate naming them), so [`engine::Tag::Cert`] is marked
//! trusted and bypasses wildcard suppression (§3 Tag, §4.4).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tokio::sync::mpsc;

use engine::{DnsRequest, Tag};

use crate::sources::extract_subdomains;

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

pub struct CertSource {
    stopped: Arc<AtomicBool>,
}

impl CertSource {
    pub fn new() -> Self {
        CertSource { stopped: Arc::new(AtomicBool::new(false)) }
    }
}

impl Default for CertSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl engine::source::SourceWorker for CertSource {
    fn name(&self) -> &str {
        "cert"
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

            let root_clone = root.clone();
            let fetch = tokio::task::spawn_blocking(move || fetch_crtsh(&root_clone));
            let names = match fetch.await {
                Ok(Ok(names)) => names,
                Ok(Err(e)) => {
                    log::warn!("cert source: crt.sh lookup failed for {root}: {e}");
                    continue;
                }
                Err(e) => {
                    log::warn!("cert source: crt.sh task panicked for {root}: {e}");
                    continue;
                }
            };

            log::info!("cert source: {} candidate name(s) for {root}", names.len());
            for name in names {
                let req = DnsRequest::new(name, root.clone(), Tag::Cert, "crt.sh");
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

fn fetch_crtsh(root: &str) -> reqwest::Result<Vec<String>> {
    let url = format!("https://crt.sh/?q=%25.{root}&output=json");
    let client = reqwest::blocking::Client::builder().timeout(std::time::Duration::from_secs(30)).build()?;
    let entries: Vec<CrtShEntry> = client.get(&url).send()?.json()?;

    let mut names = std::collections::HashSet::new();
    for entry in entries {
        for line in entry.name_value.lines() {
            names.extend(extract_subdomains(line, root));
        }
    }
    Ok(names.into_iter().collect())
}
