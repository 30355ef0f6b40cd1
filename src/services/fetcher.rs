// src/services/fetcher.rs

//! Fetch coordinator: URL intake, worker pool lifecycle, DNS
//! pre-resolution and the shared output array.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, OnceLock};

use futures::future::join_all;

use crate::models::{FetcherConfig, SummaryCard};
use crate::services::limiter::TokenBucket;
use crate::services::queue::WorkQueue;
use crate::services::worker;
use crate::utils::{log, url as url_util};

/// Candidate CA bundle locations, first readable wins.
const CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/cert.pem",
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/usr/local/etc/openssl/cert.pem",
];

/// Progress is reported roughly every 1/400th of the run.
const PROGRESS_STEPS: usize = 400;

/// State shared by every worker for the duration of one fetch run.
pub(crate) struct FetchShared {
    pub(crate) queue: WorkQueue,
    pub(crate) limiter: TokenBucket,
    pub(crate) slots: Vec<OnceLock<SummaryCard>>,
    pub(crate) next_slot: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) total: usize,
    progress_stride: usize,
    progress_enabled: bool,
    progress_lock: Mutex<()>,
}

impl FetchShared {
    /// Report a completion milestone. Gated by the stride so the stderr
    /// mutex is touched far from the per-request hot path.
    pub(crate) fn report_progress(&self, completed: usize) {
        if !self.progress_enabled {
            return;
        }
        if completed % self.progress_stride == 0 || completed == self.total {
            let _guard = self.progress_lock.lock().expect("progress mutex poisoned");
            log::progress(&format!(
                "fetched {completed}/{} summary cards",
                self.total
            ));
        }
    }
}

/// Bulk data-acquisition client for the dashboard reporting service.
///
/// Load URLs with [`load_urls`](Self::load_urls), fetch them all with
/// [`run`](Self::run), then read [`output`](Self::output). Repeated runs
/// append to the output; existing entries are preserved.
pub struct DashboardFetcher {
    config: FetcherConfig,
    urls: Vec<String>,
    ca_bundle: Option<PathBuf>,
    progress_enabled: bool,
    /// One summary card per fetched URL, readable after `run` returns.
    pub output: Vec<SummaryCard>,
}

impl DashboardFetcher {
    /// Create a fetcher. The CA bundle path is probed once here and reused
    /// by every worker client.
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            urls: Vec::new(),
            ca_bundle: probe_ca_bundle(),
            progress_enabled: true,
            output: Vec::new(),
        }
    }

    /// Enable or disable progress reporting.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress_enabled = enabled;
        self
    }

    /// Accept candidate URLs, dropping empty strings and unsupported
    /// schemes. Returns true iff at least one URL was accepted.
    pub fn load_urls(&mut self, urls: Vec<String>) -> bool {
        if urls.is_empty() {
            log::error("load_urls: provided URL list is empty");
            return false;
        }

        let mut accepted = 0usize;
        for url in urls {
            if url.is_empty() {
                log::warn("load_urls: skipping empty URL");
                continue;
            }
            if !url_util::has_supported_scheme(&url) {
                log::warn(&format!("load_urls: skipping invalid URL: {url}"));
                continue;
            }
            self.urls.push(url);
            accepted += 1;
        }

        if accepted == 0 {
            log::error("load_urls: no valid URLs found in list");
        }
        accepted > 0
    }

    /// Fetch every loaded URL with a bounded worker pool.
    ///
    /// Returns false only when no URLs are loaded or a worker failed to
    /// start. Individual fetch failures leave their slot holding a card
    /// with empty indicators and do not fail the run.
    pub async fn run(&mut self) -> bool {
        if self.urls.is_empty() {
            log::error("run: no URLs loaded, call load_urls first");
            return false;
        }

        let urls = self.urls.clone();
        let total = urls.len();
        let resolve = preresolve(&urls).await;

        let shared = Arc::new(FetchShared {
            queue: WorkQueue::new(),
            limiter: TokenBucket::new(self.config.max_requests_per_sec),
            slots: (0..total).map(|_| OnceLock::new()).collect(),
            next_slot: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            total,
            progress_stride: (total / PROGRESS_STEPS).max(1),
            progress_enabled: self.progress_enabled,
            progress_lock: Mutex::new(()),
        });

        // Fill completely, then close, then start workers: shutdown is
        // simply "queue observed empty and closed".
        for url in urls {
            shared.queue.push(url);
        }
        shared.queue.close();

        let pool = self.config.pool_size.min(total).max(1);
        let mut handles = Vec::with_capacity(pool);
        for worker_id in 0..pool {
            let client = match worker::build_client(
                self.config.timeout_ms,
                self.ca_bundle.as_deref(),
                resolve.as_ref().map(|(host, addr)| (host.as_str(), *addr)),
            ) {
                Ok(client) => client,
                Err(e) => {
                    log::error(&format!(
                        "run: failed to build HTTP client for worker {worker_id}: {e}"
                    ));
                    // Let the workers already launched drain before bailing.
                    join_all(handles).await;
                    return false;
                }
            };
            handles.push(tokio::spawn(worker::run_worker(Arc::clone(&shared), client)));
        }

        let mut all_exited_normally = true;
        for result in join_all(handles).await {
            if let Err(e) = result {
                log::error(&format!("run: worker task failed: {e}"));
                all_exited_normally = false;
            }
        }

        let shared = match Arc::try_unwrap(shared) {
            Ok(shared) => shared,
            Err(_) => {
                log::error("run: shared fetch state still referenced after join");
                return false;
            }
        };

        self.output.reserve(shared.slots.len());
        for slot in shared.slots {
            self.output.push(slot.into_inner().unwrap_or_default());
        }
        all_exited_normally
    }
}

/// Resolve the API host once so every worker can skip per-request DNS.
///
/// Concurrent cold lookups from a full pool against a local resolver were
/// the dominant startup failure; one resolution injected as an override
/// eliminates them. On failure the workers fall back to their own DNS.
async fn preresolve(urls: &[String]) -> Option<(String, SocketAddr)> {
    let host = urls.first().and_then(|u| url_util::host_of(u))?;
    let lookup_result = tokio::net::lookup_host((host.clone(), 443)).await;
    match lookup_result {
        Ok(mut addrs) => addrs.next().map(|addr| {
            log::info(&format!("resolved {host} to {}", addr.ip()));
            (host, addr)
        }),
        Err(e) => {
            log::warn(&format!(
                "preresolve: DNS lookup for {host} failed, workers will resolve individually: {e}"
            ));
            None
        }
    }
}

/// Probe the candidate CA bundle paths, returning the first readable one.
fn probe_ca_bundle() -> Option<PathBuf> {
    for path in CA_BUNDLE_PATHS {
        if std::fs::File::open(path).is_ok() {
            log::debug(&format!("using CA bundle {path}"));
            return Some(PathBuf::from(path));
        }
    }
    log::warn("no CA bundle found in the usual locations, deferring to library defaults");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_urls_filters_schemes() {
        let mut fetcher =
            DashboardFetcher::new(FetcherConfig::default()).with_progress(false);
        let accepted = fetcher.load_urls(vec![
            String::new(),
            "gopher://example.com".to_string(),
            "https://example.com/a".to_string(),
            "ftp://example.com/b".to_string(),
        ]);
        assert!(accepted);
        assert_eq!(fetcher.urls.len(), 2);
    }

    #[test]
    fn test_load_urls_rejects_all_invalid() {
        let mut fetcher =
            DashboardFetcher::new(FetcherConfig::default()).with_progress(false);
        assert!(!fetcher.load_urls(vec![]));
        assert!(!fetcher.load_urls(vec!["not-a-url".to_string(), String::new()]));
        assert!(fetcher.urls.is_empty());
    }

    #[tokio::test]
    async fn test_run_without_urls_fails() {
        let mut fetcher =
            DashboardFetcher::new(FetcherConfig::default()).with_progress(false);
        assert!(!fetcher.run().await);
    }
}
