// src/services/worker.rs

//! Fetch worker: persistent HTTP handle, retry policy, slotted delivery.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT,
};
use reqwest::{Certificate, Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::SummaryCard;
use crate::services::fetcher::FetchShared;
use crate::utils::log;

/// Browser-shaped identity. The server throttles requests without one.
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REFERER_VALUE: &str = "https://www.caschooldashboard.org/";

/// Attempts per URL, counting the first one.
const MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Build the persistent per-worker HTTP client.
///
/// Keep-alive, NODELAY, HTTP/2-over-TLS with HTTP/1.1 fallback, and the
/// browser header set are all fixed for the lifetime of the worker. TLS
/// session state is intentionally per-client and never shared; the CA
/// bundle and the DNS override come from the coordinator.
pub(crate) fn build_client(
    timeout_ms: u64,
    ca_bundle: Option<&Path>,
    resolve: Option<(&str, SocketAddr)>,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(REFERER, HeaderValue::from_static(REFERER_VALUE));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    let mut builder = Client::builder()
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(Duration::from_millis(timeout_ms))
        .tcp_keepalive(Duration::from_secs(30))
        .tcp_keepalive_interval(Duration::from_secs(15))
        .tcp_nodelay(true)
        .use_rustls_tls();

    if let Some(path) = ca_bundle {
        let pem = std::fs::read(path)?;
        for cert in Certificate::from_pem_bundle(&pem)? {
            builder = builder.add_root_certificate(cert);
        }
        builder = builder.tls_built_in_root_certs(false);
    }
    if let Some((host, addr)) = resolve {
        builder = builder.resolve(host, addr);
    }

    Ok(builder.build()?)
}

/// Drain the queue until it is closed and empty.
///
/// Each iteration claims the next output slot with an atomic fetch-add, so
/// writes are disjoint and need no lock. A failed fetch leaves its card
/// with whatever partial state remained and never aborts peers.
pub(crate) async fn run_worker(shared: Arc<FetchShared>, client: Client) {
    while let Some(url) = shared.queue.pop().await {
        shared.limiter.acquire().await;

        let slot = shared.next_slot.fetch_add(1, Ordering::Relaxed);
        let mut card = SummaryCard::new();
        if let Err(e) = fetch_into(&client, &url, &mut card).await {
            log::error(&format!("fetch failed [{url}]: {e}"));
        }
        if shared.slots[slot].set(card).is_err() {
            // One claim per slot; a second write means the accounting broke.
            log::error(&format!("duplicate write to output slot {slot}"));
        }

        let completed = shared.completed.fetch_add(1, Ordering::Relaxed) + 1;
        shared.report_progress(completed);
    }
}

/// Fetch one URL into `card`, retrying transient transport faults with
/// exponential backoff. Protocol errors (bad status, empty body, non-JSON
/// body) are returned without retry and without decoding.
pub(crate) async fn fetch_into(client: &Client, url: &str, card: &mut SummaryCard) -> Result<()> {
    let mut attempt = 0u32;
    let status = loop {
        if attempt > 0 {
            card.clear_raw();
            tokio::time::sleep(BASE_DELAY * 2u32.pow(attempt - 1)).await;
        }
        match perform(client, url, card).await {
            Ok(status) => break status,
            Err(e) => {
                attempt += 1;
                if e.is_transient() && attempt < MAX_RETRIES {
                    log::warn(&format!(
                        "transient transport error [{url}] (attempt {attempt}/{MAX_RETRIES}): {e}"
                    ));
                    continue;
                }
                return Err(e);
            }
        }
    };

    if !status.is_success() {
        return Err(AppError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    if card.raw_body.is_empty() {
        return Err(AppError::EmptyResponse {
            url: url.to_string(),
        });
    }
    let first = card
        .raw_body
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace());
    if !matches!(first, Some(b'{') | Some(b'[')) {
        return Err(AppError::InvalidBody {
            url: url.to_string(),
        });
    }

    card.parse_raw_body();
    Ok(())
}

/// One transport attempt: issue the request and stream the body into the
/// card chunk by chunk.
async fn perform(client: &Client, url: &str, card: &mut SummaryCard) -> Result<StatusCode> {
    let mut response = client.get(url).send().await?;
    let status = response.status();
    while let Some(chunk) = response.chunk().await? {
        card.append_raw(&chunk);
    }
    Ok(status)
}
