// tests/fetch.rs

//! End-to-end fetch engine tests against a local stub HTTP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use cadash::models::FetcherConfig;
use cadash::services::DashboardFetcher;
use cadash::{IndicatorCategory, SummaryCard};

const CARD_BODY: &str = r#"[{"indicatorId":1,"primary":{"cdsCode":"19649071995901","status":55.5,"change":-1.5,"schoolYearId":11,"count":120,"studentGroup":"ALL"},"secondary":null}]"#;

fn test_config(pool_size: usize) -> FetcherConfig {
    FetcherConfig {
        timeout_ms: 5_000,
        pool_size,
        max_requests_per_sec: 1000.0,
    }
}

async fn read_request(stream: &mut TcpStream) {
    // One read is enough for a small GET request.
    let mut buf = [0u8; 4096];
    let _ = stream.read(&mut buf).await;
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Stub server answering every connection with the same response. Returns
/// the bound address and a connection counter.
async fn spawn_server(status: &'static str, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    spawn_flaky_server(0, status, body).await
}

/// Stub server that closes the first `drop_first` connections without
/// answering, then serves normally.
async fn spawn_flaky_server(
    drop_first: usize,
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < drop_first {
                // Close without answering: the client sees a recv fault.
                drop(stream);
                continue;
            }
            tokio::spawn(async move {
                read_request(&mut stream).await;
                write_response(&mut stream, status, body).await;
            });
        }
    });

    (addr, hits)
}

fn urls_for(addr: SocketAddr, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("http://{addr}/Reports/{i}/11/SummaryCards"))
        .collect()
}

#[tokio::test]
async fn test_every_slot_written_and_decoded() {
    let (addr, hits) = spawn_server("200 OK", CARD_BODY).await;

    let mut fetcher = DashboardFetcher::new(test_config(4)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 12)));
    assert!(fetcher.run().await);

    assert_eq!(fetcher.output.len(), 12);
    assert_eq!(hits.load(Ordering::SeqCst), 12);
    for card in &fetcher.output {
        assert_eq!(card.indicators.len(), 1);
        assert_eq!(
            card.indicators[0].indicator_category,
            IndicatorCategory::ChronicAbsenteeism
        );
        assert_eq!(card.indicators[0].cds_code, "19649071995901");
        assert!(!card.raw_body.is_empty());
    }
}

#[tokio::test]
async fn test_output_appends_at_base_offset() {
    let (addr, _hits) = spawn_server("200 OK", CARD_BODY).await;

    let mut fetcher = DashboardFetcher::new(test_config(2)).with_progress(false);
    let mut existing = SummaryCard::new();
    existing.school_name = "already here".to_string();
    fetcher.output.push(existing);

    assert!(fetcher.load_urls(urls_for(addr, 3)));
    assert!(fetcher.run().await);

    assert_eq!(fetcher.output.len(), 4);
    assert_eq!(fetcher.output[0].school_name, "already here");
    for card in &fetcher.output[1..] {
        assert_eq!(card.indicators.len(), 1);
    }
}

#[tokio::test]
async fn test_transient_faults_retry_then_succeed() {
    let (addr, hits) = spawn_flaky_server(2, "200 OK", CARD_BODY).await;

    let mut fetcher = DashboardFetcher::new(test_config(1)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 1)));

    let start = Instant::now();
    assert!(fetcher.run().await);

    // Two failed attempts back off 250ms then 500ms before the third.
    assert!(start.elapsed() >= Duration::from_millis(740));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(fetcher.output.len(), 1);
    assert_eq!(fetcher.output[0].indicators.len(), 1);
}

#[tokio::test]
async fn test_persistent_faults_leave_slot_empty() {
    let (addr, hits) = spawn_flaky_server(usize::MAX, "200 OK", CARD_BODY).await;

    let mut fetcher = DashboardFetcher::new(test_config(1)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 1)));

    // The run still succeeds; the failed fetch only empties its own slot.
    assert!(fetcher.run().await);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(fetcher.output.len(), 1);
    assert!(fetcher.output[0].indicators.is_empty());
}

#[tokio::test]
async fn test_http_status_error_is_not_decoded() {
    let (addr, hits) = spawn_server("404 Not Found", r#"{"error":"no such school"}"#).await;

    let mut fetcher = DashboardFetcher::new(test_config(1)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 1)));
    assert!(fetcher.run().await);

    // Status errors are not retried.
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let card = &fetcher.output[0];
    assert!(card.indicators.is_empty());
    assert!(!card.raw_body.is_empty());
}

#[tokio::test]
async fn test_html_body_is_not_decoded() {
    let (addr, _hits) = spawn_server("200 OK", "<html><body>maintenance</body></html>").await;

    let mut fetcher = DashboardFetcher::new(test_config(1)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 1)));
    assert!(fetcher.run().await);

    let card = &fetcher.output[0];
    assert!(card.indicators.is_empty());
    assert_eq!(card.raw_body, b"<html><body>maintenance</body></html>");
}

#[tokio::test]
async fn test_empty_body_is_not_decoded() {
    let (addr, _hits) = spawn_server("200 OK", "").await;

    let mut fetcher = DashboardFetcher::new(test_config(1)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 1)));
    assert!(fetcher.run().await);

    let card = &fetcher.output[0];
    assert!(card.indicators.is_empty());
    assert!(card.raw_body.is_empty());
}

#[tokio::test]
async fn test_invalid_urls_are_filtered_before_fetch() {
    let (addr, hits) = spawn_server("200 OK", CARD_BODY).await;

    let mut urls = urls_for(addr, 2);
    urls.push(String::new());
    urls.push("gopher://unsupported.example".to_string());

    let mut fetcher = DashboardFetcher::new(test_config(2)).with_progress(false);
    assert!(fetcher.load_urls(urls));
    assert!(fetcher.run().await);

    assert_eq!(fetcher.output.len(), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pool_larger_than_url_count() {
    let (addr, hits) = spawn_server("200 OK", CARD_BODY).await;

    let mut fetcher = DashboardFetcher::new(test_config(50)).with_progress(false);
    assert!(fetcher.load_urls(urls_for(addr, 3)));
    assert!(fetcher.run().await);

    assert_eq!(fetcher.output.len(), 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    for card in &fetcher.output {
        assert_eq!(card.indicators.len(), 1);
    }
}
