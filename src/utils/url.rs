// src/utils/url.rs

//! Dashboard endpoint URL construction and validation.

use url::Url;

/// Base of the public reporting service.
pub const REPORTS_BASE: &str = "https://api.caschooldashboard.org/Reports";

/// Map a calendar year to the server-side year id.
///
/// The table is closed: years outside the published range return `None`.
pub fn year_id(year: u16) -> Option<u32> {
    match year {
        2017 => Some(3),
        2018 => Some(4),
        2019 => Some(5),
        2020 => Some(6),
        2021 => Some(7),
        2022 => Some(8),
        2023 => Some(9),
        2024 => Some(10),
        2025 => Some(11),
        _ => None,
    }
}

/// Build the summary-cards endpoint URL for one (school, year id) pair.
pub fn report_url(cds_code: &str, year_id: u32) -> String {
    format!("{REPORTS_BASE}/{cds_code}/{year_id}/SummaryCards")
}

/// Whether a candidate URL carries a scheme the fetch engine accepts.
pub fn has_supported_scheme(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("ftp://")
}

/// Extract the hostname from a URL string.
pub fn host_of(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
