//! cadash: bulk fetch client for the California School Dashboard.
//!
//! Given a set of (school, year) pairs, resolves each school against the
//! official roster, builds the reporting endpoint URLs, fetches them with a
//! bounded worker pool behind a global rate limiter, decodes each response
//! into indicator records, and stamps the results with their school and
//! year.
//!
//! # Architecture
//!
//! - `models`: Data structures (SummaryCard, Indicator, Config, School)
//! - `services`: Fetch engine, enrichment, roster ingestion, name matching
//! - `utils`: Shared utilities (URL construction, logging)
//! - `config`: Configuration loading
//! - `error`: Unified error handling

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use error::{AppError, Result};
pub use models::{Indicator, IndicatorCategory, SummaryCard};
pub use services::DashboardFetcher;
