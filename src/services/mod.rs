// src/services/mod.rs

//! Service layer for the fetch client.
//!
//! This module contains:
//! - the concurrent fetch engine (`DashboardFetcher` plus its worker,
//!   queue and limiter internals)
//! - the enrichment pass (`build_plan`, `enrich`)
//! - roster ingestion (`load_roster`) and name resolution (`match_school`)

mod enrich;
mod fetcher;
mod limiter;
mod matcher;
mod queue;
mod roster;
mod worker;

pub use enrich::{build_plan, enrich, MetaEntry, SchoolMeta};
pub use fetcher::DashboardFetcher;
pub use limiter::TokenBucket;
pub use matcher::match_school;
pub use queue::WorkQueue;
pub use roster::load_roster;
