// src/services/enrich.rs

//! Post-fetch enrichment: stamp cards with the school name and year their
//! URL was built from.
//!
//! The JSON payloads carry only the CDS code and the server-side year id,
//! while the human-facing name and calendar year live in the URL list, so
//! the caller derives a lookup map when planning the fetch and applies it
//! here after the run.

use std::collections::HashMap;
use std::thread;

use crate::models::{School, SummaryCard};
use crate::utils::{log, url as url_util};

/// External metadata for one (cdsCode, schoolYearId) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub school_name: String,
    pub year: String,
}

/// Lookup from the identifiers carried in the JSON payload to the
/// human-facing metadata carried only in the URL list.
pub type SchoolMeta = HashMap<(String, u32), MetaEntry>;

/// Build the URL list and enrichment map for resolved (school, year)
/// pairs. Years outside the dashboard's published range are skipped with a
/// warning.
pub fn build_plan(pairs: &[(School, u16)]) -> (Vec<String>, SchoolMeta) {
    let mut urls = Vec::with_capacity(pairs.len());
    let mut meta = SchoolMeta::with_capacity(pairs.len());

    for (school, year) in pairs {
        let Some(year_id) = url_util::year_id(*year) else {
            log::warn(&format!(
                "no dashboard reporting year for {year}, skipping {}",
                school.name
            ));
            continue;
        };
        urls.push(url_util::report_url(&school.cds_code, year_id));
        meta.insert(
            (school.cds_code.clone(), year_id),
            MetaEntry {
                school_name: school.name.clone(),
                year: year.to_string(),
            },
        );
    }

    (urls, meta)
}

/// Stamp every non-empty card with its school name and year.
///
/// The output is partitioned into contiguous ranges, one per available
/// core. Ranges are disjoint and `meta` is read-only, so no locking is
/// needed.
pub fn enrich(cards: &mut [SummaryCard], meta: &SchoolMeta) {
    if cards.is_empty() {
        return;
    }

    let tasks = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let chunk = cards.len().div_ceil(tasks);

    thread::scope(|scope| {
        for range in cards.chunks_mut(chunk) {
            scope.spawn(move || {
                for card in range {
                    stamp(card, meta);
                }
            });
        }
    });
}

/// All indicators in one card share their CDS code and year id, so the
/// first one identifies the card.
fn stamp(card: &mut SummaryCard, meta: &SchoolMeta) {
    let Some(first) = card.indicators.first() else {
        return;
    };
    let key = (first.cds_code.clone(), first.school_year_id);
    if let Some(entry) = meta.get(&key) {
        card.school_name = entry.school_name.clone();
        card.year = entry.year.clone();
    }
}
