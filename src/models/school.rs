// src/models/school.rs

//! Roster records for the official school directory.

use serde::{Deserialize, Serialize};

/// One school in the official roster.
///
/// The CDS code is the opaque (county, district, school) identifier the
/// reporting service keys its endpoints on.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct School {
    #[serde(rename = "cds")]
    pub cds_code: String,
    #[serde(rename = "school")]
    pub name: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub county: String,
    /// Roster status ("Active", "Closed", ...). Closed schools keep their
    /// historical dashboard years, so they are not filtered out.
    #[serde(default)]
    pub status: String,
}
