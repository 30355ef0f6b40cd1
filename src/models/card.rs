// src/models/card.rs

//! Summary card and indicator records, with the JSON decoder.
//!
//! The upstream service is loosely typed and occasionally emits nulls
//! where numbers are expected, so every scalar read falls back to a
//! default on a missing key, a null, or a type mismatch, and problems are
//! reported on stderr instead of failing the card.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::utils::log;

/// Dashboard indicator categories, keyed by the service's `indicatorId`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorCategory {
    ChronicAbsenteeism,
    SuspensionRate,
    EnglishLearnerProgress,
    GraduationRate,
    CollegeCareerIndicator,
    ElaPointsAboveBelow,
    Mathematics,
    Science,
    #[default]
    Unknown,
}

impl IndicatorCategory {
    /// Look up the category for an indicator id. Ids outside the known
    /// table map to `Unknown`; the service does not distinguish a new but
    /// valid id from a malformed one.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::ChronicAbsenteeism,
            2 => Self::SuspensionRate,
            3 => Self::EnglishLearnerProgress,
            4 => Self::GraduationRate,
            5 => Self::CollegeCareerIndicator,
            6 => Self::ElaPointsAboveBelow,
            7 => Self::Mathematics,
            8 => Self::Science,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChronicAbsenteeism => "CHRONIC_ABSENTEEISM",
            Self::SuspensionRate => "SUSPENSION_RATE",
            Self::EnglishLearnerProgress => "ENGLISH_LEARNER_PROGRESS",
            Self::GraduationRate => "GRADUATION_RATE",
            Self::CollegeCareerIndicator => "COLLEGE_CAREER_INDICATOR",
            Self::ElaPointsAboveBelow => "ELA_POINTS_ABOVE_BELOW",
            Self::Mathematics => "MATHEMATICS",
            Self::Science => "SCIENCE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric for one student cohort within a summary card.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Indicator {
    pub indicator_id: u32,
    pub indicator_category: IndicatorCategory,
    pub cds_code: String,
    pub status: f64,
    pub change: f64,
    pub change_id: i32,
    pub status_id: i32,
    pub performance: i32,
    pub total_groups: u32,
    pub school_year_id: u32,
    pub red: i32,
    pub orange: i32,
    pub yellow: i32,
    pub green: i32,
    pub blue: i32,
    pub count: i64,
    pub student_group: String,
    pub is_private_data: bool,
    /// The `primary` block as received, kept verbatim for diff/replay.
    pub primary_raw: Value,
    /// The `secondary` block as received, kept verbatim for diff/replay.
    pub secondary_raw: Value,
}

impl Indicator {
    /// Decode one entry of the top-level response array.
    fn from_entry(entry: &Map<String, Value>) -> Self {
        let indicator_id = read_u32(entry, "indicatorId");
        let indicator_category = IndicatorCategory::from_id(indicator_id);
        if indicator_category == IndicatorCategory::Unknown {
            log::warn(&format!("unknown indicator id {indicator_id}"));
        }

        let primary = entry.get("primary").cloned().unwrap_or(Value::Null);
        let secondary = entry.get("secondary").cloned().unwrap_or(Value::Null);

        let mut record = Indicator {
            indicator_id,
            indicator_category,
            ..Default::default()
        };

        if let Some(payload) = primary.as_object() {
            record.cds_code = read_string(payload, "cdsCode");
            record.status = read_f64(payload, "status");
            record.change = read_f64(payload, "change");
            record.change_id = read_i32(payload, "changeId");
            record.status_id = read_i32(payload, "statusId");
            record.performance = read_i32(payload, "performance");
            record.total_groups = read_u32(payload, "totalGroups");
            record.school_year_id = read_u32(payload, "schoolYearId");
            record.red = read_i32(payload, "red");
            record.orange = read_i32(payload, "orange");
            record.yellow = read_i32(payload, "yellow");
            record.green = read_i32(payload, "green");
            record.blue = read_i32(payload, "blue");
            record.count = read_i64(payload, "count");
            record.student_group = read_string(payload, "studentGroup");
            record.is_private_data = read_bool(payload, "isPrivateData");
        } else if !primary.is_null() {
            log::warn(&format!(
                "indicator {indicator_id}: primary block is not an object, keeping defaults"
            ));
        }

        record.primary_raw = primary;
        record.secondary_raw = secondary;
        record
    }

    /// Re-emit the wire shape of one response entry.
    ///
    /// Decoding the emitted entry yields an equal record, which is what the
    /// replay tooling relies on.
    pub fn to_entry(&self) -> Value {
        json!({
            "indicatorId": self.indicator_id,
            "primary": {
                "cdsCode": self.cds_code,
                "status": self.status,
                "change": self.change,
                "changeId": self.change_id,
                "statusId": self.status_id,
                "performance": self.performance,
                "totalGroups": self.total_groups,
                "schoolYearId": self.school_year_id,
                "red": self.red,
                "orange": self.orange,
                "yellow": self.yellow,
                "green": self.green,
                "blue": self.blue,
                "count": self.count,
                "studentGroup": self.student_group,
                "isPrivateData": self.is_private_data,
            },
            "secondary": self.secondary_raw,
        })
    }
}

/// All indicators returned for one (school, year) fetch.
///
/// Constructed empty, filled chunk-by-chunk during transport, decoded once
/// the body is complete, and stamped with school metadata by the enrichment
/// pass afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryCard {
    /// Raw response bytes, retained for diagnostics and replay.
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub indicators: Vec<Indicator>,
    /// Index of the last indicator seen per category.
    #[serde(skip)]
    pub category_index: HashMap<IndicatorCategory, usize>,
    pub school_name: String,
    pub year: String,
}

impl SummaryCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a card from a complete body and decode it.
    pub fn from_body(body: impl Into<Vec<u8>>) -> Self {
        let mut card = Self {
            raw_body: body.into(),
            ..Default::default()
        };
        card.parse_raw_body();
        card
    }

    /// Append a transport chunk to the raw body.
    pub fn append_raw(&mut self, chunk: &[u8]) {
        self.raw_body.extend_from_slice(chunk);
    }

    /// Drop the raw body before a retry attempt.
    pub fn clear_raw(&mut self) {
        self.raw_body.clear();
    }

    /// Decode `raw_body` into indicator records.
    ///
    /// Total: a parse failure leaves the indicator list empty and logs a
    /// diagnostic instead of failing. Entries that are not JSON objects are
    /// skipped. Within a card the indicator order mirrors the array order.
    pub fn parse_raw_body(&mut self) {
        self.indicators.clear();
        self.category_index.clear();
        if self.raw_body.is_empty() {
            return;
        }

        let root: Value = match serde_json::from_slice(&self.raw_body) {
            Ok(value) => value,
            Err(e) => {
                log::error(&format!("JSON parse error: {e}"));
                return;
            }
        };

        let entries = match root {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            other => {
                log::warn(&format!(
                    "unexpected top-level JSON value of type {}",
                    json_kind(&other)
                ));
                return;
            }
        };

        for entry in &entries {
            let Some(map) = entry.as_object() else {
                log::warn(&format!(
                    "skipping non-object entry ({}) in response array",
                    json_kind(entry)
                ));
                continue;
            };
            let record = Indicator::from_entry(map);
            self.category_index
                .insert(record.indicator_category, self.indicators.len());
            self.indicators.push(record);
        }
    }

    /// Raw body as text, for diagnostics.
    pub fn raw_body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_body)
    }

    /// Persist the raw body for later replay.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.raw_body)?;
        Ok(())
    }

    /// Load a raw body from disk and decode it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(Self::from_body(raw))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Safe field reads: missing key or null yields the default; a string field
// receiving a non-string stringifies the value; a numeric or bool field
// receiving the wrong type yields the default with no coercion.

fn read_string(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn read_f64(obj: &Map<String, Value>, key: &str) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn read_i64(obj: &Map<String, Value>, key: &str) -> i64 {
    obj.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn read_i32(obj: &Map<String, Value>, key: &str) -> i32 {
    obj.get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(0)
}

fn read_u32(obj: &Map<String, Value>, key: &str) -> u32 {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn read_bool(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}
