// src/services/roster.rs

//! Official school roster ingestion.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::School;
use crate::utils::log;

/// Load the roster CSV.
///
/// Rows missing a CDS code or school name are skipped with a warning, as
/// are rows that fail to deserialize; the roster is large and a handful of
/// malformed rows must not block a fetch run.
pub fn load_roster(path: &Path) -> Result<Vec<School>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut schools = Vec::new();

    for (idx, record) in reader.deserialize::<School>().enumerate() {
        // Header is row 1.
        let row = idx + 2;
        match record {
            Ok(school) => {
                if school.cds_code.trim().is_empty() || school.name.trim().is_empty() {
                    log::warn(&format!(
                        "roster row {row}: missing CDS code or school name, skipping"
                    ));
                    continue;
                }
                schools.push(school);
            }
            Err(e) => {
                log::warn(&format!("roster row {row}: {e}, skipping"));
            }
        }
    }

    if schools.is_empty() {
        return Err(AppError::validation(format!(
            "roster {} contains no usable rows",
            path.display()
        )));
    }
    Ok(schools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_roster(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_roster() {
        let file = write_roster(
            "cds,school,district,county,status\n\
             19649071995901,Example Elementary,Example Unified,Los Angeles,Active\n\
             19649071995919,Sample High,Example Unified,Los Angeles,Closed\n",
        );
        let schools = load_roster(file.path()).unwrap();
        assert_eq!(schools.len(), 2);
        assert_eq!(schools[0].cds_code, "19649071995901");
        assert_eq!(schools[0].name, "Example Elementary");
        assert_eq!(schools[1].status, "Closed");
    }

    #[test]
    fn test_rows_without_cds_or_name_are_skipped() {
        let file = write_roster(
            "cds,school,district,county,status\n\
             ,No Code School,D,C,Active\n\
             19640000000001,,D,C,Active\n\
             19640000000002,Kept School,D,C,Active\n",
        );
        let schools = load_roster(file.path()).unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].name, "Kept School");
    }

    #[test]
    fn test_empty_roster_is_an_error() {
        let file = write_roster("cds,school,district,county,status\n");
        assert!(load_roster(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_roster(Path::new("/nonexistent/roster.csv")).is_err());
    }
}
