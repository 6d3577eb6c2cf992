//! Reader configuration.
//!
//! [`ReaderConfig`] is an immutable value handed to
//! [`TableReader`](crate::innodb::btree::TableReader) and
//! [`Tablespace`](crate::innodb::tablespace::Tablespace) at construction.
//! Every field has a default, so a JSON config only needs the keys it changes.

use serde::{Deserialize, Serialize};

use crate::IdbError;

/// Options controlling validation strictness and value rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Require the file length to be an exact multiple of the page size.
    pub validate_file_size: bool,
    /// Validate page checksums on every full page load.
    pub verify_checksums: bool,
    /// Treat a traversed/declared record count mismatch as corruption
    /// instead of logging a warning.
    pub strict_record_count: bool,
    /// Emit delete-marked leaf records from scans and lookups.
    pub include_deleted: bool,
    /// Clustered index root page; resolved from page 3 onward when unset.
    pub root_page: Option<u32>,
    /// Number of SDI pages that may be skipped while resolving the root.
    pub root_search_limit: u32,
    /// Offset from UTC, in seconds, applied when rendering TIMESTAMP columns.
    pub timestamp_offset_secs: i32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            validate_file_size: true,
            verify_checksums: false,
            strict_record_count: false,
            include_deleted: false,
            root_page: None,
            root_search_limit: 3,
            timestamp_offset_secs: 0,
        }
    }
}

impl ReaderConfig {
    /// Parse a config from JSON text. Missing keys take their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::config::ReaderConfig;
    ///
    /// let cfg = ReaderConfig::from_json(r#"{"verify_checksums": true, "root_page": 4}"#).unwrap();
    /// assert!(cfg.verify_checksums);
    /// assert_eq!(cfg.root_page, Some(4));
    /// assert!(cfg.validate_file_size);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, IdbError> {
        serde_json::from_str(text).map_err(|e| IdbError::Parse(format!("Invalid config: {}", e)))
    }

    /// Load a JSON config file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, IdbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| IdbError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ReaderConfig::default();
        assert!(cfg.validate_file_size);
        assert!(!cfg.verify_checksums);
        assert!(!cfg.strict_record_count);
        assert_eq!(cfg.root_search_limit, 3);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ReaderConfig::from_json("{}").unwrap(), ReaderConfig::default());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ReaderConfig::from_json("{\"root_page\": \"x\"}"),
            Err(IdbError::Parse(_))
        ));
    }
}
