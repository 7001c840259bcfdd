//! # Allow-List Module
//!
//! Per-subsystem tables of telemetry id → accepted parameter names, loaded
//! once at startup from `<subsystem>_config.json` files.
//!
//! ```json
//! { "829": ["Up Time", "rssi", "tx_power"] }
//! ```
//!
//! Names are lowercased and trimmed on load. A missing file leaves that
//! subsystem with an empty table; if no file exists at all, loading fails.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::parser::names::canonicalize;
use crate::telemetry::Subsystem;

/// Telemetry id (decimal string) → lowercase accepted parameter names.
pub type AllowListTable = HashMap<String, HashSet<String>>;

/// Immutable allow-lists for every subsystem.
#[derive(Debug, Clone, Default)]
pub struct AllowLists {
    tables: HashMap<Subsystem, AllowListTable>,
}

impl AllowLists {
    /// Load all subsystem allow-lists from a directory.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No `<subsystem>_config.json` exists for any subsystem
    /// - A present file cannot be read or is not a JSON object of string arrays
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut tables = HashMap::new();
        let mut found = 0;

        for subsystem in Subsystem::ALL {
            let path = Self::file_path(dir, subsystem);
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    let table = Self::parse_table(&contents)
                        .map_err(|source| IngestError::AllowList { path: path.clone(), source })?;
                    info!(
                        "Loaded {} allow-list: {} telemetry ids",
                        subsystem,
                        table.len()
                    );
                    tables.insert(subsystem, table);
                    found += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("Allow-list file not found for {}: {}", subsystem, path.display());
                    tables.insert(subsystem, AllowListTable::new());
                }
                Err(e) => return Err(IngestError::Io(e)),
            }
        }

        if found == 0 {
            return Err(IngestError::NoAllowLists(dir.to_path_buf()));
        }

        Ok(Self { tables })
    }

    /// Build allow-lists from in-memory tables, normalizing every name.
    pub fn from_tables<I, N>(tables: I) -> Self
    where
        I: IntoIterator<Item = (Subsystem, HashMap<String, Vec<N>>)>,
        N: AsRef<str>,
    {
        let tables = tables
            .into_iter()
            .map(|(subsystem, raw)| {
                let table = raw
                    .into_iter()
                    .map(|(id, names)| (id.trim().to_string(), normalize_names(names)))
                    .collect();
                (subsystem, table)
            })
            .collect();

        Self { tables }
    }

    /// Path of the allow-list file for a subsystem.
    pub fn file_path(dir: &Path, subsystem: Subsystem) -> PathBuf {
        dir.join(format!("{}_config.json", subsystem.name()))
    }

    fn parse_table(contents: &str) -> std::result::Result<AllowListTable, serde_json::Error> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(contents)?;
        Ok(raw
            .into_iter()
            .map(|(id, names)| (id.trim().to_string(), normalize_names(names)))
            .collect())
    }

    /// Table for a subsystem, if one was configured.
    pub fn table(&self, subsystem: Subsystem) -> Option<&AllowListTable> {
        self.tables.get(&subsystem)
    }

    /// Whether records of this id should be stored for the subsystem.
    ///
    /// An empty or missing table accepts every id in the subsystem's range.
    pub fn accepts_id(&self, subsystem: Subsystem, id: u32) -> bool {
        match self.table(subsystem) {
            Some(table) if !table.is_empty() => table.contains_key(&id.to_string()),
            _ => true,
        }
    }
}

/// Check a raw label against a set of lowercase names.
///
/// Accepts the label if either its lowercased raw spelling or its
/// canonical form is listed.
pub(crate) fn label_allowed(names: &HashSet<String>, label: &str) -> bool {
    let raw = label.trim().to_lowercase();
    names.contains(&raw) || names.contains(&canonicalize(label))
}

fn normalize_names<N: AsRef<str>>(names: impl IntoIterator<Item = N>) -> HashSet<String> {
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_normalizes_names() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "uhf_config.json", r#"{"829": ["  Up Time ", "RSSI"]}"#);

        let lists = AllowLists::load(dir.path()).unwrap();
        let names = &lists.table(Subsystem::Uhf).unwrap()["829"];

        assert!(names.contains("up time"));
        assert!(names.contains("rssi"));
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "eps_config.json", r#"{"210": []}"#);

        let lists = AllowLists::load(dir.path()).unwrap();
        assert!(lists.table(Subsystem::Eps).unwrap().contains_key("210"));
        assert!(lists.table(Subsystem::Uhf).unwrap().is_empty());
        assert!(lists.table(Subsystem::Obc).unwrap().is_empty());
    }

    #[test]
    fn test_all_files_missing_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = AllowLists::load(dir.path());

        match result {
            Err(IngestError::NoAllowLists(path)) => assert_eq!(path, dir.path()),
            other => panic!("Expected NoAllowLists, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "obc_config.json", r#"{"510": "not a list"}"#);

        match AllowLists::load(dir.path()) {
            Err(IngestError::AllowList { path, .. }) => {
                assert!(path.ends_with("obc_config.json"));
            }
            other => panic!("Expected AllowList error, got: {:?}", other),
        }
    }

    #[test]
    fn test_label_allowed_raw_or_canonical_spelling() {
        let names = normalize_names(["up time", "tx_power"]);

        assert!(label_allowed(&names, "Up Time"));
        assert!(label_allowed(&names, " up time "));
        assert!(label_allowed(&names, "TX Power"));
        assert!(!label_allowed(&names, "other param"));
    }

    #[test]
    fn test_accepts_id() {
        let lists = AllowLists::from_tables([(
            Subsystem::Eps,
            HashMap::from([("210".to_string(), vec!["btry_temp_1"])]),
        )]);

        assert!(lists.accepts_id(Subsystem::Eps, 210));
        assert!(!lists.accepts_id(Subsystem::Eps, 211));
        // No table configured: accept everything in range
        assert!(lists.accepts_id(Subsystem::Obc, 510));
    }
}
