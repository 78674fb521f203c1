//! Reference Catalog
//!
//! Immutable table mapping a canonical item name to its volume (cubic feet)
//! and weight (pounds). A catalog is built once, validated, and then only
//! read; matcher keys are pre-canonicalized at construction.

use crate::canonicalize::{canonicalize, tokenize};
use crate::error::{NormalizeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

/// One canonical catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(alias = "canonicalName")]
    pub name: String,
    pub volume_cu_ft: f64,
    pub weight_lbs: f64,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, volume_cu_ft: f64, weight_lbs: f64) -> Self {
        Self {
            name: name.into(),
            volume_cu_ft,
            weight_lbs,
        }
    }
}

/// On-disk JSON layout
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_version")]
    version: String,
    entries: Vec<CatalogEntry>,
}

/// On-disk CSV layout (`name,volume_cu_ft,weight_lbs`)
#[derive(Debug, Deserialize)]
struct CatalogCsvRow {
    name: String,
    volume_cu_ft: f64,
    weight_lbs: f64,
}

fn default_version() -> String {
    "unversioned".to_string()
}

/// Catalog entry plus the forms the matcher compares against.
#[derive(Debug, Clone)]
pub(crate) struct CatalogKey {
    pub entry: CatalogEntry,
    pub lowercase: String,
    pub canonical: String,
    /// Lowercased, punctuation-free words in original order
    pub words: Vec<String>,
}

/// Validated, read-only reference catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    keys: Vec<CatalogKey>,
    by_name: HashMap<String, usize>,
    by_lowercase: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from entries, rejecting anything the matcher could
    /// not rely on: empty tables, blank or duplicate names, names with
    /// stray whitespace, and stats that are negative or not finite.
    pub fn from_entries(version: impl Into<String>, entries: Vec<CatalogEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(NormalizeError::Catalog("catalog has no entries".to_string()));
        }

        let mut keys = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_lowercase = HashMap::with_capacity(entries.len());

        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(NormalizeError::Catalog("entry with empty name".to_string()));
            }
            // Candidate names are whitespace-collapsed before the exact step
            if entry.name.split_whitespace().collect::<Vec<_>>().join(" ") != entry.name {
                return Err(NormalizeError::Catalog(format!(
                    "entry '{}' has leading, trailing or repeated whitespace",
                    entry.name
                )));
            }
            if !is_valid_stat(entry.volume_cu_ft) || !is_valid_stat(entry.weight_lbs) {
                return Err(NormalizeError::Catalog(format!(
                    "entry '{}' has invalid stats (volume {}, weight {})",
                    entry.name, entry.volume_cu_ft, entry.weight_lbs
                )));
            }

            let canonical = canonicalize(&entry.name);
            if canonical.is_empty() {
                return Err(NormalizeError::Catalog(format!(
                    "entry '{}' has no letters or digits",
                    entry.name
                )));
            }

            let idx = keys.len();
            if by_name.insert(entry.name.clone(), idx).is_some() {
                return Err(NormalizeError::Catalog(format!(
                    "duplicate entry '{}'",
                    entry.name
                )));
            }

            // First entry wins for names differing only in case
            let lowercase = entry.name.to_lowercase();
            by_lowercase.entry(lowercase.clone()).or_insert(idx);

            let words = tokenize(&entry.name, 1);

            keys.push(CatalogKey {
                entry,
                lowercase,
                canonical,
                words,
            });
        }

        Ok(Self {
            version: version.into(),
            keys,
            by_name,
            by_lowercase,
        })
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_entries(file.version, file.entries)
    }

    /// Parse CSV with a `name,volume_cu_ft,weight_lbs` header.
    pub fn from_csv_reader<R: std::io::Read>(version: impl Into<String>, reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut entries = Vec::new();
        for row in csv_reader.deserialize::<CatalogCsvRow>() {
            let row = row?;
            entries.push(CatalogEntry::new(row.name, row.volume_cu_ft, row.weight_lbs));
        }
        Self::from_entries(version, entries)
    }

    /// Load a catalog file; `.csv` files are read as CSV, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

        let catalog = if is_csv {
            let file = std::fs::File::open(path)?;
            let version = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("unversioned")
                .to_string();
            Self::from_csv_reader(version, file)?
        } else {
            let content = std::fs::read_to_string(path)?;
            Self::from_json_str(&content)?
        };

        info!(
            "Loaded catalog '{}' with {} entries from {:?}",
            catalog.version,
            catalog.len(),
            path
        );
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Byte-for-byte lookup.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name).map(|&idx| &self.keys[idx].entry)
    }

    pub(crate) fn get_ignore_case(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_lowercase
            .get(&name.to_lowercase())
            .map(|&idx| &self.keys[idx].entry)
    }

    /// Entries in load order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.keys.iter().map(|key| &key.entry)
    }

    pub(crate) fn keys(&self) -> &[CatalogKey] {
        &self.keys
    }
}

fn is_valid_stat(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();
        assert!(catalog.len() > 50);
        assert!(catalog.get("Chair, Dining").is_some());
        assert_ne!(catalog.version(), "unversioned");
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::from_entries(
            "test",
            vec![
                CatalogEntry::new("Sofa, 3 Cushion", 50.0, 175.0),
                CatalogEntry::new("Chair, Dining", 12.0, 25.0),
            ],
        )
        .unwrap();

        assert_eq!(catalog.get("Chair, Dining").unwrap().weight_lbs, 25.0);
        assert!(catalog.get("chair, dining").is_none());
        assert_eq!(catalog.get_ignore_case("CHAIR, DINING").unwrap().name, "Chair, Dining");

        let names: Vec<&str> = catalog.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Sofa, 3 Cushion", "Chair, Dining"]);
    }

    #[test]
    fn test_key_forms_are_precomputed() {
        let catalog =
            Catalog::from_entries("test", vec![CatalogEntry::new("Sofa, 3 Cushion", 50.0, 175.0)]).unwrap();
        let key = &catalog.keys()[0];
        assert_eq!(key.lowercase, "sofa, 3 cushion");
        assert_eq!(key.canonical, "3 cushion sofa");
        assert_eq!(key.words, vec!["sofa", "3", "cushion"]);
    }

    #[test]
    fn test_rejects_invalid_catalogs() {
        assert!(Catalog::from_entries("test", vec![]).is_err());
        assert!(Catalog::from_entries("test", vec![CatalogEntry::new("  ", 1.0, 1.0)]).is_err());
        assert!(Catalog::from_entries("test", vec![CatalogEntry::new("--", 1.0, 1.0)]).is_err());
        assert!(Catalog::from_entries("test", vec![CatalogEntry::new("Lamp", -1.0, 1.0)]).is_err());
        assert!(Catalog::from_entries("test", vec![CatalogEntry::new("Lamp", 1.0, f64::NAN)]).is_err());
        assert!(Catalog::from_entries(
            "test",
            vec![CatalogEntry::new("Lamp", 1.0, 1.0), CatalogEntry::new("Lamp", 2.0, 2.0)]
        )
        .is_err());
    }

    #[test]
    fn test_rejects_unnormalized_whitespace() {
        for name in ["Chair,  Dining", " Lamp", "Lamp ", "Chair,\tDining"] {
            assert!(
                matches!(
                    Catalog::from_entries("test", vec![CatalogEntry::new(name, 1.0, 1.0)]),
                    Err(NormalizeError::Catalog(_))
                ),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_from_json_str() {
        let catalog = Catalog::from_json_str(
            r#"{"version": "v2", "entries": [{"canonicalName": "Desk", "volumeCuFt": 30.0, "weightLbs": 100.0}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.version(), "v2");
        assert_eq!(catalog.get("Desk").unwrap().volume_cu_ft, 30.0);

        assert!(Catalog::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_load_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,volume_cu_ft,weight_lbs").unwrap();
        writeln!(file, "\"Chair, Dining\",12.0,25.0").unwrap();
        writeln!(file, "Bookcase,20,70").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("Chair, Dining").unwrap().volume_cu_ft, 12.0);
    }

    #[test]
    fn test_load_corrupt_csv_fails() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,volume_cu_ft,weight_lbs").unwrap();
        writeln!(file, "Bookcase,twenty,70").unwrap();
        file.flush().unwrap();

        assert!(matches!(Catalog::load(file.path()), Err(NormalizeError::Csv(_))));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Catalog::load(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(NormalizeError::Io(_))));
    }
}
