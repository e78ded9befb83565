//! Vendor reference catalog
//!
//! The list of known part ids (with display name and series) that the vision
//! prompt is built from and that `seed-reference` copies into the catalog.
//! It is loaded once at startup and changes only through an explicit
//! [`CatalogReader::reload`]; consumers receive it as `Arc<dyn CatalogReader>`.

use fitscan_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Entries listed in the vision prompt
pub const PROMPT_ENTRY_LIMIT: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub part_id: String,
    pub name: String,
    #[serde(default)]
    pub series: String,
}

/// Read access to the reference catalog
pub trait CatalogReader: Send + Sync {
    /// Current snapshot
    fn entries(&self) -> Arc<Vec<CatalogEntry>>;

    /// Re-read the backing source; returns the new entry count
    fn reload(&self) -> Result<usize>;
}

/// Catalog backed by a JSON file (array of entries)
pub struct ReferenceCatalog {
    path: PathBuf,
    entries: RwLock<Arc<Vec<CatalogEntry>>>,
}

impl ReferenceCatalog {
    /// Load from `path`; a missing or unreadable file gives an empty catalog
    pub fn load(path: &Path) -> Self {
        let entries = match read_catalog_file(path) {
            Ok(entries) => {
                tracing::info!(
                    path = %path.display(),
                    entries = entries.len(),
                    "Reference catalog loaded"
                );
                entries
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Reference catalog unavailable, starting empty"
                );
                Vec::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            entries: RwLock::new(Arc::new(entries)),
        }
    }
}

impl CatalogReader for ReferenceCatalog {
    fn entries(&self) -> Arc<Vec<CatalogEntry>> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn reload(&self) -> Result<usize> {
        let fresh = read_catalog_file(&self.path)?;
        let count = fresh.len();
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(fresh);
        tracing::info!(path = %self.path.display(), entries = count, "Reference catalog reloaded");
        Ok(count)
    }
}

/// Fixed in-memory catalog
pub struct StaticCatalog {
    entries: Arc<Vec<CatalogEntry>>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl CatalogReader for StaticCatalog {
    fn entries(&self) -> Arc<Vec<CatalogEntry>> {
        Arc::clone(&self.entries)
    }

    fn reload(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

fn read_catalog_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::Config(format!("Invalid reference catalog {}: {}", path.display(), e))
    })
}

/// Catalog section of the vision prompt
pub fn build_catalog_prompt(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No catalog loaded. Any part visible in the image should be reported as \
                unrecognized with guidance \"retake\"."
            .to_string();
    }

    let lines: Vec<String> = entries
        .iter()
        .take(PROMPT_ENTRY_LIMIT)
        .map(|e| format!("- {}: {} ({})", e.part_id, e.name, e.series))
        .collect();

    format!(
        "Reference catalog. Match visible parts to these part IDs when possible:\n{}\n\
         (More parts may exist in the full catalog; if a part matches a known type/size \
         pattern above, use that partId. Otherwise report unrecognized.)",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            part_id: id.to_string(),
            name: format!("Coupler {}", id),
            series: "Camlock".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = ReferenceCatalog::load(&dir.path().join("absent.json"));
        assert!(catalog.entries().is_empty());
        assert!(catalog.reload().is_err());
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&vec![entry("100A")]).unwrap()).unwrap();

        let catalog = ReferenceCatalog::load(&path);
        assert_eq!(catalog.entries().len(), 1);

        std::fs::write(&path, serde_json::to_string(&vec![entry("100A"), entry("200B")]).unwrap())
            .unwrap();
        assert_eq!(catalog.entries().len(), 1, "no implicit reload");
        assert_eq!(catalog.reload().unwrap(), 2);
        assert_eq!(catalog.entries()[1].part_id, "200B");
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&vec![entry("100A")]).unwrap()).unwrap();
        let catalog = ReferenceCatalog::load(&path);

        std::fs::write(&path, "{broken").unwrap();
        assert!(catalog.reload().is_err());
        assert_eq!(catalog.entries().len(), 1);
    }

    #[test]
    fn test_prompt_lists_at_most_limit() {
        let entries: Vec<CatalogEntry> = (0..100).map(|i| entry(&format!("P{}", i))).collect();
        let prompt = build_catalog_prompt(&entries);
        assert!(prompt.contains("- P0: Coupler P0 (Camlock)"));
        assert!(prompt.contains("- P79:"));
        assert!(!prompt.contains("- P80:"));
    }

    #[test]
    fn test_empty_prompt_asks_for_retake() {
        assert!(build_catalog_prompt(&[]).contains("retake"));
    }
}
