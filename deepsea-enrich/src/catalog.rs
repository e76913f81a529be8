//! Local species dataset
//!
//! Loaded once at startup from a JSON array of records. Lookups are by record
//! identity only; there is no fallback to another record when an id is unknown.

use crate::types::LocalRecord;
use deepsea_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Immutable, ordered collection of local records
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    records: Vec<Arc<LocalRecord>>,
    by_id: HashMap<String, usize>,
}

impl SpeciesCatalog {
    /// Build from records; a duplicated id keeps its first occurrence
    pub fn from_records(records: Vec<LocalRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            if catalog.by_id.contains_key(&record.id) {
                warn!(record_id = %record.id, "Duplicate record id in dataset, keeping first");
                continue;
            }
            catalog.by_id.insert(record.id.clone(), catalog.records.len());
            catalog.records.push(Arc::new(record));
        }
        catalog
    }

    /// Parse a dataset file
    ///
    /// The file must hold a JSON array. A record that fails to parse is
    /// skipped with a warning; the rest of the dataset still loads.
    pub async fn read(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidInput(format!("Malformed dataset {}: {}", path.display(), e))
        })?;

        let records = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %path.display(), index, error = %e, "Skipping malformed dataset record");
                    None
                }
            })
            .collect::<Vec<LocalRecord>>();
        Ok(Self::from_records(records))
    }

    /// Load a dataset file, degrading to an empty catalog on failure
    ///
    /// An empty catalog makes every view "unavailable", which is what the
    /// kiosk shows when its data is missing.
    pub async fn load(path: &Path) -> Self {
        match Self::read(path).await {
            Ok(catalog) => {
                info!(path = %path.display(), records = catalog.len(), "Species dataset loaded");
                catalog
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load species dataset");
                Self::default()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<LocalRecord>> {
        self.by_id.get(id).map(|&index| self.records[index].clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in dataset order
    pub fn iter(&self) -> impl Iterator<Item = &LocalRecord> {
        self.records.iter().map(|record| record.as_ref())
    }
}
