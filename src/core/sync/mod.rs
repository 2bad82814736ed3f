//! Import synchronization: lets the external consumer pull unimported entries
//! and acknowledge them in batches.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::error::StoreError;
use crate::core::store::EntryStore;
use crate::core::store::types::{Entry, ImportOutcome};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("You must provide 'entry_ids' into body.")]
    MissingEntryIds,

    #[error("There are no entries for importing.")]
    NoEntries,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct UnimportedEntries {
    pub total: usize,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Imported,
    NotFound,
    AlreadyImported,
    Failed,
}

impl From<ImportOutcome> for ImportStatus {
    fn from(outcome: ImportOutcome) -> Self {
        match outcome {
            ImportOutcome::Imported => ImportStatus::Imported,
            ImportOutcome::NotFound => ImportStatus::NotFound,
            ImportOutcome::AlreadyImported => ImportStatus::AlreadyImported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryImportResult {
    pub id: i64,
    pub status: ImportStatus,
}

/// Outcome of one mark-imported batch.
///
/// `remaining_count` is the number of unimported entries observed *before*
/// this batch was applied, not after.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported_count: usize,
    pub remaining_count: usize,
    pub results: Vec<EntryImportResult>,
}

#[derive(Clone)]
pub struct ImportSync {
    store: EntryStore,
}

impl ImportSync {
    pub fn new(store: EntryStore) -> Self {
        Self { store }
    }

    pub async fn list_unimported(&self) -> Result<UnimportedEntries, SyncError> {
        let entries = self.store.list_unimported().await?;
        if entries.is_empty() {
            return Err(SyncError::NoEntries);
        }
        Ok(UnimportedEntries {
            total: entries.len(),
            entries,
        })
    }

    /// Marks every listed entry as imported, skipping unknown and
    /// already-imported ids. A storage error on one id does not stop the rest.
    pub async fn mark_imported(&self, entry_ids: &[i64]) -> Result<ImportReport, SyncError> {
        if entry_ids.is_empty() {
            warn!("Mark-imported request without entry ids");
            return Err(SyncError::MissingEntryIds);
        }

        let remaining_count = self.store.count_unimported().await?;
        if remaining_count == 0 {
            info!("There are no entries to import");
            return Err(SyncError::NoEntries);
        }

        let mut results = Vec::with_capacity(entry_ids.len());
        for &id in entry_ids {
            let status = match self.store.import_entry(id).await {
                Ok(outcome) => ImportStatus::from(outcome),
                Err(e) => {
                    error!(entry_id = id, "Failed to mark entry as imported: {}", e);
                    ImportStatus::Failed
                }
            };
            match status {
                ImportStatus::NotFound => info!(entry_id = id, "Entry not found, skipping"),
                ImportStatus::AlreadyImported => {
                    info!(entry_id = id, "Entry is already imported, skipping")
                }
                _ => {}
            }
            results.push(EntryImportResult { id, status });
        }

        let imported_count = results
            .iter()
            .filter(|r| r.status == ImportStatus::Imported)
            .count();
        info!(imported_count, remaining_count, "Import batch applied");

        Ok(ImportReport {
            imported_count,
            remaining_count,
            results,
        })
    }
}
