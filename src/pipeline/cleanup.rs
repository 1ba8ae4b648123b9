//! Post-run removal of finished rows from the source.

use crate::client::RowSource;
use crate::models::TranslationEntry;
use tracing::{error, info};

/// Rows in the source sit below one header row.
pub const HEADER_OFFSET: usize = 1;

/// What cleanup asked for and whether the source accepted it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Source positions (header = 0) sent for deletion
    pub requested: Vec<usize>,
    pub deleted: bool,
    pub error: Option<String>,
}

/// Source positions of every row that made it into Anki.
pub fn rows_to_delete(results: &[TranslationEntry]) -> Vec<usize> {
    results
        .iter()
        .filter(|r| r.anki_added)
        .map(|r| r.row_index + HEADER_OFFSET)
        .collect()
}

/// Delete successfully processed rows from `source`.
///
/// Issues at most one delete request. A failing source is logged and
/// reported, never propagated.
pub async fn cleanup(results: &[TranslationEntry], source: &dyn RowSource) -> CleanupReport {
    let requested = rows_to_delete(results);
    if requested.is_empty() {
        info!("No successful rows to remove from source");
        return CleanupReport::default();
    }

    match source.delete_rows(&requested).await {
        Ok(()) => {
            info!(count = requested.len(), "Removed successful entries from source");
            CleanupReport {
                requested,
                deleted: true,
                error: None,
            }
        }
        Err(e) => {
            error!(error = %e, rows = ?requested, "Failed to clean up source");
            CleanupReport {
                requested,
                deleted: false,
                error: Some(e.to_string()),
            }
        }
    }
}
