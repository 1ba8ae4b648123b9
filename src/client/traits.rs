//! Capability traits for the external collaborators.

use crate::models::{Note, Result};
use async_trait::async_trait;

/// Produces explanatory text for a word.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Fill `template` with `word` and return the generated text.
    ///
    /// Timeouts, non-2xx statuses and malformed bodies are errors.
    async fn generate(&self, template: &str, word: &str) -> Result<String>;
}

/// Stores finished notes in the flashcard backend.
#[async_trait]
pub trait NoteSink: Send + Sync {
    /// Add `note`.
    ///
    /// Returns `Ok(false)` when the backend answered but produced no note id;
    /// `Err` is reserved for transport and HTTP failures.
    async fn add_note(&self, note: &Note) -> Result<bool>;
}

/// Tabular vocabulary source.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Data rows in sheet order, header excluded. Rows may be shorter than
    /// four cells.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Delete rows by position, where position 0 is the header row.
    ///
    /// Implementations delete from the highest position down so earlier
    /// deletions do not shift later ones.
    async fn delete_rows(&self, rows: &[usize]) -> Result<()>;
}

/// Sort positions highest first and drop duplicates.
pub(crate) fn descending_unique(rows: &[usize]) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    sorted
}
