//! ankisync - Turn spreadsheet vocabulary rows into Anki notes.
//!
//! ## Architecture
//!
//! Each row of the source sheet holds up to four words (German, Turkish,
//! Russian, English). Every word is sent to a local Ollama model with a
//! language-specific prompt, and the answer becomes the back of a Basic note
//! added through AnkiConnect to the deck named after the language.
//!
//! ## Pipeline
//!
//! - **Row pipeline**: Generate → Add note → Mark row in checkpoint
//! - **Batch runner**: Skip checkpointed rows → Process with retry/backoff
//! - **Cleanup**: Delete rows that reached Anki from the source
//!
//! ## Resumability
//!
//! The checkpoint is rewritten after every successful row, so an interrupted
//! run picks up where it stopped without creating duplicate notes.

pub mod checkpoint;
pub mod client;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use checkpoint::CheckpointManager;
pub use client::{AnkiClient, CsvSheet, GoogleSheet, NoteSink, OllamaClient, RowSource, TextGenerator};
pub use models::{AnkisyncError, Config, Result, RunSummary, TranslationEntry, WordEntry};
pub use pipeline::{BatchRunner, RowPipeline, RunOptions, cleanup};
