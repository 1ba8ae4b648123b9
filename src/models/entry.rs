//! Vocabulary entries and per-row processing records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of a vocabulary cell.
///
/// The lowercase name doubles as the Anki deck name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    German,
    Turkish,
    Russian,
    English,
}

impl Language {
    /// Column order of the source sheet.
    pub const SHEET_ORDER: [Language; 4] = [
        Language::German,
        Language::Turkish,
        Language::Russian,
        Language::English,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::German => "german",
            Language::Turkish => "turkish",
            Language::Russian => "russian",
            Language::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single word paired with its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub language: Language,
}

impl WordEntry {
    pub fn new(word: impl Into<String>, language: Language) -> Self {
        Self {
            word: word.into(),
            language,
        }
    }
}

/// Flatten raw sheet rows into word entries.
///
/// Cells are read in [`Language::SHEET_ORDER`]; missing trailing cells count
/// as empty, blank cells are dropped and extra cells are ignored. The
/// position of an entry in the returned vector is its row index.
pub fn flatten_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<WordEntry> {
    rows.iter()
        .flat_map(|row| {
            Language::SHEET_ORDER
                .iter()
                .zip(row.iter())
                .filter_map(|(language, cell)| {
                    let word = cell.as_ref().trim();
                    (!word.is_empty()).then(|| WordEntry::new(word, *language))
                })
        })
        .collect()
}

/// Outcome of processing one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    /// Position of the entry after flattening
    pub row_index: usize,
    pub entry: WordEntry,
    /// Raw text returned by the generator
    #[serde(default)]
    pub prompt_result: String,
    /// Whether the note sink confirmed the note
    #[serde(default)]
    pub anki_added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslationEntry {
    pub fn new(row_index: usize, entry: WordEntry) -> Self {
        Self {
            row_index,
            entry,
            prompt_result: String::new(),
            anki_added: false,
            error: None,
        }
    }

    /// A row that never produced a usable result.
    pub fn failed(row_index: usize, entry: WordEntry, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(row_index, entry)
        }
    }
}

/// A note ready to be handed to the flashcard backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub deck: String,
    pub model_name: String,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
}

/// A failed row as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRow {
    pub row_index: usize,
    pub error: String,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Rows attempted this run (skipped rows excluded)
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<FailedRow>,
    /// Source rows removed during cleanup
    pub deleted_rows: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub runtime_secs: f64,
}

impl RunSummary {
    /// Tally results of a batch run.
    pub fn from_results(results: &[TranslationEntry]) -> Self {
        let successful = results.iter().filter(|r| r.anki_added).count();
        let failures = results
            .iter()
            .filter(|r| !r.anki_added)
            .map(|r| FailedRow {
                row_index: r.row_index,
                error: r
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
            .collect::<Vec<_>>();

        Self {
            total: results.len(),
            successful,
            failed: failures.len(),
            failures,
            ..Default::default()
        }
    }
}
