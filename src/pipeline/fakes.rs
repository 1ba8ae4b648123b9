//! In-memory stand-ins for the external services.

use crate::client::{NoteSink, RowSource, TextGenerator};
use crate::models::{AnkisyncError, Note, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

fn words(list: &[&str]) -> HashSet<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Generator answering "explanation of <word>", or a 500 for chosen words.
#[derive(Default)]
pub struct FakeGenerator {
    fail_words: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn failing_on(list: &[&str]) -> Self {
        Self {
            fail_words: words(list),
            ..Default::default()
        }
    }

    /// (template, word) pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, template: &str, word: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((template.to_string(), word.to_string()));

        if self.fail_words.contains(word) {
            return Err(AnkisyncError::Api {
                service: "Ollama",
                status: 500,
                message: "model crashed".to_string(),
            });
        }
        Ok(format!("explanation of {word}"))
    }
}

/// Note sink that accepts everything except chosen fronts.
#[derive(Default)]
pub struct FakeSink {
    reject_fronts: HashSet<String>,
    unreachable: bool,
    notes: Mutex<Vec<Note>>,
}

impl FakeSink {
    /// Answers without a note id for these fronts.
    pub fn rejecting(list: &[&str]) -> Self {
        Self {
            reject_fronts: words(list),
            ..Default::default()
        }
    }

    /// Fails every call at the transport level.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    /// Every note offered, accepted or not.
    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteSink for FakeSink {
    async fn add_note(&self, note: &Note) -> Result<bool> {
        self.notes.lock().unwrap().push(note.clone());

        if self.unreachable {
            return Err(AnkisyncError::io(
                "connection refused",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            ));
        }
        Ok(!self.reject_fronts.contains(&note.front))
    }
}

/// Row source holding rows in memory and recording delete requests.
#[derive(Default)]
pub struct FakeSource {
    rows: Vec<Vec<String>>,
    fail_delete: bool,
    deletes: Mutex<Vec<Vec<usize>>>,
}

impl FakeSource {
    pub fn with_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_delete: true,
            ..Default::default()
        }
    }

    /// Each delete request received, in call order.
    pub fn deletes(&self) -> Vec<Vec<usize>> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowSource for FakeSource {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.rows.clone())
    }

    async fn delete_rows(&self, rows: &[usize]) -> Result<()> {
        self.deletes.lock().unwrap().push(rows.to_vec());

        if self.fail_delete {
            return Err(AnkisyncError::Api {
                service: "Google Sheets",
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}
