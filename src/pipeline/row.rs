//! Single-row processing: word → generated text → note → checkpoint.

use crate::checkpoint::CheckpointManager;
use crate::client::{NoteSink, TextGenerator};
use crate::models::{AnkiConfig, Note, PromptTemplates, Result, TranslationEntry, WordEntry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Error recorded when the note sink answers without a note id.
pub const ANKI_ADDITION_FAILED: &str = "Anki addition failed";

/// Turns one word entry into a processing record.
///
/// Handled failures come back as `Ok` entries carrying an `error`. An `Err`
/// means something escaped that handling and is up to the caller to retry.
#[async_trait]
pub trait RowProcessor: Send + Sync {
    async fn process(
        &self,
        checkpoint: &mut CheckpointManager,
        row_index: usize,
        entry: &WordEntry,
    ) -> Result<TranslationEntry>;
}

/// The generator → note sink → checkpoint pipeline.
pub struct RowPipeline {
    generator: Arc<dyn TextGenerator>,
    sink: Arc<dyn NoteSink>,
    prompts: PromptTemplates,
    note_model: String,
    tags: Vec<String>,
}

impl RowPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        sink: Arc<dyn NoteSink>,
        prompts: PromptTemplates,
        anki: &AnkiConfig,
    ) -> Self {
        Self {
            generator,
            sink,
            prompts,
            note_model: anki.model_name.clone(),
            tags: anki.tags.clone(),
        }
    }

    fn note_for(&self, result: &TranslationEntry) -> Note {
        Note {
            deck: result.entry.language.to_string(),
            model_name: self.note_model.clone(),
            front: result.entry.word.clone(),
            back: result.prompt_result.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[async_trait]
impl RowProcessor for RowPipeline {
    async fn process(
        &self,
        checkpoint: &mut CheckpointManager,
        row_index: usize,
        entry: &WordEntry,
    ) -> Result<TranslationEntry> {
        let template = self.prompts.get(entry.language)?;
        let mut result = TranslationEntry::new(row_index, entry.clone());

        match self.generator.generate(template, &entry.word).await {
            Ok(text) => result.prompt_result = text,
            Err(e) => {
                error!(row = row_index, word = %entry.word, error = %e, "Generation failed");
                result.error = Some(e.to_string());
                return Ok(result);
            }
        }

        match self.sink.add_note(&self.note_for(&result)).await {
            Ok(true) => {
                checkpoint.mark_processed(row_index)?;
                result.anki_added = true;
                info!(
                    row = row_index,
                    word = %entry.word,
                    deck = %entry.language,
                    "Note added"
                );
            }
            Ok(false) => {
                warn!(row = row_index, word = %entry.word, "AnkiConnect returned no note id");
                result.error = Some(ANKI_ADDITION_FAILED.to_string());
            }
            Err(e) => {
                error!(row = row_index, word = %entry.word, error = %e, "AnkiConnect call failed");
                result.error = Some(e.to_string());
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnkisyncError, Language};
    use crate::pipeline::fakes::{FakeGenerator, FakeSink};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn pipeline(generator: &Arc<FakeGenerator>, sink: &Arc<FakeSink>) -> RowPipeline {
        RowPipeline::new(
            generator.clone(),
            sink.clone(),
            PromptTemplates::default(),
            &AnkiConfig::default(),
        )
    }

    fn checkpoint(dir: &TempDir) -> CheckpointManager {
        CheckpointManager::new(&dir.path().join("rows.json")).unwrap()
    }

    #[tokio::test]
    async fn test_routes_by_language() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::default());
        let sink = Arc::new(FakeSink::default());

        let result = pipeline(&generator, &sink)
            .process(&mut checkpoint, 0, &WordEntry::new("Haus", Language::German))
            .await
            .unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            PromptTemplates::default().get(Language::German).unwrap()
        );
        assert_eq!(calls[0].1, "Haus");

        let notes = sink.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].deck, "german");
        assert_eq!(notes[0].front, "Haus");
        assert_eq!(notes[0].back, "explanation of Haus");
        assert_eq!(notes[0].model_name, "Basic");
        assert_eq!(notes[0].tags, vec!["auto-generated".to_string()]);

        assert!(result.anki_added);
        assert_eq!(result.prompt_result, "explanation of Haus");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_success_is_persisted_before_returning() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::default());
        let sink = Arc::new(FakeSink::default());

        pipeline(&generator, &sink)
            .process(&mut checkpoint, 5, &WordEntry::new("ev", Language::Turkish))
            .await
            .unwrap();

        let on_disk = fs::read_to_string(temp_dir.path().join("rows.json")).unwrap();
        assert_eq!(on_disk, "[5]");
    }

    #[tokio::test]
    async fn test_generation_failure_is_recorded_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::failing_on(&["Haus"]));
        let sink = Arc::new(FakeSink::default());

        let result = pipeline(&generator, &sink)
            .process(&mut checkpoint, 0, &WordEntry::new("Haus", Language::German))
            .await
            .unwrap();

        assert!(!result.anki_added);
        assert!(result.error.unwrap().contains("status 500"));
        assert!(sink.notes().is_empty());
        assert!(!checkpoint.contains(0));
    }

    #[tokio::test]
    async fn test_rejected_note_is_a_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::default());
        let sink = Arc::new(FakeSink::rejecting(&["Haus"]));

        let result = pipeline(&generator, &sink)
            .process(&mut checkpoint, 0, &WordEntry::new("Haus", Language::German))
            .await
            .unwrap();

        assert!(!result.anki_added);
        assert_eq!(result.error.as_deref(), Some(ANKI_ADDITION_FAILED));
        assert_eq!(result.prompt_result, "explanation of Haus");
        assert!(!checkpoint.exists());
    }

    #[tokio::test]
    async fn test_sink_error_keeps_underlying_message() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::default());
        let sink = Arc::new(FakeSink::unreachable());

        let result = pipeline(&generator, &sink)
            .process(&mut checkpoint, 0, &WordEntry::new("Haus", Language::German))
            .await
            .unwrap();

        assert!(!result.anki_added);
        assert!(result.error.unwrap().contains("connection refused"));
        assert!(!checkpoint.contains(0));
    }

    #[tokio::test]
    async fn test_missing_prompt_raises_without_calling_services() {
        let temp_dir = TempDir::new().unwrap();
        let mut checkpoint = checkpoint(&temp_dir);
        let generator = Arc::new(FakeGenerator::default());
        let sink = Arc::new(FakeSink::default());

        let mut only_german = BTreeMap::new();
        only_german.insert(Language::German, "explain {word}".to_string());
        let pipeline = RowPipeline::new(
            generator.clone(),
            sink.clone(),
            PromptTemplates::new(only_german),
            &AnkiConfig::default(),
        );

        let err = pipeline
            .process(&mut checkpoint, 0, &WordEntry::new("дом", Language::Russian))
            .await
            .unwrap_err();

        assert!(matches!(err, AnkisyncError::MissingPrompt(Language::Russian)));
        assert!(generator.calls().is_empty());
        assert!(sink.notes().is_empty());
    }
}
