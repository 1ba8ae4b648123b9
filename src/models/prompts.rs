//! Per-language prompt templates.

use crate::models::{AnkisyncError, Language, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder replaced by the word when a template is filled.
pub const WORD_PLACEHOLDER: &str = "{word}";

/// Prompt templates keyed by language.
///
/// A language without a template is a configuration error; there is no
/// fallback template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplates(BTreeMap<Language, String>);

impl PromptTemplates {
    pub fn new(templates: BTreeMap<Language, String>) -> Self {
        Self(templates)
    }

    /// Template for `language`.
    pub fn get(&self, language: Language) -> Result<&str> {
        self.0
            .get(&language)
            .map(String::as_str)
            .ok_or(AnkisyncError::MissingPrompt(language))
    }

    /// Languages of the sheet that have no template.
    pub fn missing_languages(&self) -> Vec<Language> {
        Language::SHEET_ORDER
            .into_iter()
            .filter(|lang| !self.0.contains_key(lang))
            .collect()
    }

    /// Substitute `word` into `template`.
    pub fn fill(template: &str, word: &str) -> String {
        template.replace(WORD_PLACEHOLDER, word)
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        let explain_with_english = |lang: &str| {
            format!(
                "Please explain what this word means: {WORD_PLACEHOLDER}, include some example \
                 sentences (in {lang}) alongside their translations to english."
            )
        };

        let mut templates = BTreeMap::new();
        templates.insert(Language::German, explain_with_english("german"));
        templates.insert(Language::Turkish, explain_with_english("turkish"));
        templates.insert(Language::Russian, explain_with_english("russian"));
        templates.insert(
            Language::English,
            format!(
                "Please explain the meaning of this word: {WORD_PLACEHOLDER}, alongside a few \
                 example sentences. If possible, include the translation to portuguese, \
                 including the same examples translated."
            ),
        );
        Self(templates)
    }
}
