//! AnkiConnect client.

use crate::client::{NoteSink, error_message};
use crate::models::{AnkiConfig, AnkisyncError, Note, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "AnkiConnect";
const API_VERSION: u32 = 6;

/// AnkiConnect action envelope.
#[derive(Debug, Serialize)]
struct ActionRequest<'a, P> {
    action: &'a str,
    version: u32,
    params: P,
}

#[derive(Debug, Serialize)]
struct AddNoteParams<'a> {
    note: AnkiNote<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnkiNote<'a> {
    deck_name: &'a str,
    model_name: &'a str,
    fields: NoteFields<'a>,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct NoteFields<'a> {
    #[serde(rename = "Front")]
    front: &'a str,
    #[serde(rename = "Back")]
    back: &'a str,
}

/// AnkiConnect reply: `result` carries the note id, `error` the reason when
/// there is none.
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// AnkiConnect client.
pub struct AnkiClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl AnkiClient {
    pub fn new(config: &AnkiConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AnkisyncError::Network)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
        })
    }

    fn build_request(note: &Note) -> ActionRequest<'_, AddNoteParams<'_>> {
        ActionRequest {
            action: "addNote",
            version: API_VERSION,
            params: AddNoteParams {
                note: AnkiNote {
                    deck_name: &note.deck,
                    model_name: &note.model_name,
                    fields: NoteFields {
                        front: &note.front,
                        back: &note.back,
                    },
                    tags: &note.tags,
                },
            },
        }
    }

    /// Interpret a 2xx body into the note id, if any, and the error text.
    fn parse_response(body: &str) -> Result<(Option<serde_json::Value>, Option<String>)> {
        let parsed: ActionResponse =
            serde_json::from_str(body).map_err(|e| AnkisyncError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })?;
        let id = parsed.result.filter(|v| !v.is_null());
        Ok((id, parsed.error))
    }
}

#[async_trait]
impl NoteSink for AnkiClient {
    async fn add_note(&self, note: &Note) -> Result<bool> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Self::build_request(note))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnkisyncError::Timeout(self.timeout)
                } else {
                    AnkisyncError::Network(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(AnkisyncError::Network)?;

        if !status.is_success() {
            return Err(AnkisyncError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        match Self::parse_response(&body)? {
            (Some(id), _) => {
                debug!(note_id = %id, deck = %note.deck, front = %note.front, "Note added");
                Ok(true)
            }
            (None, error) => {
                warn!(
                    deck = %note.deck,
                    front = %note.front,
                    error = error.as_deref().unwrap_or("no note id returned"),
                    "AnkiConnect rejected note"
                );
                Ok(false)
            }
        }
    }
}
