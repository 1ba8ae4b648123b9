//! Clients for the services ankisync talks to.
//!
//! The pipeline only sees the capability traits; the concrete clients are
//! wired up in `main`.

mod anki;
mod csv_sheet;
mod ollama;
mod sheets;
mod traits;

pub use anki::*;
pub use csv_sheet::*;
pub use ollama::*;
pub use sheets::*;
pub use traits::*;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 400;

/// Pull a human-readable message out of an error response body.
///
/// Understands `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"message": "..."}`; anything else is returned trimmed and truncated.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        let message = v
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| v.get("message").and_then(|m| m.as_str()));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY {
        let snippet: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        format!("{snippet}...")
    } else {
        trimmed.to_string()
    }
}
