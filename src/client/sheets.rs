//! Google Sheets v4 row source.

use crate::client::{RowSource, descending_unique, error_message};
use crate::models::{AnkisyncError, Result, SheetsConfig};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const SERVICE: &str = "Google Sheets";

/// `spreadsheets.values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BatchUpdateRequest {
    requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    delete_dimension: DeleteDimension,
}

#[derive(Debug, Serialize)]
struct DeleteDimension {
    range: DimensionRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DimensionRange {
    sheet_id: i64,
    dimension: &'static str,
    start_index: usize,
    end_index: usize,
}

/// Spreadsheet-backed row source.
pub struct GoogleSheet {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    sheet_id: i64,
    timeout: Duration,
}

impl GoogleSheet {
    /// Create a client for the configured spreadsheet.
    ///
    /// The bearer token is resolved here so a missing token fails at startup.
    pub fn new(config: &SheetsConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AnkisyncError::InvalidInput(format!("Invalid Sheets token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(AnkisyncError::Network)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            sheet_id: config.sheet_id,
            timeout,
        })
    }

    fn values_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, self.range
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.base_url, self.spreadsheet_id
        )
    }

    fn delete_request(&self, rows: &[usize]) -> BatchUpdateRequest {
        BatchUpdateRequest {
            requests: descending_unique(rows)
                .into_iter()
                .map(|row| Request {
                    delete_dimension: DeleteDimension {
                        range: DimensionRange {
                            sheet_id: self.sheet_id,
                            dimension: "ROWS",
                            start_index: row,
                            end_index: row + 1,
                        },
                    },
                })
                .collect(),
        }
    }

    /// Strip the header row off a values response.
    fn data_rows(body: &str) -> Result<Vec<Vec<String>>> {
        let range: ValueRange =
            serde_json::from_str(body).map_err(|e| AnkisyncError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(range.values.into_iter().skip(1).collect())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
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
        Ok(body)
    }
}

#[async_trait]
impl RowSource for GoogleSheet {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let body = self.send(self.client.get(self.values_url())).await?;
        let rows = Self::data_rows(&body)?;

        if rows.is_empty() {
            warn!(spreadsheet = %self.spreadsheet_id, "No data found in Google Sheet");
        } else {
            info!(rows = rows.len(), "Read rows from Google Sheet");
        }
        Ok(rows)
    }

    async fn delete_rows(&self, rows: &[usize]) -> Result<()> {
        if rows.contains(&0) {
            return Err(AnkisyncError::InvalidInput(
                "Refusing to delete the header row".to_string(),
            ));
        }

        let request = self.delete_request(rows);
        let count = request.requests.len();
        self.send(self.client.post(self.batch_update_url()).json(&request))
            .await?;

        info!(count, "Deleted rows from Google Sheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> GoogleSheet {
        GoogleSheet::new(&SheetsConfig {
            spreadsheet_id: "sheet-123".to_string(),
            range: "Sheet1!A:D".to_string(),
            sheet_id: 0,
            token: Some("test-token".to_string()),
            token_env: "GOOGLE_SHEETS_TOKEN".to_string(),
            base_url: "https://sheets.example.test/v4/".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let sheet = sheet();
        assert_eq!(
            sheet.values_url(),
            "https://sheets.example.test/v4/spreadsheets/sheet-123/values/Sheet1!A:D"
        );
        assert_eq!(
            sheet.batch_update_url(),
            "https://sheets.example.test/v4/spreadsheets/sheet-123:batchUpdate"
        );
    }

    #[test]
    fn test_delete_request_runs_bottom_up() {
        let request = serde_json::to_value(sheet().delete_request(&[3, 6, 1])).unwrap();
        let starts: Vec<u64> = request["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["deleteDimension"]["range"]["startIndex"].as_u64().unwrap())
            .collect();
        assert_eq!(starts, vec![6, 3, 1]);

        assert_eq!(
            request["requests"][0]["deleteDimension"]["range"],
            serde_json::json!({
                "sheetId": 0,
                "dimension": "ROWS",
                "startIndex": 6,
                "endIndex": 7
            })
        );
    }

    #[test]
    fn test_data_rows_skip_header() {
        let body = r#"{
            "range": "Sheet1!A1:D3",
            "majorDimension": "ROWS",
            "values": [["German", "Turkish", "Russian", "English"], ["Haus", "ev"], ["", "", "", "tree"]]
        }"#;
        let rows = GoogleSheet::data_rows(body).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Haus".to_string(), "ev".to_string()],
                vec![String::new(), String::new(), String::new(), "tree".to_string()],
            ]
        );
    }

    #[test]
    fn test_empty_sheet_has_no_values_key() {
        let rows = GoogleSheet::data_rows(r#"{"range": "Sheet1!A1:D1"}"#).unwrap();
        assert!(rows.is_empty());
    }
}
