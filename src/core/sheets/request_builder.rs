// Translates a `SheetsOperation` into the concrete request the values API
// expects. Pure: no I/O, no clock, same input gives the same request.

use serde_json::json;

use crate::core::auth::CachedToken;
use crate::core::sheets::{HttpMethod, HttpRequestDescriptor, SheetsOperation};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Clone)]
pub struct SheetsRequestBuilder {
    base_url: String,
}

impl Default for SheetsRequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SHEETS_BASE_URL)
    }
}

impl SheetsRequestBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn build(&self, operation: &SheetsOperation, token: &CachedToken) -> HttpRequestDescriptor {
        let mut headers = vec![("Authorization".to_string(), token.authorization_header())];

        match operation {
            SheetsOperation::Read {
                spreadsheet_id,
                range,
            } => HttpRequestDescriptor {
                method: HttpMethod::Get,
                url: format!(
                    "{}/spreadsheets/{}/values/{}",
                    self.base_url,
                    encode_component(spreadsheet_id),
                    encode_component(range)
                ),
                headers,
                body: None,
            },

            SheetsOperation::Append {
                spreadsheet_id,
                range,
                values,
                value_input_option,
            } => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                HttpRequestDescriptor {
                    method: HttpMethod::Post,
                    url: format!(
                        "{}/spreadsheets/{}/values/{}:append?valueInputOption={}",
                        self.base_url,
                        encode_component(spreadsheet_id),
                        encode_component(range),
                        value_input_option.as_str()
                    ),
                    headers,
                    body: Some(json!({ "values": values })),
                }
            }

            SheetsOperation::BatchUpdate {
                spreadsheet_id,
                updates,
                value_input_option,
            } => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                let data: Vec<_> = updates
                    .iter()
                    .map(|update| json!({ "range": update.range, "values": update.values }))
                    .collect();
                HttpRequestDescriptor {
                    method: HttpMethod::Post,
                    url: format!(
                        "{}/spreadsheets/{}/values:batchUpdate",
                        self.base_url,
                        encode_component(spreadsheet_id)
                    ),
                    headers,
                    body: Some(json!({
                        "valueInputOption": value_input_option.as_str(),
                        "data": data
                    })),
                }
            }
        }
    }
}

/// Percent-encodes a path component the way the values API expects for A1
/// ranges: `:` becomes `%3A` and spaces `%20`, while `!` (and the other marks
/// `'()*`) stay literal so `Sheet1!A:G` becomes `Sheet1!A%3AG`.
pub fn encode_component(raw: &str) -> String {
    // A literal '%' is encoded as %25 first, so these sequences can only come
    // from the characters we want to keep.
    urlencoding::encode(raw)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sheets::{rows, RangeUpdate, ValueInputOption};
    use chrono::Utc;
    use serde_json::json;

    fn token() -> CachedToken {
        CachedToken {
            access_token: "ya29.test-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            acquired_at: Utc::now(),
        }
    }

    fn builder() -> SheetsRequestBuilder {
        SheetsRequestBuilder::new("https://sheets.googleapis.com/v4/")
    }

    #[test]
    fn encodes_ranges_like_the_api_expects() {
        assert_eq!(encode_component("Sheet1!A:G"), "Sheet1!A%3AG");
        assert_eq!(encode_component("Sheet1!A1:B2"), "Sheet1!A1%3AB2");
        assert_eq!(encode_component("'My Sheet'!A1"), "'My%20Sheet'!A1");
        assert_eq!(encode_component("100%"), "100%25");
        assert_eq!(encode_component("Data/2024"), "Data%2F2024");
    }

    #[test]
    fn read_request() {
        let op = SheetsOperation::Read {
            spreadsheet_id: "test-sheet-id".to_string(),
            range: "Sheet1!A1:G10".to_string(),
        };
        let req = builder().build(&op, &token());

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "https://sheets.googleapis.com/v4/spreadsheets/test-sheet-id/values/Sheet1!A1%3AG10"
        );
        assert_eq!(req.header("Authorization"), Some("Bearer ya29.test-token"));
        assert_eq!(req.body, None);
    }

    #[test]
    fn append_request() {
        let op = SheetsOperation::Append {
            spreadsheet_id: "test-sheet-id".to_string(),
            range: "Sheet1!A:G".to_string(),
            values: rows(vec![vec!["a", "b"]]),
            value_input_option: ValueInputOption::UserEntered,
        };
        let req = builder().build(&op, &token());

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "https://sheets.googleapis.com/v4/spreadsheets/test-sheet-id/values/Sheet1!A%3AG:append?valueInputOption=USER_ENTERED"
        );
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("Authorization"), Some("Bearer ya29.test-token"));
        assert_eq!(req.body, Some(json!({ "values": [["a", "b"]] })));
    }

    #[test]
    fn batch_update_preserves_order() {
        let op = SheetsOperation::BatchUpdate {
            spreadsheet_id: "test-sheet-id".to_string(),
            updates: vec![
                RangeUpdate::new("Sheet1!B2", rows(vec![vec!["second"]])),
                RangeUpdate::new("Sheet1!A1", rows(vec![vec!["first"]])),
            ],
            value_input_option: ValueInputOption::Raw,
        };
        let req = builder().build(&op, &token());

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "https://sheets.googleapis.com/v4/spreadsheets/test-sheet-id/values:batchUpdate"
        );
        assert_eq!(
            req.body,
            Some(json!({
                "valueInputOption": "RAW",
                "data": [
                    { "range": "Sheet1!B2", "values": [["second"]] },
                    { "range": "Sheet1!A1", "values": [["first"]] }
                ]
            }))
        );
    }
}
