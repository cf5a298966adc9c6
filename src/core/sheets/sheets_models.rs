// Domain types for talking to the spreadsheet values API. No HTTP client types
// here; the request descriptor is plain data that any transport can send.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// CELL VALUES
// ============================================================================

/// A single scalar cell. Serializes to the bare JSON scalar the API expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    /// Whole numbers stay integers on the wire so large IDs are not rounded.
    Integer(i64),
    Number(f64),
    Text(String),
    /// Serialized as `null`, which the API treats as "leave this cell alone".
    Empty,
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Rows of cells, outer = rows, inner = columns.
pub type Rows = Vec<Vec<CellValue>>;

/// Builds `Rows` from anything convertible into cells.
pub fn rows<R, C>(input: impl IntoIterator<Item = R>) -> Rows
where
    R: IntoIterator<Item = C>,
    C: Into<CellValue>,
{
    input
        .into_iter()
        .map(|row| row.into_iter().map(Into::into).collect())
        .collect()
}

/// Whether written values are parsed like user input or stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    Raw,
    #[default]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// One range write inside a batch update.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Rows,
}

impl RangeUpdate {
    pub fn new(range: impl Into<String>, values: Rows) -> Self {
        Self {
            range: range.into(),
            values,
        }
    }
}

/// The three spreadsheet operations this crate supports.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetsOperation {
    Read {
        spreadsheet_id: String,
        range: String,
    },
    Append {
        spreadsheet_id: String,
        range: String,
        values: Rows,
        value_input_option: ValueInputOption,
    },
    BatchUpdate {
        spreadsheet_id: String,
        /// Sent in this order.
        updates: Vec<RangeUpdate>,
        value_input_option: ValueInputOption,
    },
}

impl SheetsOperation {
    pub fn spreadsheet_id(&self) -> &str {
        match self {
            SheetsOperation::Read { spreadsheet_id, .. }
            | SheetsOperation::Append { spreadsheet_id, .. }
            | SheetsOperation::BatchUpdate { spreadsheet_id, .. } => spreadsheet_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SheetsOperation::Read { .. } => "read",
            SheetsOperation::Append { .. } => "append",
            SheetsOperation::BatchUpdate { .. } => "batch_update",
        }
    }

    /// Catches operations the API would reject anyway, before any credential
    /// or network work happens.
    pub fn validate(&self) -> Result<(), String> {
        if self.spreadsheet_id().trim().is_empty() {
            return Err("spreadsheet id is empty".to_string());
        }

        match self {
            SheetsOperation::Read { range, .. } => check_range(range),
            SheetsOperation::Append { range, values, .. } => {
                check_range(range)?;
                if values.is_empty() {
                    return Err("append has no rows".to_string());
                }
                check_rectangular(range, values)
            }
            SheetsOperation::BatchUpdate { updates, .. } => {
                if updates.is_empty() {
                    return Err("batch update has no ranges".to_string());
                }
                for update in updates {
                    check_range(&update.range)?;
                    check_rectangular(&update.range, &update.values)?;
                }
                Ok(())
            }
        }
    }
}

fn check_range(range: &str) -> Result<(), String> {
    if range.trim().is_empty() {
        Err("range is empty".to_string())
    } else {
        Ok(())
    }
}

fn check_rectangular(range: &str, values: &Rows) -> Result<(), String> {
    let Some(width) = values.first().map(Vec::len) else {
        return Ok(());
    };
    match values.iter().position(|row| row.len() != width) {
        Some(index) => Err(format!(
            "rows for '{}' are not rectangular: row {} has {} cells, expected {}",
            range,
            index,
            values[index].len(),
            width
        )),
        None => Ok(()),
    }
}

// ============================================================================
// REQUEST DESCRIPTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A fully built request: everything a transport needs, nothing it has to decide.
#[derive(Clone, PartialEq)]
pub struct HttpRequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequestDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl std::fmt::Debug for HttpRequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.as_str(), "<redacted>")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}
