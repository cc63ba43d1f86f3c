use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MathRequest {
    #[serde(deserialize_with = "operand_from_raw")]
    pub operand1: f64,
    #[serde(deserialize_with = "operand_from_raw")]
    pub operand2: f64,
}

/// Parse the operand from its literal number text, so a literal beyond the
/// `f64` range (e.g. `1e400`) becomes an infinity instead of a parse error.
fn operand_from_raw<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    let text = raw.get();
    let is_number_literal = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'));
    if !is_number_literal {
        return Err(D::Error::custom(format!("invalid operand {text}, expected a number")));
    }
    text.parse::<f64>()
        .map_err(|e| D::Error::custom(format!("invalid operand {text}: {e}")))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MathResponse {
    pub result: f64,
    pub operation: String,
}

impl MathResponse {
    pub fn new(result: f64, operation: &str) -> Self {
        Self {
            result,
            operation: operation.to_string(),
        }
    }
}

/// Error body; `status` is the HTTP status code rendered as a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, status: u16) -> Self {
        Self {
            error: error.into(),
            status: status.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}
