//! Request and response envelopes.

use serde::{Deserialize, Deserializer, Serialize};

/// Status reported by every successful envelope response.
pub const STATUS_SUCCESS: &str = "success";

/// Body accepted by the POST, PUT and PATCH endpoints.
///
/// `value` is opaque text. JSON numbers keep the exact text they were sent
/// with, booleans become `true`/`false`, and an explicit or missing `null`
/// becomes the literal `null`. Objects and arrays are rejected at binding
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestData {
    #[serde(default = "null_text", deserialize_with = "scalar_as_text")]
    pub value: String,
}

impl RequestData {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

/// Envelope returned by the GET, POST, PUT and PATCH endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResponseData {
    pub status: String,
    pub message: String,
}

impl ResponseData {
    /// A `success` envelope carrying `message`.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Null(()),
}

fn null_text() -> String {
    "null".to_string()
}

// serde_json's `arbitrary_precision` keeps numbers as their source text.
fn scalar_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Null(()) => null_text(),
    })
}
