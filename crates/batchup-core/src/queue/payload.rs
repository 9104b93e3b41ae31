//! Server response bodies kept on successful items.

use serde::Serialize;

/// Body of a successful upload: JSON when well-formed, the raw text otherwise.
/// A body that fails to parse is not an error; the upload still counts as done.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Json(serde_json::Value),
    Raw(String),
}

impl ResponsePayload {
    pub fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(value) => ResponsePayload::Json(value),
            Err(_) => ResponsePayload::Raw(String::from_utf8_lossy(body).into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponsePayload::Json(v) => Some(v),
            ResponsePayload::Raw(_) => None,
        }
    }

    /// Link to the stored file from a `{"url": "..."}` answer. None for private
    /// uploads (`"url": null`) or non-JSON bodies.
    pub fn url(&self) -> Option<&str> {
        self.as_json()?.get("url")?.as_str()
    }
}
