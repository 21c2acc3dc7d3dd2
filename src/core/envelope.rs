//! Uniform response envelope
//!
//! Every operation answers with the same JSON shape:
//!
//! ```json
//! {
//!   "code": 200,
//!   "success_message": "successfully loaded product list",
//!   "error_message": "",
//!   "data": { "products": [], "total_counts": 0, "total_pages": 0 },
//!   "metadata": {
//!     "limit": 10, "total_counts": 0, "total_pages": 0,
//!     "current_page": 1, "next_page": 0, "sort": ""
//!   }
//! }
//! ```
//!
//! Exactly one of `success_message` / `error_message` is filled, and `data`
//! is `null` on error. The HTTP status mirrors `code`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pagination::Pagination;

/// Response envelope returned by every pipeline operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub success_message: String,
    pub error_message: String,
    pub data: Option<Map<String, Value>>,
    pub metadata: MetaData,
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub limit: i64,
    pub total_counts: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub next_page: i64,
    pub sort: String,
}

impl MetaData {
    /// Describe the page produced by a list query
    ///
    /// `next_page` is the following page number while one exists, else 0.
    pub fn for_page(pagination: &Pagination, total_counts: i64, total_pages: i64) -> Self {
        let next_page = if pagination.page < total_pages {
            pagination.page + 1
        } else {
            0
        };

        Self {
            limit: pagination.limit,
            total_counts,
            total_pages,
            current_page: pagination.page,
            next_page,
            sort: pagination.sort.clone(),
        }
    }
}

impl Envelope {
    /// Build a success envelope
    pub fn success(
        code: StatusCode,
        message: impl Into<String>,
        data: Option<Map<String, Value>>,
        metadata: MetaData,
    ) -> Self {
        Self {
            code: code.as_u16(),
            success_message: message.into(),
            error_message: String::new(),
            data,
            metadata,
        }
    }

    /// Build an error envelope
    ///
    /// The cause, rendered with its context chain, becomes the message when
    /// present; `message` is the fallback. Both are logged before returning.
    pub fn error(code: StatusCode, err: Option<&anyhow::Error>, message: impl Into<String>) -> Self {
        let message = message.into();
        let detail = err.map(|e| format!("{:#}", e));

        if code.is_server_error() {
            tracing::error!(code = code.as_u16(), error = ?detail, "{}", message);
        } else {
            tracing::warn!(code = code.as_u16(), error = ?detail, "{}", message);
        }

        Self {
            code: code.as_u16(),
            success_message: String::new(),
            error_message: detail.unwrap_or(message),
            data: None,
            metadata: MetaData::default(),
        }
    }

    /// Whether this envelope reports success
    pub fn is_success(&self) -> bool {
        self.error_message.is_empty() && (200..300).contains(&self.code)
    }

    /// HTTP status mirroring `code`
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

/// Fan a value out into single-key maps
///
/// A string yields one map, a list yields one map per element; any other
/// value yields nothing.
pub fn to_map(key: &str, value: &Value) -> Vec<Map<String, Value>> {
    let single = |v: &Value| {
        let mut map = Map::new();
        map.insert(key.to_string(), v.clone());
        map
    };

    match value {
        Value::String(_) => vec![single(value)],
        Value::Array(items) => items.iter().map(single).collect(),
        _ => Vec::new(),
    }
}
