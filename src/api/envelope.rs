use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppResult;

/// The server's response shape: `{"status": "success", "message"?, "data"?, ...}`.
///
/// Some actions nest their payload under `data`, others put fields next to
/// `status` (`user_id` from register, `url` from upload). Both are kept since
/// clients depend on each.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(skip)]
    set_cookie: Option<String>,
}

impl Envelope {
    pub fn success() -> Self {
        Envelope {
            status: "success",
            message: None,
            data: None,
            fields: Map::new(),
            set_cookie: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn data<T: Serialize>(mut self, data: T) -> AppResult<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// A payload field next to `status`.
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> AppResult<Self> {
        self.fields.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.set_cookie = Some(cookie);
        self
    }

    pub fn to_json(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl IntoResponse for Envelope {
    fn into_response(mut self) -> Response {
        match self.set_cookie.take() {
            Some(cookie) => ([(header::SET_COOKIE, cookie)], Json(self)).into_response(),
            None => Json(self).into_response(),
        }
    }
}

/// Reply for requests that name no known action.
pub fn banner() -> Json<Value> {
    Json(serde_json::json!({ "message": "VibeCheck Omni-API Online" }))
}
