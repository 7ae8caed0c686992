use std::collections::HashMap;

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::auth::{authorize, IdentitySources};
use crate::error::{AppError, AppResult};
use crate::extractors::Session;
use crate::state::AppState;

/// Everything a JSON action handler may read from the request.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub session: Option<Session>,
    pub query: HashMap<String, String>,
    pub body: Map<String, Value>,
    pub headers: HeaderMap,
}

impl ActionContext {
    pub fn principal(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.user_id)
    }

    pub fn query_int(&self, key: &str) -> Option<i64> {
        self.query.get(key).map(|v| parse_int(v))
    }

    pub fn body_int(&self, key: &str) -> Option<i64> {
        self.body.get(key).and_then(lenient_int)
    }

    pub fn identity(&self) -> IdentitySources {
        IdentitySources {
            session: self.principal(),
            query: self.query_int("user_id"),
            body_user_id: self.body_int("user_id"),
            body_id: self.body_int("id"),
        }
    }

    /// Gate `requested` against the session principal.
    pub fn authorize(&self, state: &AppState, requested: i64) -> AppResult<i64> {
        authorize(
            requested,
            self.principal(),
            state.config.auth.trust_client_ids,
        )
    }

    /// Resolve the acting user from [`IdentitySources`] and authorize it.
    pub fn acting_user(
        &self,
        state: &AppState,
        sources: IdentitySources,
        missing: &str,
    ) -> AppResult<i64> {
        let id = sources.resolve().ok_or_else(|| AppError::invalid(missing))?;
        self.authorize(state, id)
    }

    pub fn parse_body<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(Value::Object(self.body.clone()))
            .map_err(|e| AppError::invalid(format!("Invalid request body: {}", e)))
    }
}

/// Parse a request body leniently: anything but a JSON object is treated as
/// an empty object.
pub fn body_object(bytes: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Integer from a query-string value; anything unparseable reads as 0.
pub fn parse_int(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// Integer from a JSON value that may be a number or a numeric string.
/// `null` is "not supplied"; anything else unusable reads as 0.
pub fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)),
        Value::String(s) => Some(parse_int(s)),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => Some(0),
    }
}

/// `deserialize_with` adapter for [`lenient_int`].
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_int(&value))
}

/// A field that may carry one value or a list of them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}
