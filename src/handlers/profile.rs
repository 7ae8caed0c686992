use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::api::{ActionContext, Envelope};
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::handlers::is_unique_violation;
use crate::state::AppState;

/// Which face of the account an update targets. A user holding both roles
/// keeps separate partner artwork on the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileContext {
    Personal,
    Partner,
}

impl ProfileContext {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("partner") => ProfileContext::Partner,
            _ => ProfileContext::Personal,
        }
    }

    /// `(incoming key, column)` pairs accepted for this context, in order.
    /// Later pairs win when two keys target the same column.
    pub fn field_map(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ProfileContext::Personal => &[
                ("username", "username"),
                ("business_name", "business_name"),
                ("profile_pic", "profile_pic"),
                ("cover_url", "cover_url"),
                ("email", "email"),
            ],
            ProfileContext::Partner => &[
                ("partner_profile_pic", "partner_profile_pic"),
                ("partner_cover_url", "partner_cover_url"),
                ("profile_pic", "partner_profile_pic"),
                ("cover_url", "partner_cover_url"),
                ("business_name", "business_name"),
                ("email", "email"),
            ],
        }
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        other => SqlValue::Text(other.to_string()),
    }
}

/// The `SET` assignments for the keys present in `body`, one per column.
pub fn collect_updates(
    context: ProfileContext,
    body: &serde_json::Map<String, Value>,
) -> Vec<(&'static str, SqlValue)> {
    let mut updates: Vec<(&'static str, SqlValue)> = Vec::new();
    for (incoming, column) in context.field_map() {
        let Some(value) = body.get(*incoming) else {
            continue;
        };
        let value = to_sql_value(value);
        match updates.iter_mut().find(|(c, _)| *c == *column) {
            Some(existing) => existing.1 = value,
            None => updates.push((*column, value)),
        }
    }
    updates
}

/// `update_user`: partial profile update. Only keys present in the body are
/// written; `password` is accepted in either context.
pub fn update_user(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let user_id = ctx
        .body_int("id")
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid user id"))?;
    let user_id = ctx.authorize(state, user_id)?;

    let context = ProfileContext::from_label(ctx.body.get("context").and_then(Value::as_str));

    let mut updates: Vec<(&'static str, SqlValue)> = Vec::new();
    if let Some(password) = ctx.body.get("password").and_then(Value::as_str) {
        if !password.is_empty() {
            updates.push(("password_hash", SqlValue::Text(hash_password(password)?)));
        }
    }
    updates.extend(collect_updates(context, &ctx.body));

    if updates.is_empty() {
        return Err(AppError::invalid("No valid fields to update"));
    }

    let assignments: Vec<String> = updates
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect();
    let sql = format!(
        "UPDATE users SET {} WHERE id = ?{}",
        assignments.join(", "),
        updates.len() + 1
    );

    let mut values: Vec<SqlValue> = updates.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::Integer(user_id));

    let conn = state.db.get()?;
    match conn.execute(&sql, rusqlite::params_from_iter(values)) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::invalid("Email already exists"));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::debug!(user_id, ?context, "Profile updated");
    Ok(Envelope::success().message("Profile Updated"))
}
