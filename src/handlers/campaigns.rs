use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::Value;

use crate::api::context::lenient_id;
use crate::api::{ActionContext, Envelope};
use crate::db::models::{Campaign, CampaignStatus, CampaignType};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const NOT_FOUND: &str = "Campaign not found or already deleted";

#[derive(Deserialize)]
struct CreateCampaignRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    partner_id: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    reward_text: Option<String>,
    media_url: Option<String>,
}

fn parse_kind(raw: Option<&str>) -> AppResult<CampaignType> {
    match raw {
        None | Some("") => Ok(CampaignType::Drop),
        Some(s) => s.parse().map_err(|e| AppError::invalid(format!("{}", e))),
    }
}

fn campaign_owner(conn: &Connection, id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT partner_id FROM campaigns WHERE id = ?1",
        params![id],
        |row| row.get::<_, Option<i64>>(0),
    )
    .optional()
    .map(Option::flatten)
}

pub fn list_active(conn: &Connection, partner_id: i64) -> rusqlite::Result<Vec<Campaign>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM campaigns WHERE partner_id = ?1 AND status = 'active' \
         ORDER BY created_at DESC, id DESC",
        Campaign::COLUMNS
    ))?;
    let campaigns = stmt
        .query_map(params![partner_id], Campaign::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(campaigns)
}

/// `get_campaigns`: a partner's active campaigns, newest first.
pub fn get_campaigns(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let partner_id = ctx.query_int("partner_id").unwrap_or(0);
    let conn = state.db.get()?;
    let campaigns = list_active(&conn, partner_id)?;
    Envelope::success().data(campaigns)
}

/// `create_campaign`: new active campaign for the calling partner.
pub fn create_campaign(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let req: CreateCampaignRequest = ctx.parse_body()?;
    let partner_id = req
        .partner_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid partner_id"))?;
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::invalid("Missing title"))?;
    let kind = parse_kind(req.kind.as_deref())?;
    let partner_id = ctx.authorize(state, partner_id)?;

    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO campaigns (partner_id, title, description, type, status, reward_text, media_url) \
         VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?6)",
        params![
            partner_id,
            title,
            req.description,
            kind,
            req.reward_text,
            req.media_url
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(campaign_id = id, partner_id, %kind, "Campaign created");

    Envelope::success().field("id", id)
}

/// `update_campaign`: partial update of a campaign the caller owns.
pub fn update_campaign(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let id = ctx
        .body_int("id")
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid campaign id"))?;

    let conn = state.db.get()?;
    let owner = campaign_owner(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Campaign not found".into()))?;
    ctx.authorize(state, owner)?;

    let mut updates: Vec<(&'static str, SqlValue)> = Vec::new();
    for column in ["title", "description", "reward_text", "media_url"] {
        match ctx.body.get(column) {
            Some(Value::Null) => updates.push((column, SqlValue::Null)),
            Some(Value::String(s)) => updates.push((column, SqlValue::Text(s.clone()))),
            Some(_) => return Err(AppError::invalid(format!("{} must be a string", column))),
            None => {}
        }
    }
    if let Some(raw) = ctx.body.get("type") {
        let kind = parse_kind(raw.as_str())?;
        updates.push(("type", SqlValue::Text(kind.as_str().to_string())));
    }
    if let Some(raw) = ctx.body.get("status") {
        let status: CampaignStatus = raw
            .as_str()
            .unwrap_or_default()
            .parse()
            .map_err(|e| AppError::invalid(format!("{}", e)))?;
        updates.push(("status", SqlValue::Text(status.as_str().to_string())));
    }

    if updates.is_empty() {
        return Err(AppError::invalid("No valid fields to update"));
    }

    let assignments: Vec<String> = updates
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect();
    let sql = format!(
        "UPDATE campaigns SET {} WHERE id = ?{}",
        assignments.join(", "),
        updates.len() + 1
    );
    let mut values: Vec<SqlValue> = updates.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::Integer(id));
    conn.execute(&sql, rusqlite::params_from_iter(values))?;

    Envelope::success().field("updated", true)
}

/// `delete_campaign`: hard delete. The id may come from the body or the
/// query string.
pub fn delete_campaign(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let id = ctx
        .body_int("id")
        .filter(|id| *id > 0)
        .or_else(|| ctx.query_int("id"))
        .unwrap_or(0);
    if id <= 0 {
        return Err(AppError::invalid("Missing or invalid campaign id"));
    }

    let conn = state.db.get()?;
    let owner = campaign_owner(&conn, id)?.ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    ctx.authorize(state, owner)?;

    let deleted = conn.execute("DELETE FROM campaigns WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }

    tracing::info!(campaign_id = id, "Campaign deleted");
    Envelope::success().field("deleted", true)
}
