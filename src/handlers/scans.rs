use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::api::context::lenient_id;
use crate::api::{ActionContext, Envelope};
use crate::db::models::{InfluencerRevenue, Scan};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
struct ManualScanRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    partner_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    influencer_id: Option<i64>,
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    revenue: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    traffic: Option<i64>,
}

pub struct NewScan<'a> {
    pub partner_id: i64,
    pub influencer_id: i64,
    pub source: Option<&'a str>,
    pub revenue: i64,
    pub traffic: i64,
    /// `YYYY-MM-DD HH:MM:SS`; `None` stamps the current time.
    pub created_at: Option<String>,
}

pub fn insert_scan(conn: &Connection, scan: &NewScan<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO scans (partner_id, influencer_id, source, revenue, traffic, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, datetime('now')))",
        params![
            scan.partner_id,
            scan.influencer_id,
            scan.source,
            scan.revenue,
            scan.traffic,
            scan.created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fold one scan into the per-pair totals.
pub fn bump_revenue(
    conn: &Connection,
    influencer_id: i64,
    partner_id: i64,
    revenue: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO influencer_revenue (influencer_id, partner_id, total_revenue, total_sales) \
         VALUES (?1, ?2, ?3, 1) \
         ON CONFLICT (influencer_id, partner_id) DO UPDATE SET \
         total_revenue = total_revenue + excluded.total_revenue, \
         total_sales = total_sales + 1",
        params![influencer_id, partner_id, revenue],
    )?;
    Ok(())
}

/// Recompute `influencer_revenue` from scratch out of `scans`.
pub fn rebuild_revenue_summary(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM influencer_revenue", [])?;
    conn.execute(
        "INSERT INTO influencer_revenue (influencer_id, partner_id, total_revenue, total_sales) \
         SELECT influencer_id, partner_id, COALESCE(SUM(revenue), 0), COUNT(*) FROM scans \
         WHERE influencer_id IS NOT NULL AND partner_id IS NOT NULL \
         GROUP BY influencer_id, partner_id",
        [],
    )
}

/// Every influencer's totals with one partner.
pub fn revenue_for_partner(
    conn: &Connection,
    partner_id: i64,
) -> rusqlite::Result<Vec<InfluencerRevenue>> {
    let mut stmt = conn.prepare(
        "SELECT influencer_id, partner_id, total_revenue, total_sales \
         FROM influencer_revenue WHERE partner_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![partner_id], InfluencerRevenue::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// `manual_add_scan`: a partner records a scan by hand.
pub fn manual_add_scan(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let req: ManualScanRequest = ctx.parse_body()?;
    let partner_id = req
        .partner_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid partner_id"))?;
    let influencer_id = req
        .influencer_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid influencer_id"))?;
    let revenue = req.revenue.unwrap_or(0);
    if revenue < 0 {
        return Err(AppError::invalid("Revenue cannot be negative"));
    }
    let partner_id = ctx.authorize(state, partner_id)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let id = insert_scan(
        &tx,
        &NewScan {
            partner_id,
            influencer_id,
            source: req.source.as_deref(),
            revenue,
            traffic: req.traffic.unwrap_or(0).max(0),
            created_at: None,
        },
    )?;
    bump_revenue(&tx, influencer_id, partner_id, revenue)?;
    let scan = tx.query_row(
        &format!("SELECT {} FROM scans WHERE id = ?1", Scan::COLUMNS),
        params![id],
        Scan::from_row,
    )?;
    tx.commit()?;

    tracing::info!(scan_id = id, partner_id, influencer_id, revenue, "Scan recorded");
    Envelope::success().data(scan)
}
