use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::analytics::{
    self, ChartPoint, LeaderboardCandidate, MonthlyTotal, TopInfluencer, LEADERBOARD_SIZE,
    MONTH_WINDOW,
};
use crate::api::{ActionContext, Envelope};
use crate::db::models::GigReward;
use crate::error::AppResult;
use crate::handlers::scans::revenue_for_partner;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InfluencerDashboard {
    pub available_balance: f64,
    pub monthly_breakdown: Vec<MonthlyTotal>,
    pub gig_rewards: Vec<GigReward>,
}

#[derive(Debug, Serialize)]
pub struct PartnerDashboard {
    pub chart_data: Vec<ChartPoint>,
    pub top_influencers: Vec<TopInfluencer>,
    /// True when `chart_data` is the placeholder series.
    pub is_demo_data: bool,
}

fn month_totals(
    conn: &Connection,
    sql: &str,
    user_id: i64,
) -> rusqlite::Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(ym, total)| ym.map(|ym| (ym, total)))
        .collect())
}

pub fn load_influencer_dashboard(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
) -> rusqlite::Result<InfluencerDashboard> {
    let available_balance: f64 = conn.query_row(
        "SELECT (SELECT COALESCE(SUM(revenue), 0) FROM scans WHERE influencer_id = ?1) + \
                (SELECT COALESCE(SUM(amount), 0) FROM earnings WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;

    let mut rows = month_totals(
        conn,
        "SELECT strftime('%Y-%m', created_at) AS ym, COALESCE(SUM(revenue), 0) \
         FROM scans WHERE influencer_id = ?1 GROUP BY ym",
        user_id,
    )?;
    rows.extend(month_totals(
        conn,
        "SELECT strftime('%Y-%m', created_at) AS ym, COALESCE(SUM(amount), 0) \
         FROM earnings WHERE user_id = ?1 GROUP BY ym",
        user_id,
    )?);
    let monthly_breakdown = analytics::monthly_window(today, MONTH_WINDOW, rows);

    let mut stmt = conn.prepare(
        "SELECT id, gig_name, status, reward, date FROM gig_rewards \
         WHERE user_id = ?1 ORDER BY date DESC, id DESC",
    )?;
    let gig_rewards = stmt
        .query_map(params![user_id], GigReward::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InfluencerDashboard {
        available_balance,
        monthly_breakdown,
        gig_rewards,
    })
}

pub fn load_partner_dashboard<R: Rng + ?Sized>(
    conn: &Connection,
    partner_id: i64,
    today: NaiveDate,
    rng: &mut R,
) -> rusqlite::Result<PartnerDashboard> {
    let start = analytics::chart_start(today).format("%Y-%m-%d").to_string();
    let end = today.format("%Y-%m-%d").to_string();

    let mut stmt = conn.prepare(
        "SELECT date(created_at) AS day, COALESCE(SUM(revenue), 0), COUNT(*) FROM scans \
         WHERE partner_id = ?1 AND date(created_at) BETWEEN ?2 AND ?3 \
         GROUP BY day ORDER BY day ASC",
    )?;
    let mut chart_data = stmt
        .query_map(params![partner_id, start, end], |row| {
            Ok(ChartPoint {
                date: row.get(0)?,
                rev: row.get(1)?,
                scans: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let is_demo_data = chart_data.is_empty();
    if is_demo_data {
        chart_data = analytics::demo_chart(today);
    }

    let totals: HashMap<i64, (i64, i64)> = revenue_for_partner(conn, partner_id)?
        .into_iter()
        .map(|r| (r.influencer_id, (r.total_revenue, r.total_sales)))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.profile_pic FROM users u \
         JOIN user_roles ur ON u.id = ur.user_id \
         WHERE ur.role = 'influencer' AND u.id != ?1 \
         ORDER BY u.created_at DESC, u.id DESC LIMIT ?2",
    )?;
    let candidates = stmt
        .query_map(params![partner_id, LEADERBOARD_SIZE as i64], |row| {
            let id: i64 = row.get(0)?;
            Ok(LeaderboardCandidate {
                id,
                name: row.get(1)?,
                avatar: row.get(2)?,
                totals: totals.get(&id).copied(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PartnerDashboard {
        chart_data,
        top_influencers: analytics::build_leaderboard(candidates, rng),
        is_demo_data,
    })
}

/// `get_influencer_dashboard`
pub fn influencer_dashboard(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let user_id = ctx.acting_user(state, ctx.identity(), "Missing or invalid user_id")?;
    let conn = state.db.get()?;
    let dashboard = load_influencer_dashboard(&conn, user_id, Utc::now().date_naive())?;
    Envelope::success().data(dashboard)
}

/// `get_partner_dashboard`
pub fn partner_dashboard(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let partner_id =
        ctx.acting_user(state, ctx.identity(), "Missing or invalid partner user_id")?;
    let conn = state.db.get()?;
    let dashboard = load_partner_dashboard(
        &conn,
        partner_id,
        Utc::now().date_naive(),
        &mut rand::thread_rng(),
    )?;
    Envelope::success().data(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::scans::{bump_revenue, insert_scan, NewScan};
    use crate::handlers::testing::{ctx, insert_user, state};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn scan(conn: &Connection, partner: i64, influencer: i64, revenue: i64, at: &str) {
        insert_scan(
            conn,
            &NewScan {
                partner_id: partner,
                influencer_id: influencer,
                source: Some("qr"),
                revenue,
                traffic: 0,
                created_at: Some(at.to_string()),
            },
        )
        .unwrap();
    }

    #[test]
    fn influencer_months_merge_scans_and_earnings() {
        let state = state();
        let conn = state.db.get().unwrap();
        scan(&conn, 1, 5, 30, "2026-09-03 10:00:00");
        scan(&conn, 1, 5, 20, "2026-10-01 10:00:00");
        scan(&conn, 1, 5, 1000, "2025-01-01 10:00:00");
        conn.execute(
            "INSERT INTO earnings (user_id, amount, source_desc, created_at) \
             VALUES (5, 12.5, 'Seeded', '2026-09-20 12:00:00')",
            [],
        )
        .unwrap();

        let dash = load_influencer_dashboard(&conn, 5, today()).unwrap();
        assert_eq!(dash.available_balance, 1062.5);
        let totals: Vec<(&str, f64)> = dash
            .monthly_breakdown
            .iter()
            .map(|m| (m.ym.as_str(), m.total))
            .collect();
        assert_eq!(
            totals,
            [("2026-07", 0.0), ("2026-08", 0.0), ("2026-09", 42.5), ("2026-10", 20.0)]
        );
    }

    #[test]
    fn gig_rewards_newest_first() {
        let state = state();
        let conn = state.db.get().unwrap();
        conn.execute_batch(
            "INSERT INTO gig_rewards (user_id, gig_name, status, reward, date) VALUES
                 (5, 'Old', 'completed', 10, '2026-05-01'),
                 (5, 'New', 'completed', 20, '2026-10-01'),
                 (6, 'Other', 'completed', 30, '2026-10-02');",
        )
        .unwrap();

        let dash = load_influencer_dashboard(&conn, 5, today()).unwrap();
        let names: Vec<&str> = dash.gig_rewards.iter().map(|g| g.gig_name.as_str()).collect();
        assert_eq!(names, ["New", "Old"]);
    }

    #[test]
    fn partner_without_scans_gets_demo_chart() {
        let state = state();
        let conn = state.db.get().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let dash = load_partner_dashboard(&conn, 1, today(), &mut rng).unwrap();

        assert!(dash.is_demo_data);
        assert_eq!(dash.chart_data, analytics::demo_chart(today()));
        assert_eq!(dash.top_influencers.len(), LEADERBOARD_SIZE);
        assert!(dash.top_influencers.iter().all(|r| r.id < 0));
    }

    #[test]
    fn partner_chart_covers_last_seven_days_ascending() {
        let state = state();
        let conn = state.db.get().unwrap();
        scan(&conn, 1, 5, 10, "2026-10-19 09:00:00");
        scan(&conn, 1, 5, 15, "2026-10-19 18:00:00");
        scan(&conn, 1, 5, 7, "2026-10-13 09:00:00");
        // outside the window or another partner
        scan(&conn, 1, 5, 99, "2026-10-12 23:59:59");
        scan(&conn, 2, 5, 99, "2026-10-18 09:00:00");

        let mut rng = StdRng::seed_from_u64(11);
        let dash = load_partner_dashboard(&conn, 1, today(), &mut rng).unwrap();
        assert!(!dash.is_demo_data);
        assert_eq!(
            dash.chart_data,
            vec![
                ChartPoint {
                    date: "2026-10-13".into(),
                    rev: 7,
                    scans: 1
                },
                ChartPoint {
                    date: "2026-10-19".into(),
                    rev: 25,
                    scans: 2
                },
            ]
        );
    }

    #[test]
    fn leaderboard_uses_recorded_totals() {
        let state = state();
        let partner = insert_user(&state, "p@b.com", &["merchant", "influencer"]);
        let star = insert_user(&state, "star@b.com", &["influencer"]);
        insert_user(&state, "quiet@b.com", &["influencer"]);
        {
            let conn = state.db.get().unwrap();
            bump_revenue(&conn, star, partner, 9000).unwrap();
        }

        let conn = state.db.get().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let dash = load_partner_dashboard(&conn, partner, today(), &mut rng).unwrap();

        let board = &dash.top_influencers;
        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board[0].id, star);
        assert_eq!(board[0].revenue, 9000.0);
        assert_eq!(board[0].sales, 1);
        assert!(!board[0].is_demo_data);
        // the partner never ranks against itself
        assert!(board.iter().all(|r| r.id != partner));
    }

    #[test]
    fn dashboards_require_an_identity() {
        let state = state();
        let err = influencer_dashboard(&state, &ctx(None, json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing or invalid user_id");
        let err = partner_dashboard(&state, &ctx(None, json!({ "user_id": 0 }))).unwrap_err();
        assert_eq!(err.to_string(), "Missing or invalid partner user_id");
    }

    #[test]
    fn influencer_dashboard_envelope_shape() {
        let state = state();
        let id = insert_user(&state, "i@b.com", &["influencer"]);
        let reply = influencer_dashboard(&state, &ctx(Some(id), json!({})))
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["data"]["available_balance"], 0.0);
        assert_eq!(
            reply["data"]["monthly_breakdown"].as_array().unwrap().len(),
            MONTH_WINDOW as usize
        );
        assert!(reply["data"]["gig_rewards"].as_array().unwrap().is_empty());
    }
}
