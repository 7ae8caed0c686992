// `seed_analytics`: fills an account with believable history so the
// dashboards have something to draw. Re-running replaces the seeded window
// instead of stacking more rows on top.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::analytics::first_of_month;
use crate::api::{ActionContext, Envelope};
use crate::auth::password::unusable_hash;
use crate::error::AppResult;
use crate::handlers::accounts::load_roles;
use crate::handlers::scans::{insert_scan, rebuild_revenue_summary, NewScan};
use crate::state::AppState;

const SAMPLE_GIGS: [(&str, &str, i64); 6] = [
    ("Post a pic of our new menu item", "completed", 20),
    ("Interview our head chef", "completed", 50),
    ("Share our new menu story", "completed", 15),
    ("Host a giveaway with a friend", "completed", 30),
    ("Create a TikTok taste test", "completed", 25),
    ("Write a review and tag us", "completed", 10),
];

const SCAN_SOURCES: [&str; 3] = ["qr", "link", "direct"];

/// Months of earnings replaced, current month included.
const EARNING_MONTHS: u32 = 4;
/// Months of gig rewards replaced, current month included.
const GIG_MONTHS: u32 = 6;
/// Days of scans generated for partners, today included.
const SCAN_DAYS: i64 = 15;
const DEMO_INFLUENCERS: usize = 3;

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// What a seed run wrote.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SeedReport {
    pub earnings: usize,
    pub gig_rewards: usize,
    pub scans: usize,
    pub summary_rows: usize,
}

fn seed_earnings<R: Rng + ?Sized>(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
    rng: &mut R,
) -> rusqlite::Result<usize> {
    let cutoff = first_of_month(today, EARNING_MONTHS - 1).and_hms_opt(0, 0, 0);
    conn.execute(
        "DELETE FROM earnings WHERE user_id = ?1 AND created_at >= ?2",
        params![user_id, cutoff.map(|c| c.format(TIMESTAMP).to_string())],
    )?;

    let mut inserted = 0;
    for back in (0..EARNING_MONTHS).rev() {
        let month = first_of_month(today, back);
        let day = rng.gen_range(1..=28);
        let created_at = format!("{}-{:02} 12:00:00", month.format("%Y-%m"), day);
        let cents: i64 = rng.gen_range(200..=1200) * 100 + rng.gen_range(0..=99);
        let amount = cents as f64 / 100.0;
        inserted += conn.execute(
            "INSERT INTO earnings (user_id, amount, source_desc, created_at) \
             VALUES (?1, ?2, 'Seeded', ?3)",
            params![user_id, amount, created_at],
        )?;
    }
    Ok(inserted)
}

fn seed_gig_rewards(conn: &Connection, user_id: i64, today: NaiveDate) -> rusqlite::Result<usize> {
    let cutoff = first_of_month(today, GIG_MONTHS - 1);
    conn.execute(
        "DELETE FROM gig_rewards WHERE user_id = ?1 AND date >= ?2",
        params![user_id, cutoff.format("%Y-%m-%d").to_string()],
    )?;

    let mut inserted = 0;
    for back in (0..GIG_MONTHS).rev() {
        let (name, status, reward) = SAMPLE_GIGS[back as usize % SAMPLE_GIGS.len()];
        let date = first_of_month(today, back).format("%Y-%m-%d").to_string();
        inserted += conn.execute(
            "INSERT INTO gig_rewards (user_id, gig_name, status, reward, date) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, name, status, reward, date],
        )?;
    }
    Ok(inserted)
}

/// Find or create the demo influencers a partner's seeded scans point at.
fn demo_influencers(conn: &Connection, partner_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(DEMO_INFLUENCERS);
    for i in 1..=DEMO_INFLUENCERS {
        let email = format!("demo_influencer_{}_for_partner_{}@example.com", i, partner_id);
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    "INSERT INTO users (email, password_hash, username, role) \
                     VALUES (?1, ?2, ?3, 'influencer')",
                    params![email, unusable_hash(), format!("DemoInfluencer{}", i)],
                )?;
                conn.last_insert_rowid()
            }
        };
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, 'influencer')",
            params![id],
        )?;
        ids.push(id);
    }
    Ok(ids)
}

fn seed_partner_scans<R: Rng + ?Sized>(
    conn: &Connection,
    partner_id: i64,
    now: NaiveDateTime,
    rng: &mut R,
) -> rusqlite::Result<usize> {
    let cutoff = first_of_month(now.date(), 1).and_hms_opt(0, 0, 0);
    conn.execute(
        "DELETE FROM scans WHERE partner_id = ?1 AND created_at >= ?2",
        params![partner_id, cutoff.map(|c| c.format(TIMESTAMP).to_string())],
    )?;

    let influencers = demo_influencers(conn, partner_id)?;
    let mut inserted = 0;
    for back in (0..SCAN_DAYS).rev() {
        let created_at = (now - Duration::days(back)).format(TIMESTAMP).to_string();
        for _ in 0..rng.gen_range(1..=5) {
            let (Some(&influencer_id), Some(&source)) =
                (influencers.choose(rng), SCAN_SOURCES.choose(rng))
            else {
                continue;
            };
            insert_scan(
                conn,
                &NewScan {
                    partner_id,
                    influencer_id,
                    source: Some(source),
                    revenue: rng.gen_range(5..=120),
                    traffic: 0,
                    created_at: Some(created_at.clone()),
                },
            )?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// Replace the seeded window for `user_id` in one transaction.
pub fn seed_user<R: Rng + ?Sized>(
    conn: &mut Connection,
    user_id: i64,
    now: NaiveDateTime,
    rng: &mut R,
) -> rusqlite::Result<SeedReport> {
    let today = now.date();
    let mut tx = conn.transaction()?;
    let mut report = SeedReport {
        earnings: seed_earnings(&tx, user_id, today, rng)?,
        gig_rewards: seed_gig_rewards(&tx, user_id, today)?,
        ..Default::default()
    };

    let is_business = load_roles(&tx, user_id)?.iter().any(|r| r.is_business());
    if is_business {
        let sp = tx.savepoint()?;
        match seed_partner_scans(&sp, user_id, now, rng) {
            Ok(count) => {
                sp.commit()?;
                report.scans = count;
            }
            // dropping the savepoint rolls the partial scans back
            Err(e) => tracing::warn!(user_id, "Skipping scan seeding: {}", e),
        }
    }

    report.summary_rows = rebuild_revenue_summary(&tx)?;
    tx.commit()?;
    Ok(report)
}

pub fn seed_analytics(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let user_id = ctx.acting_user(
        state,
        ctx.identity().without_body_id(),
        "Missing or invalid user_id for seeding",
    )?;

    let mut conn = state.db.get()?;
    let report = seed_user(&mut conn, user_id, Utc::now().naive_utc(), &mut rand::thread_rng())?;
    tracing::info!(
        user_id,
        earnings = report.earnings,
        gigs = report.gig_rewards,
        scans = report.scans,
        "Seeded analytics"
    );

    Ok(Envelope::success().message(format!(
        "Earnings and revenue summary seeded for user {}",
        user_id
    )))
}
