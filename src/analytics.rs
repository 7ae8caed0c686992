// Calendar bucketing and dashboard shaping. No database access here; the
// dashboard handlers feed rows in and serialize what comes out.

use std::collections::HashMap;

use chrono::{Datelike, Days, Months, NaiveDate};
use rand::Rng;
use serde::Serialize;

/// Months shown in the influencer earnings breakdown, current month included.
pub const MONTH_WINDOW: u32 = 4;

/// Days covered by the partner revenue chart, today included.
pub const CHART_DAYS: u64 = 7;

/// Rows in the partner leaderboard.
pub const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub ym: String,
    /// 1-based month number
    pub m: u32,
    /// English month name
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub rev: i64,
    pub scans: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopInfluencer {
    pub id: i64,
    pub name: String,
    pub revenue: f64,
    pub sales: i64,
    pub avatar: Option<String>,
    /// Set when the figures (or the whole row) are placeholders.
    pub is_demo_data: bool,
}

/// A leaderboard row as loaded from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardCandidate {
    pub id: i64,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Real `(revenue, sales)` with this partner, when any exist.
    pub totals: Option<(i64, i64)>,
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// First day of the month `months_back` months before `today`'s month.
pub fn first_of_month(today: NaiveDate, months_back: u32) -> NaiveDate {
    let start = today.with_day(1).unwrap_or(today);
    start
        .checked_sub_months(Months::new(months_back))
        .unwrap_or(start)
}

/// First days of the last `count` months, oldest first, ending at `today`'s month.
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .map(|back| first_of_month(today, back))
        .collect()
}

/// Sum `(YYYY-MM, amount)` rows from any number of sources into the trailing
/// window. Months without rows report 0.0; rows outside the window are dropped.
pub fn monthly_window<I>(today: NaiveDate, count: u32, rows: I) -> Vec<MonthlyTotal>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut merged: HashMap<String, f64> = HashMap::new();
    for (ym, amount) in rows {
        *merged.entry(ym).or_insert(0.0) += amount;
    }

    trailing_months(today, count)
        .into_iter()
        .map(|first| {
            let ym = month_key(first);
            let total = merged.get(&ym).copied().unwrap_or(0.0);
            MonthlyTotal {
                m: first.month(),
                month: first.format("%B").to_string(),
                total,
                ym,
            }
        })
        .collect()
}

/// Earliest day included in the partner chart.
pub fn chart_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(CHART_DAYS - 1))
        .unwrap_or(today)
}

/// Placeholder series shown to partners with no scans yet: the last five
/// days, oldest first.
pub fn demo_chart(today: NaiveDate) -> Vec<ChartPoint> {
    const SERIES: [(u64, i64, i64); 5] = [
        (4, 120, 15),
        (3, 180, 22),
        (2, 90, 10),
        (1, 200, 30),
        (0, 150, 18),
    ];

    SERIES
        .iter()
        .map(|&(days_back, rev, scans)| ChartPoint {
            date: today
                .checked_sub_days(Days::new(days_back))
                .unwrap_or(today)
                .format("%Y-%m-%d")
                .to_string(),
            rev,
            scans,
        })
        .collect()
}

const PLACEHOLDER_NAMES: [&str; 5] = [
    "Alexina Jordan",
    "Ben Carter",
    "Chloe Davis",
    "Daniel Evans",
    "Elara Vance",
];

const PLACEHOLDER_AVATARS: [&str; 5] = [
    "https://images.unsplash.com/photo-1494790108377-be9c29b29330?w=100&h=100&fit=crop&crop=face",
    "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=100&h=100&fit=crop&crop=face",
    "https://images.unsplash.com/photo-1438761681033-6461ffad8d80?w=100&h=100&fit=crop&crop=face",
    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=100&h=100&fit=crop&crop=face",
    "https://images.unsplash.com/photo-1534528741775-53994a69daeb?w=100&h=100&fit=crop&crop=face",
];

/// 50.00 ..= 2500.99
pub fn fabricated_revenue<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(50..=2500) as f64 + rng.gen_range(0..=99) as f64 / 100.0
}

/// 5 ..= 100
pub fn fabricated_sales<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.gen_range(5..=100)
}

/// Turn candidates into exactly [`LEADERBOARD_SIZE`] rows sorted by revenue,
/// highest first. Candidates without real totals get fabricated figures and
/// missing rows are filled with placeholder influencers (negative ids).
pub fn build_leaderboard<R: Rng + ?Sized>(
    candidates: Vec<LeaderboardCandidate>,
    rng: &mut R,
) -> Vec<TopInfluencer> {
    let mut rows: Vec<TopInfluencer> = candidates
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|c| {
            let name = c
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "New Influencer".to_string());
            match c.totals {
                Some((revenue, sales)) => TopInfluencer {
                    id: c.id,
                    name,
                    revenue: revenue as f64,
                    sales,
                    avatar: c.avatar,
                    is_demo_data: false,
                },
                None => TopInfluencer {
                    id: c.id,
                    name,
                    revenue: fabricated_revenue(rng),
                    sales: fabricated_sales(rng),
                    avatar: c.avatar,
                    is_demo_data: true,
                },
            }
        })
        .collect();

    while rows.len() < LEADERBOARD_SIZE {
        let i = rows.len();
        rows.push(TopInfluencer {
            id: -(i as i64 + 1),
            name: PLACEHOLDER_NAMES[i % PLACEHOLDER_NAMES.len()].to_string(),
            revenue: fabricated_revenue(rng),
            sales: fabricated_sales(rng),
            avatar: Some(PLACEHOLDER_AVATARS[i % PLACEHOLDER_AVATARS.len()].to_string()),
            is_demo_data: true,
        });
    }

    rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_has_four_months_ending_now() {
        let window = monthly_window(date(2026, 10, 19), MONTH_WINDOW, Vec::new());
        let keys: Vec<&str> = window.iter().map(|m| m.ym.as_str()).collect();
        assert_eq!(keys, ["2026-07", "2026-08", "2026-09", "2026-10"]);
        assert!(window.iter().all(|m| m.total == 0.0));
        assert_eq!(window[3].month, "October");
        assert_eq!(window[0].m, 7);
    }

    #[test]
    fn window_crosses_year_boundary() {
        let window = monthly_window(date(2026, 2, 28), MONTH_WINDOW, Vec::new());
        let keys: Vec<&str> = window.iter().map(|m| m.ym.as_str()).collect();
        assert_eq!(keys, ["2025-11", "2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn window_from_month_end_does_not_skip_months() {
        // 31st minus one month must land in the previous month, not two back
        let window = monthly_window(date(2026, 3, 31), MONTH_WINDOW, Vec::new());
        let keys: Vec<&str> = window.iter().map(|m| m.ym.as_str()).collect();
        assert_eq!(keys, ["2025-12", "2026-01", "2026-02", "2026-03"]);
    }

    #[test]
    fn window_merges_sources_by_month() {
        let rows = vec![
            ("2026-09".to_string(), 100.0),
            ("2026-09".to_string(), 25.5),
            ("2026-10".to_string(), 10.0),
            // outside the window
            ("2026-01".to_string(), 999.0),
        ];
        let window = monthly_window(date(2026, 10, 1), MONTH_WINDOW, rows);
        assert_eq!(window[0].total, 0.0);
        assert_eq!(window[1].total, 0.0);
        assert_eq!(window[2].total, 125.5);
        assert_eq!(window[3].total, 10.0);
    }

    #[test]
    fn demo_chart_spans_last_five_days_oldest_first() {
        let chart = demo_chart(date(2026, 3, 2));
        let dates: Vec<&str> = chart.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(
            dates,
            ["2026-02-26", "2026-02-27", "2026-02-28", "2026-03-01", "2026-03-02"]
        );
        let revs: Vec<i64> = chart.iter().map(|p| p.rev).collect();
        assert_eq!(revs, [120, 180, 90, 200, 150]);
        let scans: Vec<i64> = chart.iter().map(|p| p.scans).collect();
        assert_eq!(scans, [15, 22, 10, 30, 18]);
    }

    #[test]
    fn chart_start_is_six_days_back() {
        assert_eq!(chart_start(date(2026, 10, 19)), date(2026, 10, 13));
    }

    #[test]
    fn leaderboard_pads_to_five_sorted_desc() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![LeaderboardCandidate {
            id: 42,
            name: None,
            avatar: None,
            totals: Some((3000, 12)),
        }];
        let board = build_leaderboard(candidates, &mut rng);

        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert!(board.windows(2).all(|w| w[0].revenue >= w[1].revenue));

        // real totals beat the fabricated ceiling
        assert_eq!(board[0].id, 42);
        assert_eq!(board[0].name, "New Influencer");
        assert!(!board[0].is_demo_data);

        let placeholders: Vec<&TopInfluencer> = board.iter().filter(|r| r.id < 0).collect();
        assert_eq!(placeholders.len(), 4);
        assert!(placeholders.iter().all(|r| r.is_demo_data && r.avatar.is_some()));
    }

    #[test]
    fn fabricated_figures_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let revenue = fabricated_revenue(&mut rng);
            assert!((50.0..=2500.99).contains(&revenue));
            let sales = fabricated_sales(&mut rng);
            assert!((5..=100).contains(&sales));
        }
    }

    #[test]
    fn leaderboard_flags_candidates_without_totals() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = build_leaderboard(
            vec![LeaderboardCandidate {
                id: 9,
                name: Some("Mia".into()),
                avatar: Some("a.png".into()),
                totals: None,
            }],
            &mut rng,
        );
        let mia = board.iter().find(|r| r.id == 9).unwrap();
        assert!(mia.is_demo_data);
        assert_eq!(mia.name, "Mia");
    }
}
