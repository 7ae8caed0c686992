// One function per action. Each borrows a pooled connection for the
// duration of the call and returns the envelope to send.

pub mod accounts;
pub mod campaigns;
pub mod dashboards;
pub mod profile;
pub mod scans;
pub mod seed;
pub mod uploads;

use crate::api::{Action, ActionContext, Envelope};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn handle(action: Action, state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    match action {
        Action::Login => accounts::login(state, ctx),
        Action::Logout => accounts::logout(state, ctx),
        Action::Register => accounts::register(state, ctx),
        Action::AddRole => accounts::add_role(state, ctx),
        Action::UpdateUser => profile::update_user(state, ctx),
        Action::GetCampaigns => campaigns::get_campaigns(state, ctx),
        Action::CreateCampaign => campaigns::create_campaign(state, ctx),
        Action::UpdateCampaign => campaigns::update_campaign(state, ctx),
        Action::DeleteCampaign => campaigns::delete_campaign(state, ctx),
        Action::ManualAddScan => scans::manual_add_scan(state, ctx),
        Action::GetPartnerDashboard => dashboards::partner_dashboard(state, ctx),
        Action::GetInfluencerDashboard => dashboards::influencer_dashboard(state, ctx),
        Action::SeedAnalytics => seed::seed_analytics(state, ctx),
        // multipart bodies are routed before JSON parsing
        Action::UploadMedia => Err(AppError::invalid(
            "No file uploaded (expected form field 'file')",
        )),
    }
}

/// True when a write failed on a UNIQUE / PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Shared fixtures for handler unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;
    use serde_json::Value;

    use crate::api::ActionContext;
    use crate::config::Config;
    use crate::extractors::Session;
    use crate::state::AppState;

    pub fn state() -> AppState {
        let manager = SqliteConnectionManager::memory();
        let db = Pool::builder().max_size(1).build(manager).unwrap();
        crate::db::run_migrations(&db).unwrap();
        AppState {
            db,
            config: Config::default(),
        }
    }

    /// A context carrying `body` and, when given, a session for `user_id`.
    pub fn ctx(user_id: Option<i64>, body: Value) -> ActionContext {
        ActionContext {
            session: user_id.map(|id| Session {
                user_id: id,
                token: format!("token-{}", id),
            }),
            body: body.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn insert_user(state: &AppState, email: &str, roles: &[&str]) -> i64 {
        let conn = state.db.get().unwrap();
        conn.execute(
            "INSERT INTO users (email, password_hash, username) VALUES (?1, '!', ?1)",
            [email],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        for role in roles {
            conn.execute(
                "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)",
                rusqlite::params![id, role],
            )
            .unwrap();
        }
        id
    }
}
