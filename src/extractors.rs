use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::session::{get_cookie_value, lookup_session};
use crate::error::AppError;
use crate::state::AppState;

/// The session behind the request's cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
}

/// Optional session extractor. Never rejects an unauthenticated request;
/// each action decides what it needs.
#[derive(Debug, Clone, Default)]
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = get_cookie_value(&parts.headers, &state.config.auth.cookie_name) else {
            return Ok(MaybeSession(None));
        };

        let conn = state.db.get()?;
        let session = lookup_session(&conn, token)?.map(|user_id| Session {
            user_id,
            token: token.to_string(),
        });

        Ok(MaybeSession(session))
    }
}
