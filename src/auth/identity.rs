// Which account a request acts on, and whether the caller may act on it.
//
// Dashboard and seed actions accept the target user id from several places.
// They are consulted in a fixed order and the first one supplied wins:
//
// 1. the session principal
// 2. the `user_id` query parameter
// 3. the `user_id` body field
// 4. the `id` body field (not consulted by every action)
//
// A supplied value that is not a positive integer counts as missing.

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentitySources {
    pub session: Option<i64>,
    pub query: Option<i64>,
    pub body_user_id: Option<i64>,
    pub body_id: Option<i64>,
}

impl IdentitySources {
    /// Candidates in priority order.
    pub fn candidates(&self) -> [Option<i64>; 4] {
        [self.session, self.query, self.body_user_id, self.body_id]
    }

    /// The first supplied id, if it is usable.
    pub fn resolve(&self) -> Option<i64> {
        self.candidates()
            .into_iter()
            .flatten()
            .next()
            .filter(|id| *id > 0)
    }

    pub fn without_body_id(mut self) -> Self {
        self.body_id = None;
        self
    }
}

/// Gate an id the caller asked to act on against the session principal.
///
/// With `trust_client_ids` set the legacy behaviour applies and any id is
/// accepted; otherwise a session is required and must match.
pub fn authorize(requested: i64, principal: Option<i64>, trust_client_ids: bool) -> AppResult<i64> {
    match principal {
        Some(p) if p == requested => Ok(requested),
        _ if trust_client_ids => Ok(requested),
        Some(p) => {
            tracing::warn!(principal = p, requested, "Rejected cross-account request");
            Err(AppError::Forbidden)
        }
        None => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_wins_over_everything() {
        let sources = IdentitySources {
            session: Some(3),
            query: Some(4),
            body_user_id: Some(5),
            body_id: Some(6),
        };
        assert_eq!(sources.resolve(), Some(3));
    }

    #[test]
    fn falls_through_in_order() {
        let mut sources = IdentitySources {
            session: None,
            query: None,
            body_user_id: Some(5),
            body_id: Some(6),
        };
        assert_eq!(sources.resolve(), Some(5));
        sources.body_user_id = None;
        assert_eq!(sources.resolve(), Some(6));
        assert_eq!(sources.without_body_id().resolve(), None);
    }

    #[test]
    fn first_supplied_zero_means_missing() {
        let sources = IdentitySources {
            session: None,
            query: Some(0),
            body_user_id: Some(5),
            body_id: None,
        };
        assert_eq!(sources.resolve(), None);
    }

    #[test]
    fn nothing_supplied_is_missing() {
        assert_eq!(IdentitySources::default().resolve(), None);
    }

    #[test]
    fn authorize_requires_matching_session() {
        assert_eq!(authorize(7, Some(7), false).unwrap(), 7);
        assert!(matches!(
            authorize(7, Some(8), false),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            authorize(7, None, false),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn trusted_mode_accepts_any_id() {
        assert_eq!(authorize(7, None, true).unwrap(), 7);
        assert_eq!(authorize(7, Some(8), true).unwrap(), 7);
    }
}
