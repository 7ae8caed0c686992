use axum::http::{header, HeaderMap};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::AuthConfig;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// The user id behind a live (unexpired) session token.
pub fn lookup_session(conn: &Connection, token: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > datetime('now')",
        params![token],
        |row| row.get(0),
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

// -- Cookie helpers --

pub fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age_secs = auth.session_hours * 3600;
    format!(
        "{}={}; HttpOnly; {}; Path=/; Max-Age={}",
        auth.cookie_name,
        token,
        same_site(auth),
        max_age_secs
    )
}

pub fn clear_session_cookie(auth: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; {}; Path=/; Max-Age=0",
        auth.cookie_name,
        same_site(auth)
    )
}

fn same_site(auth: &AuthConfig) -> &'static str {
    // The dashboard runs on another origin in production, which needs None.
    if auth.secure_cookie {
        "SameSite=None; Secure"
    } else {
        "SameSite=Lax"
    }
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn conn_with_schema() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for (_, sql) in crate::db::MIGRATIONS {
            conn.execute_batch(sql).unwrap();
        }
        conn.execute(
            "INSERT INTO users (id, email, password_hash) VALUES (1, 'a@b.com', 'x')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn session_round_trips_until_deleted() {
        let conn = conn_with_schema();
        let token = create_session(&conn, 1, 1).unwrap();
        assert_eq!(lookup_session(&conn, &token).unwrap(), Some(1));

        delete_session(&conn, &token).unwrap();
        assert_eq!(lookup_session(&conn, &token).unwrap(), None);
    }

    #[test]
    fn expired_session_is_ignored() {
        let conn = conn_with_schema();
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at) VALUES ('s', 1, 'old', datetime('now', '-1 hours'))",
            [],
        )
        .unwrap();
        assert_eq!(lookup_session(&conn, "old").unwrap(), None);
    }

    #[test]
    fn cookie_value_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; vibecheck_session=abc123; x=1"),
        );
        assert_eq!(
            get_cookie_value(&headers, "vibecheck_session"),
            Some("abc123")
        );
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn secure_cookie_uses_samesite_none() {
        let mut auth = AuthConfig::default();
        assert!(session_cookie(&auth, "t").contains("SameSite=Lax"));
        auth.secure_cookie = true;
        let cookie = session_cookie(&auth, "t");
        assert!(cookie.starts_with("vibecheck_session=t;"));
        assert!(cookie.contains("SameSite=None; Secure"));
        assert!(clear_session_cookie(&auth).contains("Max-Age=0"));
    }
}
