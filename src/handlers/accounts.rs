use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::api::context::{lenient_id, OneOrMany};
use crate::api::{ActionContext, Envelope};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session;
use crate::db::models::{Role, User, UserWithRoles};
use crate::error::{AppError, AppResult};
use crate::handlers::is_unique_violation;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    username: Option<String>,
    name: Option<String>,
    business_name: Option<String>,
    profile_pic: Option<String>,
    cover_url: Option<String>,
    partner_profile_pic: Option<String>,
    partner_cover_url: Option<String>,
    role: Option<OneOrMany<String>>,
}

#[derive(Deserialize)]
struct AddRoleRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    user_id: Option<i64>,
    role: Option<String>,
    business_name: Option<String>,
}

// -- Queries --

/// Every role a user holds, in grant order.
pub(crate) fn load_roles(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Role>> {
    let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY rowid")?;
    let roles = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<Role>, _>>()?;
    Ok(roles)
}

fn parse_roles(raw: Option<OneOrMany<String>>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();
    for label in raw.map(OneOrMany::into_vec).unwrap_or_default() {
        if label.is_empty() {
            continue;
        }
        let role: Role = label.parse().map_err(|e| AppError::invalid(format!("{}", e)))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

// -- Handlers --

/// `login`: verify credentials and open a session.
pub fn login(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let req: LoginRequest = ctx.parse_body()?;
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::invalid("Missing credentials"));
    }

    let conn = state.db.get()?;
    let found = conn
        .query_row(
            &format!(
                "SELECT {}, password_hash FROM users WHERE email = ?1",
                User::COLUMNS
            ),
            params![email],
            |row| Ok((User::from_row(row)?, row.get::<_, String>(10)?)),
        )
        .optional()?;

    let Some((user, _)) = found.filter(|(_, hash)| verify_password(&req.password, hash)) else {
        tracing::info!("Rejected login attempt");
        return Err(AppError::invalid("Invalid credentials"));
    };

    let roles = load_roles(&conn, user.id)?;
    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Envelope::success()
        .field("user", UserWithRoles { user, roles })?
        .with_cookie(session::session_cookie(&state.config.auth, &token)))
}

/// `register`: create the account and its roles, then log it in.
pub fn register(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let req: RegisterRequest = ctx.parse_body()?;
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::invalid("Email and password are required"));
    }
    let roles = parse_roles(req.role)?;

    let mut conn = state.db.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::invalid("Email already exists"));
    }

    let hash = hash_password(&req.password)?;
    let username = req.username.or(req.name).unwrap_or_default();
    let legacy_role = roles.first().copied().unwrap_or(Role::Influencer);

    let tx = conn.transaction()?;
    let inserted = tx.execute(
        "INSERT INTO users (email, password_hash, username, business_name, profile_pic, cover_url, \
         partner_profile_pic, partner_cover_url, role) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            email,
            hash,
            username,
            req.business_name,
            req.profile_pic,
            req.cover_url,
            req.partner_profile_pic,
            req.partner_cover_url,
            legacy_role,
        ],
    );
    match inserted {
        Ok(_) => {}
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::invalid("Email already exists"));
        }
        Err(e) => return Err(e.into()),
    }
    let user_id = tx.last_insert_rowid();

    for role in &roles {
        tx.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
            params![user_id, role],
        )?;
    }
    tx.commit()?;

    let token = session::create_session(&conn, user_id, state.config.auth.session_hours)?;
    tracing::info!(user_id, ?roles, "Registered user");

    Ok(Envelope::success()
        .field("user_id", user_id)?
        .field("roles", &roles)?
        .with_cookie(session::session_cookie(&state.config.auth, &token)))
}

/// `add_role`: grant a role (idempotent). Granting `merchant` with a business
/// name also stores that name.
pub fn add_role(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    let req: AddRoleRequest = ctx.parse_body()?;
    let user_id = req
        .user_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid("Missing or invalid user_id"))?;
    let role: Role = req
        .role
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::invalid("Missing role"))?
        .parse()
        .map_err(|e| AppError::invalid(format!("{}", e)))?;
    let user_id = ctx.authorize(state, user_id)?;

    let conn = state.db.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
        params![user_id, role],
    )?;

    if let (Role::Merchant, Some(name)) = (role, req.business_name.as_deref()) {
        if !name.is_empty() {
            conn.execute(
                "UPDATE users SET business_name = ?1 WHERE id = ?2",
                params![name, user_id],
            )?;
        }
    }

    Ok(Envelope::success().message("Role added"))
}

/// `logout`: drop the server session and clear the cookie.
pub fn logout(state: &AppState, ctx: &ActionContext) -> AppResult<Envelope> {
    if let Some(s) = &ctx.session {
        let conn = state.db.get()?;
        session::delete_session(&conn, &s.token)?;
    }
    Ok(Envelope::success()
        .message("Logged out")
        .with_cookie(session::clear_session_cookie(&state.config.auth)))
}
