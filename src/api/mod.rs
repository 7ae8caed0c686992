// The single `?action=` endpoint and the router around it.

pub mod action;
pub mod context;
pub mod cors;
pub mod envelope;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, RawQuery, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use action::Action;
pub use context::ActionContext;
pub use envelope::Envelope;

use crate::error::AppError;
use crate::extractors::MaybeSession;
use crate::handlers;
use crate::state::AppState;

/// Largest JSON body any action accepts.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads_path();
    let body_limit = state.config.uploads.body_limit();

    Router::new()
        .route("/api", any(dispatch))
        .route("/api.php", any(dispatch))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors::cors_layer(&state.config.cors))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors::reject_foreign_preflight,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

async fn dispatch(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    RawQuery(raw_query): RawQuery,
    method: Method,
    request: Request,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let query = parse_query(raw_query.as_deref());
    let Some(action) = query.get("action").and_then(|a| a.parse::<Action>().ok()) else {
        return envelope::banner().into_response();
    };

    if method == Method::GET && action.is_mutating() {
        return AppError::MethodNotAllowed.into_response();
    }

    tracing::debug!(action = %action, user = ?session.as_ref().map(|s| s.user_id), "Dispatching");

    let headers = request.headers().clone();
    let result = match action {
        Action::UploadMedia => match Multipart::from_request(request, &state).await {
            Ok(multipart) => {
                handlers::uploads::upload_media(&state, session.as_ref(), &headers, multipart).await
            }
            Err(rejection) => {
                tracing::debug!("Upload without multipart body: {}", rejection);
                Err(AppError::invalid(
                    "No file uploaded (expected form field 'file')",
                ))
            }
        },
        _ => {
            let body = match axum::body::to_bytes(request.into_body(), JSON_BODY_LIMIT).await {
                Ok(bytes) => context::body_object(&bytes),
                Err(_) => return AppError::invalid("Request body too large").into_response(),
            };
            let ctx = ActionContext {
                session,
                query,
                body,
                headers,
            };
            handlers::handle(action, &state, &ctx)
        }
    };

    result.into_response()
}
