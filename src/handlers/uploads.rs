// `upload_media`: store one multipart file under the uploads directory and
// hand back a public URL for it.

use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::{header, HeaderMap, StatusCode};
use chrono::Utc;

use crate::api::Envelope;
use crate::config::{Config, UploadConfig};
use crate::error::{AppError, AppResult};
use crate::extractors::Session;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const MIB: u64 = 1024 * 1024;

fn no_file() -> AppError {
    AppError::invalid("No file uploaded (expected form field 'file')")
}

fn too_large(max: u64) -> AppError {
    AppError::invalid(format!("File too large (max {}MB)", max / MIB))
}

fn mib_label(bytes: u64) -> String {
    match bytes {
        0 => "unlimited".to_string(),
        n => format!("{}M", n / MIB),
    }
}

/// Refuse to accept uploads at all when the server-side ceilings cannot fit
/// a file of the advertised maximum size.
pub fn check_server_limits(uploads: &UploadConfig) -> AppResult<()> {
    let ceiling = uploads.effective_server_limit();
    if ceiling > 0 && ceiling < uploads.max_file_bytes {
        return Err(AppError::invalid(format!(
            "Server upload limits too low: server_upload_max={}, server_body_max={}. \
             Increase them to at least {}.",
            mib_label(uploads.server_upload_max),
            mib_label(uploads.server_body_max),
            mib_label(uploads.max_file_bytes),
        )));
    }
    Ok(())
}

/// Replace everything outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<stem>_<unix seconds>_<suffix>.<ext>` from a client-supplied name.
pub fn stored_name(original: &str, unix_secs: i64, suffix: &str) -> String {
    // clients may send full paths; only the last component counts
    let base = original.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty());

    let mut name = format!("{}_{}_{}", sanitize_stem(stem), unix_secs, suffix);
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

/// Public URL of a stored file: the configured base when set, otherwise
/// rebuilt from the request's forwarded scheme and host.
pub fn public_url(config: &Config, headers: &HeaderMap, filename: &str) -> String {
    if let Some(base) = config.uploads.public_base_url.as_deref() {
        return format!("{}/uploads/{}", base.trim_end_matches('/'), filename);
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_host(config));

    format!("{}://{}/uploads/{}", scheme, host, filename)
}

/// `host:port` from the bind address. A wildcard bind is not reachable as a
/// URL, so it reads as `localhost`.
fn fallback_host(config: &Config) -> String {
    let host = match config.server.host.as_str() {
        "" | "0.0.0.0" | "::" | "[::]" => "localhost",
        other => other,
    };
    format!("{}:{}", host, config.server.port)
}

fn multipart_error(err: MultipartError, max: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max)
    } else {
        AppError::invalid(format!("Upload error: {}", err.body_text()))
    }
}

pub async fn upload_media(
    state: &AppState,
    session: Option<&Session>,
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Envelope> {
    if session.is_none() && !state.config.auth.trust_client_ids {
        return Err(AppError::Unauthorized);
    }
    let uploads = &state.config.uploads;
    check_server_limits(uploads)?;
    let max = uploads.max_file_bytes;

    let mut field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max))?
        {
            Some(f) if f.name() == Some(FILE_FIELD) => break f,
            Some(_) => continue,
            None => return Err(no_file()),
        }
    };
    let original = field.file_name().unwrap_or("upload").to_string();

    // buffer the whole file first so an oversized upload never touches disk
    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max))? {
        if (data.len() + chunk.len()) as u64 > max {
            tracing::info!(file = %original, limit = max, "Rejected oversized upload");
            return Err(too_large(max));
        }
        data.extend_from_slice(&chunk);
    }

    let suffix = hex::encode(rand::random::<[u8; 6]>());
    let filename = stored_name(&original, Utc::now().timestamp(), &suffix);
    let dir = state.config.uploads_path();
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&filename), &data).await?;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    tracing::info!(file = %filename, bytes = data.len(), %mime, "Stored upload");

    Envelope::success()
        .field("url", public_url(&state.config, headers, &filename))?
        .field("mime", mime.essence_str())
}
