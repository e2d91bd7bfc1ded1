use axum::{
    debug_handler,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;

use crate::{ApiError, ApiResult, AppState, Config};

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/list", get(list))
        .route("/download/{filename}", get(download))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
}

/// Store an uploaded blob under a timestamp-prefixed name so repeated
/// uploads of the same file never collide.
#[debug_handler(state = AppState)]
pub(crate) async fn upload(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut stored: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = sanitize(field.file_name().unwrap_or("archivo"));
        let content_type = field.content_type().unwrap_or_default().to_owned();

        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::Validation(format!("upload truncated: {err}")))?;
        validate_upload(&content_type, bytes.len())?;

        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let filename = format!("{millis}-{original}");
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::write(config.upload_dir.join(&filename), &bytes).await?;
        tracing::info!(%filename, bytes = bytes.len(), "file uploaded");
        stored = Some(filename);
        break;
    }

    let filename = stored.ok_or_else(|| ApiError::missing("file"))?;
    Ok(Json(json!({ "message": "file uploaded", "filename": filename })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(State(config): State<Config>) -> ApiResult<Response> {
    let mut files: Vec<String> = Vec::new();
    match tokio::fs::read_dir(&config.upload_dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await? {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
            files.sort();
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    Ok(Json(json!({ "files": files })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn download(
    State(config): State<Config>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if filename != sanitize(&filename) {
        return Err(ApiError::Validation("invalid file name".to_owned()));
    }

    let path = config.upload_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("file"));
        }
        Err(err) => return Err(err.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// The upload contract: one of the allowed document types, at most 5 MiB.
fn validate_upload(content_type: &str, size: usize) -> ApiResult<()> {
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(ApiError::Validation(format!(
            "file type \"{content_type}\" is not allowed"
        )));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation("file exceeds the 5MB limit".to_owned()));
    }
    Ok(())
}

/// Keep only the final path component and drop `..` tricks.
fn sanitize(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .replace("..", "");
    if base.is_empty() {
        "archivo".to_owned()
    } else {
        base
    }
}
