mod export;
pub mod ws;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::registry::{ConnId, Registry};
use crate::store::{self, Document, Store};
use crate::{ApiError, ApiResult, AppState, DocChannel};

use ws::DocFrame;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_doc))
        .route("/list", get(list_docs))
        .route("/get/{id}", get(get_doc))
        .route("/update/{id}", post(update_doc))
        .route("/save_doc", post(save_doc))
        .route("/download/{id}", get(download_doc))
}

/// Create a document and announce it to every connected editor so their
/// document lists stay current. Names are not deduplicated; two creates
/// with the same name yield two documents.
pub(crate) async fn create_document(
    store: &Store,
    docs: &Registry,
    nombre: &str,
) -> ApiResult<Document> {
    if nombre.is_empty() {
        return Err(ApiError::missing("nombre"));
    }

    let mut data = store.read().await?;
    let document = Document {
        id: store::fresh_id('d'),
        nombre: nombre.to_owned(),
        contenido: String::new(),
        editores: Vec::new(),
    };
    data.documentos.push(document.clone());
    store.write(&data).await?;

    docs.broadcast(&serde_json::to_string(&DocFrame::NewDoc {
        document: document.clone(),
    })?);
    tracing::info!(id = %document.id, nombre, "document created");

    Ok(document)
}

/// Overwrite a document's content, last writer wins. Empty content is a
/// valid update (clearing the document); a missing editor id is not. The
/// fan-out skips `origin` when the edit arrived over the document channel,
/// so the editing connection never sees its own echo.
pub(crate) async fn update_document(
    store: &Store,
    docs: &Registry,
    id: &str,
    contenido: &str,
    editor_id: &str,
    origin: Option<ConnId>,
) -> ApiResult<Document> {
    if editor_id.is_empty() {
        return Err(ApiError::missing("editorId"));
    }

    let mut data = store.read().await?;
    let Some(doc) = data.document_mut(id) else {
        return Err(ApiError::NotFound("document"));
    };
    doc.contenido = contenido.to_owned();
    if !doc.editores.iter().any(|e| e == editor_id) {
        doc.editores.push(editor_id.to_owned());
    }
    let document = doc.clone();
    store.write(&data).await?;

    let frame = serde_json::to_string(&DocFrame::Update {
        doc_id: id.to_owned(),
        contenido: contenido.to_owned(),
        editor_id: editor_id.to_owned(),
    })?;
    match origin {
        Some(conn) => docs.broadcast_except(conn, &frame),
        None => docs.broadcast(&frame),
    }
    tracing::debug!(id, editor = editor_id, bytes = contenido.len(), "document updated");

    Ok(document)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateQuery {
    #[serde(default)]
    nombre: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_doc(
    State(store): State<Store>,
    State(docs): State<DocChannel>,
    Json(CreateQuery { nombre }): Json<CreateQuery>,
) -> ApiResult<Response> {
    let document = create_document(&store, &docs, &nombre).await?;
    Ok(Json(json!({ "success": true, "document": document })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_docs(State(store): State<Store>) -> ApiResult<Response> {
    let data = store.read().await?;
    Ok(Json(json!({ "success": true, "documents": data.documentos })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_doc(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let data = store.read().await?;
    let document = data.document(&id).ok_or(ApiError::NotFound("document"))?;
    Ok(Json(json!({ "success": true, "document": document })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateQuery {
    contenido: Option<String>,
    editor_id: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_doc(
    State(store): State<Store>,
    State(docs): State<DocChannel>,
    Path(id): Path<String>,
    Json(UpdateQuery { contenido, editor_id }): Json<UpdateQuery>,
) -> ApiResult<Response> {
    // contenido must be present but may be empty; editorId must be non-empty
    let contenido = contenido.ok_or_else(|| ApiError::missing("contenido"))?;
    let editor_id = editor_id.unwrap_or_default();

    let document = update_document(&store, &docs, &id, &contenido, &editor_id, None).await?;
    Ok(Json(json!({
        "success": true,
        "message": "document updated",
        "document": document,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveQuery {
    doc_id: Option<String>,
}

/// Explicit persistence trigger from the client's autosave timer. Every
/// update already persists synchronously, so this only re-writes the store.
#[debug_handler(state = AppState)]
pub(crate) async fn save_doc(
    State(store): State<Store>,
    Json(SaveQuery { doc_id }): Json<SaveQuery>,
) -> ApiResult<Response> {
    let doc_id = doc_id
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::missing("docId"))?;

    let data = store.read().await?;
    if data.document(&doc_id).is_none() {
        return Err(ApiError::NotFound("document"));
    }
    store.write(&data).await?;
    Ok(Json(json!({ "success": true, "message": "document saved" })).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadQuery {
    format: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn download_doc(
    State(store): State<Store>,
    Path(id): Path<String>,
    Query(DownloadQuery { format }): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let data = store.read().await?;
    let document = data.document(&id).ok_or(ApiError::NotFound("document"))?;
    let stem = if document.nombre.is_empty() {
        "documento"
    } else {
        document.nombre.as_str()
    };

    match format.as_deref() {
        Some("txt") => Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{stem}.txt\""),
                ),
            ],
            document.contenido.clone(),
        )
            .into_response()),
        Some("pdf") => Ok((
            [
                (header::CONTENT_TYPE, "application/pdf".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{stem}.pdf\""),
                ),
            ],
            export::pdf(&document.contenido),
        )
            .into_response()),
        _ => Err(ApiError::UnsupportedFormat),
    }
}
