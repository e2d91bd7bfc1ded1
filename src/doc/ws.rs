use axum::{debug_handler, extract::{State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::store::Document;
use crate::{AppState, DocChannel, Store};

/// Frames of the document sync channel, both directions. Clients send
/// `update` and `requestDoc`; the server sends `initDocs` on connect,
/// `update` fan-outs (originator excluded), point-to-point `initDoc`
/// snapshot replies, and `newDoc` creation broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum DocFrame {
    InitDocs { documents: Vec<Document> },
    Update { doc_id: String, contenido: String, editor_id: String },
    InitDoc { doc_id: String, contenido: String },
    RequestDoc { doc_id: String },
    NewDoc { document: Document },
}

/// Document channel endpoint. Each connection gets the full document list
/// immediately, then an update/snapshot loop until the transport closes.
#[debug_handler(state = AppState)]
pub async fn doc_ws(
    State(store): State<Store>,
    State(docs): State<DocChannel>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| {
        let (conn, mut rx) = docs.join();
        tracing::info!(conn, subscribers = docs.count(), "doc client connected");

        let (mut sender, mut receiver) = socket.split();

        // initial state sync before any relayed frames
        let init = store.read().await.and_then(|data| {
            Ok(serde_json::to_string(&DocFrame::InitDocs { documents: data.documentos })?)
        });
        match init {
            Ok(frame) => {
                if sender.send(frame.into()).await.is_err() {
                    docs.leave(conn);
                    return;
                }
            }
            Err(err) => {
                tracing::error!(conn, error = %err, "initial document list failed");
                docs.leave(conn);
                return;
            }
        }

        let forward = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if sender.send(frame.into()).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(ws_msg)) = receiver.next().await {
            let Ok(frame) = serde_json::from_slice::<DocFrame>(&ws_msg.into_data()) else {
                continue;
            };

            match frame {
                DocFrame::Update { doc_id, contenido, editor_id } => {
                    let result = super::update_document(
                        &store, &docs, &doc_id, &contenido, &editor_id, Some(conn),
                    )
                    .await;
                    if let Err(err) = result {
                        docs.send_to(conn, err.to_frame());
                    }
                }
                DocFrame::RequestDoc { doc_id } => match store.read().await {
                    Ok(data) => {
                        // snapshot reply goes to the requester only
                        if let Some(doc) = data.document(&doc_id) {
                            if let Ok(reply) = serde_json::to_string(&DocFrame::InitDoc {
                                doc_id: doc.id.clone(),
                                contenido: doc.contenido.clone(),
                            }) {
                                docs.send_to(conn, reply);
                            }
                        }
                    }
                    Err(err) => {
                        docs.send_to(conn, err.to_frame());
                    }
                },
                // server-to-client frames arriving inbound are ignored
                _ => {}
            }
        }

        docs.leave(conn);
        forward.abort();
        tracing::info!(conn, subscribers = docs.count(), "doc client disconnected");
    })
}
