use axum::{debug_handler, extract::{State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};

use crate::{AppState, ChatChannel, Store};

use super::msg::{self, SendMessageQuery};

/// Chat channel endpoint. A connection is a passive listener that may also
/// submit `{emisorId, contenido}` frames; submissions run the same
/// validate-persist-fan-out path as the REST route, and failures go back to
/// this connection only.
#[debug_handler(state = AppState)]
pub async fn chat_ws(
    State(store): State<Store>,
    State(chat): State<ChatChannel>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| {
        let (conn, mut rx) = chat.join();
        tracing::info!(conn, subscribers = chat.count(), "chat client connected");

        let (mut sender, mut receiver) = socket.split();

        let forward = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if sender.send(frame.into()).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(frame)) = receiver.next().await {
            let Ok(SendMessageQuery { emisor_id, contenido }) =
                serde_json::from_slice(&frame.into_data())
            else {
                continue;
            };

            if let Err(err) = msg::send_message(&store, &chat, &emisor_id, &contenido).await {
                chat.send_to(conn, err.to_frame());
            }
        }

        chat.leave(conn);
        forward.abort();
        tracing::info!(conn, subscribers = chat.count(), "chat client disconnected");
    })
}
