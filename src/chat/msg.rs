use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;

use crate::registry::Registry;
use crate::store::{self, Message, Store};
use crate::{ApiError, ApiResult, AppState, ChatChannel};

/// Inbound chat submission, shared by the REST route and the websocket
/// channel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessageQuery {
    #[serde(default)]
    pub(crate) emisor_id: String,
    #[serde(default)]
    pub(crate) contenido: String,
}

/// Validate, persist, fan out. The message goes to every chat subscriber
/// attached at this moment; nobody gets a back-fill later.
pub(crate) async fn send_message(
    store: &Store,
    chat: &Registry,
    emisor_id: &str,
    contenido: &str,
) -> ApiResult<Message> {
    if emisor_id.is_empty() || contenido.is_empty() {
        return Err(ApiError::Validation(
            "emisorId and contenido are required".to_owned(),
        ));
    }

    let mut data = store.read().await?;
    let Some(user) = data.user(emisor_id) else {
        return Err(ApiError::NotFound("user"));
    };
    let emisor_name = if user.nombre.is_empty() {
        emisor_id.to_owned()
    } else {
        user.nombre.clone()
    };

    let message = Message {
        id: store::fresh_id('m'),
        sala_id: "s1".to_owned(),
        emisor_id: emisor_id.to_owned(),
        emisor_name,
        contenido: contenido.to_owned(),
        timestamp: store::now_timestamp(),
    };
    data.mensajes.push(message.clone());
    store.write(&data).await?;

    chat.broadcast(&serde_json::to_string(&message)?);
    tracing::debug!(id = %message.id, emisor = emisor_id, subscribers = chat.count(), "message fanned out");

    Ok(message)
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message_route(
    State(store): State<Store>,
    State(chat): State<ChatChannel>,
    Json(SendMessageQuery { emisor_id, contenido }): Json<SendMessageQuery>,
) -> ApiResult<Response> {
    let message = send_message(&store, &chat, &emisor_id, &contenido).await?;

    Ok(Json(json!({
        "success": true,
        "message": "message sent",
        "data": message,
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::User;

    async fn store_with_ana() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("data.json"));
        let mut data = store.read().await.unwrap();
        data.usuarios.push(User {
            id: "u2".to_owned(),
            nombre: "Ana".to_owned(),
            email: "ana@x.com".to_owned(),
        });
        store.write(&data).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn submit_appends_one_message_and_delivers_to_every_subscriber() {
        let (_dir, store) = store_with_ana().await;
        let chat = Registry::new();
        let (_a, mut rx_a) = chat.join();
        let (_b, mut rx_b) = chat.join();
        let before = store.read().await.unwrap().mensajes.len();

        let message = send_message(&store, &chat, "u2", "hola").await.unwrap();

        assert_eq!(message.emisor_name, "Ana");
        assert_eq!(message.sala_id, "s1");
        let data = store.read().await.unwrap();
        assert_eq!(data.mensajes.len(), before + 1);

        let frame_a = rx_a.try_recv().unwrap();
        let frame_b = rx_b.try_recv().unwrap();
        let delivered: Message = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(delivered, message);
        assert_eq!(frame_a, frame_b);
        // exactly once per subscriber
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn submit_with_unknown_sender_leaves_the_store_unchanged() {
        let (_dir, store) = store_with_ana().await;
        let chat = Registry::new();
        let (_a, mut rx_a) = chat.join();

        let err = send_message(&store, &chat, "u9", "hola").await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound("user")));
        assert!(store.read().await.unwrap().mensajes.is_empty());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn submit_rejects_empty_fields() {
        let (_dir, store) = store_with_ana().await;
        let chat = Registry::new();

        let err = send_message(&store, &chat, "", "hola").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = send_message(&store, &chat, "u2", "").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn history_preserves_submission_order() {
        let (_dir, store) = store_with_ana().await;
        let chat = Registry::new();

        for text in ["uno", "dos", "tres"] {
            send_message(&store, &chat, "u2", text).await.unwrap();
        }

        let data = store.read().await.unwrap();
        let bodies: Vec<_> = data.mensajes.iter().map(|m| m.contenido.as_str()).collect();
        assert_eq!(bodies, ["uno", "dos", "tres"]);
    }
}
