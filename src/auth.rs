use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiError, ApiResult, AppState, Store};

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    gmail: Option<String>,
}

/// Login is an email lookup, nothing more: the address is an identifier,
/// not a credential.
#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(store): State<Store>,
    Json(LoginQuery { gmail }): Json<LoginQuery>,
) -> ApiResult<Response> {
    let gmail = gmail
        .filter(|g| !g.is_empty())
        .ok_or_else(|| ApiError::missing("gmail"))?;

    let data = store.read().await?;
    let user = data
        .user_by_email(&gmail)
        .ok_or(ApiError::NotFound("user"))?;

    tracing::info!(user = %user.id, "login");
    Ok(Json(json!({
        "success": true,
        "user": { "id": user.id, "nombre": user.nombre, "email": user.email },
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, User};
    use axum::http::StatusCode;

    async fn seeded_store() -> (tempfile::TempDir, Store) {
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
    async fn login_returns_the_matching_user() {
        let (_dir, store) = seeded_store().await;

        let response = login(
            State(store),
            Json(LoginQuery { gmail: Some("ana@x.com".to_owned()) }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_matches_email_case_insensitively() {
        let (_dir, store) = seeded_store().await;

        let response = login(
            State(store),
            Json(LoginQuery { gmail: Some("ANA@X.COM".to_owned()) }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_rejects_a_missing_email() {
        let (_dir, store) = seeded_store().await;

        let err = login(State(store), Json(LoginQuery { gmail: None }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_reports_unknown_users() {
        let (_dir, store) = seeded_store().await;

        let err = login(
            State(store),
            Json(LoginQuery { gmail: Some("luis@x.com".to_owned()) }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("user")));
    }
}
