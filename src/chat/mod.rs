mod hist;
mod msg;
pub mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send_message", post(msg::send_message_route))
        .route("/save_hist", post(hist::save_hist))
        .route("/view_hist", get(hist::view_hist))
}
