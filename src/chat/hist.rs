use axum::{debug_handler, extract::{Query, State}, http::header, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time, UtcOffset};

use crate::store::{Message, Store};
use crate::{ApiResult, AppState};

const MONTHS: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];

#[derive(Debug, Deserialize)]
pub(crate) struct HistQuery {
    format: Option<String>,
}

/// Full history, no pagination. `format=txt` renders the grouped
/// transcript, `format=json` the raw collection with download headers,
/// anything else the plain JSON body.
#[debug_handler(state = AppState)]
pub(crate) async fn view_hist(
    State(store): State<Store>,
    Query(HistQuery { format }): Query<HistQuery>,
) -> ApiResult<Response> {
    let data = store.read().await?;

    match format.as_deref() {
        Some("txt") => Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"chat_history.txt\"".to_owned(),
                ),
            ],
            transcript(&data.mensajes),
        )
            .into_response()),
        Some("json") => Ok((
            [
                (header::CONTENT_TYPE, "application/json".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"chat_history.json\"".to_owned(),
                ),
            ],
            serde_json::to_string_pretty(&json!({ "messages": data.mensajes }))?,
        )
            .into_response()),
        _ => Ok(Json(json!({ "success": true, "messages": data.mensajes })).into_response()),
    }
}

/// Persist-again no-op; some clients still call it after fetching history.
#[debug_handler(state = AppState)]
pub(crate) async fn save_hist(State(store): State<Store>) -> ApiResult<Response> {
    let data = store.read().await?;
    store.write(&data).await?;
    Ok(Json(json!({ "success": true, "message": "history saved" })).into_response())
}

/// Plain-text transcript grouped by UTC calendar day, in insertion order.
/// Timestamps carrying another offset are normalized first; messages whose
/// timestamp fails to parse are skipped.
fn transcript(messages: &[Message]) -> String {
    let mut days: Vec<(Date, Vec<(Time, &Message)>)> = Vec::new();
    for msg in messages {
        let Ok(ts) = OffsetDateTime::parse(&msg.timestamp, &Rfc3339) else {
            continue;
        };
        let ts = ts.to_offset(UtcOffset::UTC);
        let entry = (ts.time(), msg);
        match days.iter_mut().find(|(day, _)| *day == ts.date()) {
            Some((_, batch)) => batch.push(entry),
            None => days.push((ts.date(), vec![entry])),
        }
    }

    let mut out = String::new();
    for (day, batch) in days {
        out.push_str(&format!(
            "--- {} de {} de {} ---\n",
            day.day(),
            MONTHS[day.month() as usize - 1],
            day.year(),
        ));
        for (at, msg) in batch {
            out.push_str(&format!(
                "{} ({:02}:{:02}:{:02}): {}\n",
                msg.emisor_name,
                at.hour(),
                at.minute(),
                at.second(),
                msg.contenido,
            ));
        }
        out.push('\n');
    }
    out.trim_end().to_owned()
}
