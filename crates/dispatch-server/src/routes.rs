use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dispatch_core::json::decode_case_insensitive;
use dispatch_core::pipeline::Pipeline;
use dispatch_core::{Disposition, TicketRequest};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/dispatch", post(dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Response bodies ───────────────────────────────────────────────────────

fn disposition_body(disposition: &Disposition) -> Value {
    let run = match disposition {
        Disposition::EarlyExit(reason) => return json!({ "message": reason.message() }),
        Disposition::Completed(run) => run,
    };
    let mut body = json!({
        "message": disposition.message(),
        "newBoardName": run.board_name,
        "newBoardId": run.board_id,
        "newTypeName": run.type_name,
        "newTypeId": run.type_id,
        "newSummary": run.summary,
    });
    if run.proposed_note_sent {
        body["proposedNoteSent"] = json!(true);
    }
    body
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Field names in the ticket body match case-insensitively.
pub(crate) async fn dispatch(State(state): State<Arc<AppState>>, body: String) -> (StatusCode, Json<Value>) {
    let ticket: TicketRequest = match decode_case_insensitive(&body) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "rejected dispatch request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid request body" })),
            );
        },
    };

    match state.pipeline.run(ticket).await {
        Ok(disposition) => (StatusCode::OK, Json(disposition_body(&disposition))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": format!("Error: {e:#}") })),
        ),
    }
}
