use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use signaldesk_common::SignalStrength;
use signaldesk_select::{SelectionError, SelectionRequest};

use crate::AppState;

/// Query string accepted by the GET form. Mirrors `SelectionRequest` minus
/// the organization, which comes from the path.
#[derive(Deserialize, Default)]
pub struct SelectionQuery {
    hours_back: Option<i64>,
    today: Option<bool>,
    min_strength: Option<SignalStrength>,
    max_per_target: Option<usize>,
    connections: Option<bool>,
    skip_scoring: Option<bool>,
    timeout_secs: Option<u64>,
}

impl SelectionQuery {
    fn into_request(self, organization_id: Uuid) -> SelectionRequest {
        SelectionRequest {
            hours_back: self.hours_back,
            use_today_boundary: self.today.unwrap_or(false),
            min_signal_strength: self.min_strength,
            max_articles_per_target: self.max_per_target,
            include_connections: self.connections.unwrap_or(true),
            skip_scoring: self.skip_scoring.unwrap_or(false),
            timeout_secs: self.timeout_secs,
            ..SelectionRequest::for_organization(organization_id)
        }
    }
}

fn error_response(err: &SelectionError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn run_selection(state: &AppState, request: SelectionRequest) -> Response {
    match state.selector.select(&request).await {
        Ok(result) => {
            info!(
                organization_id = %result.organization_id,
                articles = result.articles.len(),
                duration_ms = result.selection_duration_ms,
                "Selection served"
            );
            Json(result).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Selection rejected");
            error_response(&e)
        }
    }
}

pub async fn api_select(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectionRequest>,
) -> impl IntoResponse {
    run_selection(&state, body).await
}

pub async fn api_organization_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SelectionQuery>,
) -> impl IntoResponse {
    let organization_id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid organization id"})),
            )
                .into_response();
        }
    };
    run_selection(&state, params.into_request(organization_id)).await
}
