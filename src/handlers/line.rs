use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    errors::BackendError,
    models::{
        line::{CreditLinePage, LineSummary, LinesResponse},
        token::ErrorResponse,
    },
    services::aggregator,
    AppState,
};

pub(crate) fn error_status(err: &BackendError) -> StatusCode {
    match err {
        // Payload violated the contract after the bytes arrived.
        BackendError::MalformedData(_) => StatusCode::INTERNAL_SERVER_ERROR,
        // Upstream collaborator (subgraph or price API) failed.
        BackendError::Transport(_) | BackendError::Subgraph(_) | BackendError::Price { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesQuery {
    pub first: Option<u32>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

/// Handler for GET /lines
pub async fn get_lines(
    State(state): State<AppState>,
    Query(query): Query<LinesQuery>,
) -> Result<Json<LinesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let first = query.first.unwrap_or(25).min(100);
    let order_by = query.order_by.as_deref().unwrap_or("start");
    let order_direction = query.order_direction.as_deref().unwrap_or("desc");

    match state.subgraph.get_lines(first, order_by, order_direction).await {
        Ok(lines) => {
            tracing::info!("Fetched {} lines from subgraph", lines.len());
            let lines: Vec<LineSummary> = lines.into_iter().map(LineSummary::from).collect();
            Ok(Json(LinesResponse { lines }))
        }
        Err(e) => {
            tracing::error!("Failed to fetch lines: {}", e);
            Err((
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to fetch lines: {}", e),
                }),
            ))
        }
    }
}

/// Handler for GET /lines/{id}/page
///
/// Fetches one line's full payload from the subgraph and aggregates it into
/// the page view model. Each request builds its page from scratch.
pub async fn get_line_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CreditLinePage>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!("Building line page for {}", id);

    let raw = match state.subgraph.get_line_page(&id).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("No line found at {}", id),
                }),
            ));
        }
        Err(e) => {
            tracing::error!("Failed to fetch line page for {}: {}", id, e);
            return Err((
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to fetch line page: {}", e),
                }),
            ));
        }
    };

    match aggregator::aggregate_line_page(raw, state.prices.as_ref()).await {
        Ok(page) => {
            tracing::debug!(
                "Line page for {} ready: {} positions, {} credit events",
                id,
                page.credits.len(),
                page.credit_events.len()
            );
            Ok(Json(page))
        }
        Err(e) => {
            tracing::error!("Failed to aggregate line page for {}: {}", id, e);
            Err((
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to aggregate line page: {}", e),
                }),
            ))
        }
    }
}
