use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    handlers::line::error_status,
    models::{
        line::LineSummary,
        portfolio::{LenderPosition, PortfolioResponse},
        token::{ErrorResponse, TokenInfo},
    },
    services::aggregator::UNKNOWN_SYMBOL,
    AppState,
};

/// Handler for GET /portfolio/{address}
///
/// Returns the lines a user borrows on and the positions they lend to.
pub async fn get_user_portfolio(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PortfolioResponse>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!("Fetching portfolio for {}", address);

    match state.subgraph.get_user_portfolio(&address).await {
        Ok(data) => {
            let borrower_lines: Vec<LineSummary> =
                data.borrower.into_iter().map(LineSummary::from).collect();

            let lender_positions: Vec<LenderPosition> = data
                .lender
                .into_iter()
                .map(|credit| LenderPosition {
                    id: credit.id,
                    line: credit.line.id,
                    deposit: credit.deposit,
                    principal: credit.principal,
                    interest: credit.interest,
                    token: credit
                        .token
                        .map(|t| TokenInfo {
                            symbol: t
                                .symbol
                                .filter(|s| !s.is_empty())
                                .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
                            decimals: t.decimals.unwrap_or(18),
                        })
                        .unwrap_or_else(|| TokenInfo {
                            symbol: UNKNOWN_SYMBOL.to_string(),
                            decimals: 18,
                        }),
                })
                .collect();

            tracing::debug!(
                "Portfolio for {}: {} borrowed lines, {} lender positions",
                address,
                borrower_lines.len(),
                lender_positions.len()
            );

            Ok(Json(PortfolioResponse {
                user: address,
                borrower_lines,
                lender_positions,
            }))
        }
        Err(e) => {
            tracing::error!("Failed to fetch portfolio for {}: {}", address, e);
            Err((
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to fetch portfolio: {}", e),
                }),
            ))
        }
    }
}
