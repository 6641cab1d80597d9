use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{line::LineSummary, token::TokenInfo};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LenderPosition {
    pub id: String,
    pub line: String,
    pub deposit: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub token: TokenInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub user: String,
    pub borrower_lines: Vec<LineSummary>,
    pub lender_positions: Vec<LenderPosition>,
}
