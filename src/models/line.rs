use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::subgraph::RawLineSummary;
use crate::models::token::TokenInfo;

/// Contract state of a line, as indexed by the subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Proposed,
    Active,
    Liquidatable,
    Repaid,
    Insolvent,
}

/// Which collateral module an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollateralModuleType {
    Spigot,
    Escrow,
}

/// Uniform shape for any on-chain event shown on a line page.
///
/// `module` is set for collateral events and absent for credit events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub module: Option<CollateralModuleType>,
    pub timestamp: i64,
    pub symbol: String,
    pub amount: Decimal,
    pub value: Decimal,
}

/// One lender's position within a line. Numeric fields are raw token base
/// units as reported by the subgraph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPosition {
    pub id: String,
    pub lender: String,
    pub deposit: Decimal,
    pub drawn_rate: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub interest_repaid: Decimal,
    pub token: TokenInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpigotSummary {
    pub contract: String,
    pub active: bool,
    pub token: TokenInfo,
    pub revenue_value: Decimal,
}

/// Revenue-collateral roll-up: per-symbol USD revenue totals plus one
/// summary per attached spigot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpigotModule {
    pub token_revenue: HashMap<String, Decimal>,
    pub spigots: HashMap<String, SpigotSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSummary {
    pub amount: Decimal,
    pub enabled: bool,
    pub token: TokenInfo,
    pub value: Decimal,
}

/// Deposit-collateral roll-up, keyed by deposit id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowModule {
    pub deposits: HashMap<String, DepositSummary>,
}

/// The aggregate view model for one credit line, built fresh per fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLinePage {
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub status: LineStatus,
    pub borrower: String,
    pub principal: Decimal,
    pub interest: Decimal,
    pub credits: HashMap<String, CreditPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spigot: Option<SpigotModule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow: Option<EscrowModule>,
    pub collateral_events: Vec<NormalizedEvent>,
    pub credit_events: Vec<NormalizedEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSummary {
    pub id: String,
    pub borrower: String,
    pub status: LineStatus,
    pub start: i64,
    pub end: i64,
}

impl From<RawLineSummary> for LineSummary {
    fn from(raw: RawLineSummary) -> Self {
        Self {
            id: raw.id,
            borrower: raw.borrower,
            status: raw.status,
            start: raw.start,
            end: raw.end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinesResponse {
    pub lines: Vec<LineSummary>,
}
