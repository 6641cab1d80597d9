//! Raw response shapes for the lending-protocol subgraph.
//!
//! The Graph serializes BigInt/BigDecimal fields as JSON strings; `Decimal`'s
//! serde impl accepts both strings and numbers, so the shapes below stay
//! agnostic to how a given node renders them.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::line::LineStatus;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToken {
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CreditEventKind {
    #[serde(rename = "AddCreditEvent")]
    AddCredit,
    #[serde(rename = "IncreaseCreditEvent")]
    IncreaseCredit,
    #[serde(rename = "BorrowEvent")]
    Borrow,
    #[serde(rename = "InterestAccruedEvent")]
    InterestAccrued,
    #[serde(rename = "RepayInterestEvent")]
    RepayInterest,
    #[serde(rename = "RepayPrincipalEvent")]
    RepayPrincipal,
    #[serde(rename = "WithdrawEvent")]
    Withdraw,
    #[serde(other)]
    Other,
}

/// One event on a credit position. `value` is the USD value the indexer
/// recorded at event time; only repayment events reliably carry it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCreditEvent {
    #[serde(rename = "__typename")]
    pub kind: CreditEventKind,
    pub timestamp: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub value: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCredit {
    pub id: String,
    pub lender: String,
    pub deposit: Decimal,
    pub drawn_rate: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub interest_repaid: Decimal,
    pub token: Option<RawToken>,
    #[serde(default)]
    pub events: Vec<RawCreditEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCollateralEvent {
    pub timestamp: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpigot {
    pub id: String,
    pub contract: String,
    #[serde(default)]
    pub active: bool,
    pub token: Option<RawToken>,
    #[serde(default)]
    pub events: Vec<RawCollateralEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpigotModule {
    pub id: Option<String>,
    #[serde(default)]
    pub spigots: Vec<RawSpigot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDeposit {
    pub id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub enabled: bool,
    pub token: Option<RawToken>,
    #[serde(default)]
    pub events: Vec<RawCollateralEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEscrowModule {
    pub id: Option<String>,
    #[serde(default)]
    pub deposits: Vec<RawDeposit>,
}

/// Full page payload for one line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLinePage {
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub status: LineStatus,
    pub borrower: String,
    #[serde(default)]
    pub credits: Vec<RawCredit>,
    pub spigot: Option<RawSpigotModule>,
    pub escrow: Option<RawEscrowModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePageData {
    pub line_of_credit: Option<RawLinePage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineSummary {
    pub id: String,
    pub borrower: String,
    pub status: LineStatus,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesData {
    pub line_of_credits: Vec<RawLineSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLineRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLenderCredit {
    pub id: String,
    pub deposit: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub token: Option<RawToken>,
    pub line: RawLineRef,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioData {
    #[serde(default)]
    pub borrower: Vec<RawLineSummary>,
    #[serde(default)]
    pub lender: Vec<RawLenderCredit>,
}
