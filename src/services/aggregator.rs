//! Normalize and aggregate one line's raw subgraph payload into the page
//! view model.
//!
//! All accumulators live on [`AggregationContext`], so concurrent page
//! builds never share state. Event ordering in the output is merge order
//! (position- and module-iteration order), not timestamp order.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::errors::BackendError;
use crate::models::line::{
    CollateralModuleType, CreditLinePage, CreditPosition, DepositSummary, EscrowModule,
    NormalizedEvent, SpigotModule, SpigotSummary,
};
use crate::models::subgraph::{
    CreditEventKind, RawCollateralEvent, RawCreditEvent, RawLinePage, RawToken,
};
use crate::models::token::TokenInfo;
use crate::services::prices::PriceOracle;

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Accumulators for one aggregation pass: per-symbol spigot revenue plus the
/// running event timelines.
#[derive(Debug, Default)]
pub struct AggregationContext {
    pub token_revenue: HashMap<String, Decimal>,
    pub collateral_events: Vec<NormalizedEvent>,
    pub credit_events: Vec<NormalizedEvent>,
}

impl AggregationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one module's batch of collateral events, which share a
    /// token. Returns the batch's total USD value.
    ///
    /// Spigot batches accrue into the per-symbol revenue totals; escrow
    /// value is tracked per deposit and never counted as revenue.
    pub fn merge_collateral_events(
        &mut self,
        module: CollateralModuleType,
        symbol: &str,
        price: Option<Decimal>,
        events: &[RawCollateralEvent],
    ) -> Decimal {
        let symbol = if symbol.is_empty() { UNKNOWN_SYMBOL } else { symbol };
        let price = price.unwrap_or(Decimal::ZERO);
        let mut batch_total = Decimal::ZERO;

        for event in events {
            let value = price * event.amount;
            batch_total += value;

            self.collateral_events.push(NormalizedEvent {
                module: Some(module),
                timestamp: event.timestamp,
                symbol: symbol.to_string(),
                amount: event.amount,
                value,
            });
        }

        if module == CollateralModuleType::Spigot {
            *self
                .token_revenue
                .entry(symbol.to_string())
                .or_insert(Decimal::ZERO) += batch_total;
        }

        batch_total
    }

    /// Normalize one position's credit events.
    ///
    /// Interest repayments keep the USD value recorded at repayment time
    /// rather than being revalued at spot; everything else is `amount *
    /// price`.
    pub fn merge_credit_events(
        &mut self,
        symbol: &str,
        price: Decimal,
        events: &[RawCreditEvent],
    ) -> Result<(), BackendError> {
        let symbol = if symbol.is_empty() { UNKNOWN_SYMBOL } else { symbol };

        for event in events {
            let value = if event.kind == CreditEventKind::RepayInterest {
                event.value.ok_or_else(|| {
                    BackendError::MalformedData(format!(
                        "interest repayment at {} for {} carries no recorded value",
                        event.timestamp, symbol
                    ))
                })?
            } else {
                event.amount * price
            };

            self.credit_events.push(NormalizedEvent {
                module: None,
                timestamp: event.timestamp,
                symbol: symbol.to_string(),
                amount: event.amount,
                value,
            });
        }

        Ok(())
    }
}

fn token_symbol(token: Option<&RawToken>) -> String {
    token
        .and_then(|t| t.symbol.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string())
}

fn token_info(token: Option<&RawToken>) -> TokenInfo {
    TokenInfo {
        symbol: token_symbol(token),
        decimals: token.and_then(|t| t.decimals).unwrap_or(18),
    }
}

/// Whether a module sub-object should be rolled up.
///
/// Mirrors the emptiness check the page has always shipped with: a module is
/// aggregated only when the subgraph returns no id for it. A deployed module
/// always carries an id, so roll-ups are effectively disabled; kept as-is
/// until product signs off on flipping the check.
fn module_is_empty(id: Option<&str>) -> bool {
    id.is_none_or(|id| id.is_empty())
}

/// Fold one line's raw page payload into the display model.
///
/// Prices come from the injected oracle: spot for collateral valuation and
/// position roll-ups, recorded-at-event-time for interest repayments.
pub async fn aggregate_line_page(
    raw: RawLinePage,
    oracle: &dyn PriceOracle,
) -> Result<CreditLinePage, BackendError> {
    let mut ctx = AggregationContext::new();

    let mut credits = HashMap::new();
    let mut principal = Decimal::ZERO;
    let mut interest = Decimal::ZERO;

    for position in &raw.credits {
        let symbol = token_symbol(position.token.as_ref());
        let spot = oracle.get_price(&symbol, None).await?;

        ctx.merge_credit_events(&symbol, spot, &position.events)?;

        principal += position.principal * spot;
        interest += position.interest * spot;

        credits.insert(
            position.id.clone(),
            CreditPosition {
                id: position.id.clone(),
                lender: position.lender.clone(),
                deposit: position.deposit,
                drawn_rate: position.drawn_rate,
                principal: position.principal,
                interest: position.interest,
                interest_repaid: position.interest_repaid,
                token: token_info(position.token.as_ref()),
            },
        );
    }

    let spigot = match &raw.spigot {
        Some(module) if module_is_empty(module.id.as_deref()) => {
            let mut spigots = HashMap::new();

            for spigot in &module.spigots {
                let symbol = token_symbol(spigot.token.as_ref());
                let spot = oracle.get_price(&symbol, None).await?;

                let revenue_value = ctx.merge_collateral_events(
                    CollateralModuleType::Spigot,
                    &symbol,
                    Some(spot),
                    &spigot.events,
                );

                spigots.insert(
                    spigot.id.clone(),
                    SpigotSummary {
                        contract: spigot.contract.clone(),
                        active: spigot.active,
                        token: token_info(spigot.token.as_ref()),
                        revenue_value,
                    },
                );
            }

            Some(SpigotModule {
                token_revenue: ctx.token_revenue.clone(),
                spigots,
            })
        }
        _ => None,
    };

    let escrow = match &raw.escrow {
        Some(module) if module_is_empty(module.id.as_deref()) => {
            let mut deposits = HashMap::new();

            for deposit in &module.deposits {
                let symbol = token_symbol(deposit.token.as_ref());
                let spot = oracle.get_price(&symbol, None).await?;

                ctx.merge_collateral_events(
                    CollateralModuleType::Escrow,
                    &symbol,
                    Some(spot),
                    &deposit.events,
                );

                deposits.insert(
                    deposit.id.clone(),
                    DepositSummary {
                        amount: deposit.amount,
                        enabled: deposit.enabled,
                        token: token_info(deposit.token.as_ref()),
                        value: deposit.amount * spot,
                    },
                );
            }

            Some(EscrowModule { deposits })
        }
        _ => None,
    };

    tracing::debug!(
        "Aggregated line {}: {} positions, {} credit events, {} collateral events",
        raw.id,
        credits.len(),
        ctx.credit_events.len(),
        ctx.collateral_events.len()
    );

    Ok(CreditLinePage {
        id: raw.id,
        start: raw.start,
        end: raw.end,
        status: raw.status,
        borrower: raw.borrower,
        principal,
        interest,
        credits,
        spigot,
        escrow,
        collateral_events: ctx.collateral_events,
        credit_events: ctx.credit_events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::line::LineStatus;
    use crate::models::subgraph::{RawCredit, RawDeposit, RawEscrowModule, RawSpigot, RawSpigotModule};
    use crate::services::prices::StaticPriceOracle;
    use rust_decimal_macros::dec;

    fn collateral_event(timestamp: i64, amount: Decimal) -> RawCollateralEvent {
        RawCollateralEvent { timestamp, amount }
    }

    fn credit_event(kind: CreditEventKind, timestamp: i64, amount: Decimal) -> RawCreditEvent {
        RawCreditEvent {
            kind,
            timestamp,
            amount,
            value: None,
        }
    }

    fn dai_token() -> Option<RawToken> {
        Some(RawToken {
            symbol: Some("DAI".to_string()),
            decimals: Some(18),
        })
    }

    fn position(id: &str, events: Vec<RawCreditEvent>) -> RawCredit {
        RawCredit {
            id: id.to_string(),
            lender: "0xlender".to_string(),
            deposit: dec!(1000),
            drawn_rate: dec!(500),
            principal: dec!(0),
            interest: dec!(0),
            interest_repaid: dec!(0),
            token: dai_token(),
            events,
        }
    }

    fn line_page(
        credits: Vec<RawCredit>,
        spigot: Option<RawSpigotModule>,
        escrow: Option<RawEscrowModule>,
    ) -> RawLinePage {
        RawLinePage {
            id: "0x00000000000000000000000000000000000000aa".to_string(),
            start: 1_600_000_000,
            end: 1_700_000_000,
            status: LineStatus::Active,
            borrower: "0xborrower".to_string(),
            credits,
            spigot,
            escrow,
        }
    }

    #[test]
    fn spigot_batch_accrues_token_revenue() {
        let mut ctx = AggregationContext::new();

        let total = ctx.merge_collateral_events(
            CollateralModuleType::Spigot,
            "ETH",
            Some(dec!(2000)),
            &[
                collateral_event(100, dec!(1)),
                collateral_event(200, dec!(3)),
            ],
        );

        assert_eq!(total, dec!(8000));
        assert_eq!(ctx.token_revenue.get("ETH"), Some(&dec!(8000)));
        assert_eq!(ctx.collateral_events.len(), 2);
        assert_eq!(ctx.collateral_events[0].value, dec!(2000));
        assert_eq!(ctx.collateral_events[1].value, dec!(6000));
        assert_eq!(
            ctx.collateral_events[0].module,
            Some(CollateralModuleType::Spigot)
        );
    }

    #[test]
    fn escrow_batch_leaves_token_revenue_untouched() {
        let mut ctx = AggregationContext::new();

        let total = ctx.merge_collateral_events(
            CollateralModuleType::Escrow,
            "WBTC",
            Some(dec!(30000)),
            &[collateral_event(100, dec!(2))],
        );

        assert_eq!(total, dec!(60000));
        assert!(ctx.token_revenue.is_empty());
        assert_eq!(ctx.collateral_events.len(), 1);
        assert_eq!(
            ctx.collateral_events[0].module,
            Some(CollateralModuleType::Escrow)
        );
    }

    #[test]
    fn two_spigot_batches_same_token_sum_revenue() {
        let mut ctx = AggregationContext::new();

        ctx.merge_collateral_events(
            CollateralModuleType::Spigot,
            "ETH",
            Some(dec!(2000)),
            &[collateral_event(10, dec!(1))],
        );
        ctx.merge_collateral_events(
            CollateralModuleType::Spigot,
            "ETH",
            Some(dec!(2100)),
            &[collateral_event(20, dec!(1))],
        );

        assert_eq!(ctx.token_revenue.get("ETH"), Some(&dec!(4100)));
        // Batches concatenate in call order, not timestamp order.
        assert_eq!(ctx.collateral_events.len(), 2);
        assert_eq!(ctx.collateral_events[0].timestamp, 10);
        assert_eq!(ctx.collateral_events[1].timestamp, 20);
    }

    #[test]
    fn missing_price_values_collateral_at_zero() {
        let mut ctx = AggregationContext::new();

        let total = ctx.merge_collateral_events(
            CollateralModuleType::Spigot,
            "ETH",
            None,
            &[collateral_event(100, dec!(5))],
        );

        assert_eq!(total, dec!(0));
        assert_eq!(ctx.token_revenue.get("ETH"), Some(&dec!(0)));
        assert_eq!(ctx.collateral_events[0].value, dec!(0));
    }

    #[test]
    fn empty_symbol_normalizes_to_unknown() {
        let mut ctx = AggregationContext::new();

        ctx.merge_collateral_events(
            CollateralModuleType::Spigot,
            "",
            Some(dec!(10)),
            &[collateral_event(1, dec!(1))],
        );
        ctx.merge_credit_events("", dec!(10), &[credit_event(CreditEventKind::Borrow, 2, dec!(1))])
            .unwrap();

        assert_eq!(ctx.collateral_events[0].symbol, "UNKNOWN");
        assert_eq!(ctx.credit_events[0].symbol, "UNKNOWN");
        assert_eq!(ctx.token_revenue.get("UNKNOWN"), Some(&dec!(10)));
    }

    #[test]
    fn credit_events_value_at_spot_price() {
        let mut ctx = AggregationContext::new();

        ctx.merge_credit_events(
            "DAI",
            dec!(2),
            &[
                credit_event(CreditEventKind::Borrow, 1, dec!(100)),
                credit_event(CreditEventKind::RepayPrincipal, 2, dec!(40)),
            ],
        )
        .unwrap();

        assert_eq!(ctx.credit_events.len(), 2);
        assert_eq!(ctx.credit_events[0].value, dec!(200));
        assert_eq!(ctx.credit_events[1].value, dec!(80));
        assert_eq!(ctx.credit_events[0].module, None);
    }

    #[test]
    fn interest_repayment_keeps_recorded_value() {
        let mut ctx = AggregationContext::new();

        let mut event = credit_event(CreditEventKind::RepayInterest, 5, dec!(10));
        event.value = Some(dec!(500));

        // Spot price would give 10 * 100 = 1000; the recorded value wins.
        ctx.merge_credit_events("DAI", dec!(100), &[event]).unwrap();

        assert_eq!(ctx.credit_events[0].value, dec!(500));
    }

    #[test]
    fn interest_repayment_without_recorded_value_is_malformed() {
        let mut ctx = AggregationContext::new();

        let result = ctx.merge_credit_events(
            "DAI",
            dec!(100),
            &[credit_event(CreditEventKind::RepayInterest, 5, dec!(10))],
        );

        assert!(matches!(result, Err(BackendError::MalformedData(_))));
    }

    #[tokio::test]
    async fn line_page_end_to_end() {
        let oracle = StaticPriceOracle::with_default(dec!(100000000));
        let raw = line_page(
            vec![position(
                "p1",
                vec![credit_event(CreditEventKind::Borrow, 1000, dec!(100))],
            )],
            None,
            None,
        );

        let page = aggregate_line_page(raw, &oracle).await.unwrap();

        assert!(page.credits.contains_key("p1"));
        assert_eq!(page.credit_events.len(), 1);
        let event = &page.credit_events[0];
        assert_eq!(event.symbol, "DAI");
        assert_eq!(event.amount, dec!(100));
        assert_eq!(event.value, dec!(10000000000));
        assert_eq!(event.timestamp, 1000);
        assert_eq!(page.status, LineStatus::Active);
    }

    #[tokio::test]
    async fn page_totals_sum_over_positions() {
        let oracle = StaticPriceOracle::with_default(dec!(2));

        let mut first = position("p1", vec![]);
        first.principal = dec!(100);
        first.interest = dec!(10);
        let mut second = position("p2", vec![]);
        second.principal = dec!(50);
        second.interest = dec!(5);

        let page = aggregate_line_page(line_page(vec![first, second], None, None), &oracle)
            .await
            .unwrap();

        assert_eq!(page.principal, dec!(300));
        assert_eq!(page.interest, dec!(30));
    }

    #[tokio::test]
    async fn module_with_id_is_not_rolled_up() {
        let oracle = StaticPriceOracle::with_default(dec!(2000));
        let raw = line_page(
            vec![],
            Some(RawSpigotModule {
                id: Some("0xspigotmodule".to_string()),
                spigots: vec![RawSpigot {
                    id: "s1".to_string(),
                    contract: "0xrevenue".to_string(),
                    active: true,
                    token: dai_token(),
                    events: vec![collateral_event(1, dec!(1))],
                }],
            }),
            Some(RawEscrowModule {
                id: Some("0xescrowmodule".to_string()),
                deposits: vec![],
            }),
        );

        let page = aggregate_line_page(raw, &oracle).await.unwrap();

        assert!(page.spigot.is_none());
        assert!(page.escrow.is_none());
        assert!(page.collateral_events.is_empty());
    }

    #[tokio::test]
    async fn idless_modules_are_rolled_up_in_merge_order() {
        let oracle = StaticPriceOracle::new(
            HashMap::from([("ETH".to_string(), dec!(2000)), ("DAI".to_string(), dec!(1))]),
            dec!(0),
        );

        let raw = line_page(
            vec![],
            Some(RawSpigotModule {
                id: None,
                spigots: vec![
                    RawSpigot {
                        id: "s1".to_string(),
                        contract: "0xrevenue1".to_string(),
                        active: true,
                        token: Some(RawToken {
                            symbol: Some("ETH".to_string()),
                            decimals: Some(18),
                        }),
                        events: vec![collateral_event(500, dec!(2))],
                    },
                    RawSpigot {
                        id: "s2".to_string(),
                        contract: "0xrevenue2".to_string(),
                        active: false,
                        token: Some(RawToken {
                            symbol: Some("ETH".to_string()),
                            decimals: Some(18),
                        }),
                        events: vec![collateral_event(100, dec!(1))],
                    },
                ],
            }),
            Some(RawEscrowModule {
                id: None,
                deposits: vec![RawDeposit {
                    id: "d1".to_string(),
                    amount: dec!(300),
                    enabled: true,
                    token: dai_token(),
                    events: vec![collateral_event(50, dec!(300))],
                }],
            }),
        );

        let page = aggregate_line_page(raw, &oracle).await.unwrap();

        let spigot = page.spigot.as_ref().unwrap();
        assert_eq!(spigot.token_revenue.get("ETH"), Some(&dec!(6000)));
        assert_eq!(spigot.spigots.len(), 2);
        assert_eq!(spigot.spigots["s1"].revenue_value, dec!(4000));
        assert_eq!(spigot.spigots["s2"].revenue_value, dec!(2000));

        let escrow = page.escrow.as_ref().unwrap();
        assert_eq!(escrow.deposits["d1"].value, dec!(300));
        // Escrow value never lands in revenue totals.
        assert!(!spigot.token_revenue.contains_key("DAI"));

        // Spigot batches first (array order), escrow after, regardless of
        // timestamps.
        let timestamps: Vec<i64> = page.collateral_events.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![500, 100, 50]);
    }

    #[tokio::test]
    async fn aggregation_is_deterministic() {
        let oracle = StaticPriceOracle::with_default(dec!(3));
        let raw = line_page(
            vec![
                position(
                    "p1",
                    vec![
                        credit_event(CreditEventKind::Borrow, 900, dec!(10)),
                        credit_event(CreditEventKind::RepayPrincipal, 100, dec!(4)),
                    ],
                ),
                position("p2", vec![credit_event(CreditEventKind::Borrow, 50, dec!(1))]),
            ],
            Some(RawSpigotModule {
                id: None,
                spigots: vec![RawSpigot {
                    id: "s1".to_string(),
                    contract: "0xrevenue".to_string(),
                    active: true,
                    token: dai_token(),
                    events: vec![collateral_event(700, dec!(2)), collateral_event(30, dec!(1))],
                }],
            }),
            None,
        );

        let first = aggregate_line_page(raw.clone(), &oracle).await.unwrap();
        let second = aggregate_line_page(raw, &oracle).await.unwrap();

        assert_eq!(first.credit_events, second.credit_events);
        assert_eq!(first.collateral_events, second.collateral_events);
        // Credit events keep position-iteration order, not timestamp order.
        let timestamps: Vec<i64> = first.credit_events.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![900, 100, 50]);
    }
}
