//! Snapshot differ
//!
//! Matches two snapshots by symbol key and computes the percent price change.
//! Listing order never matters.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::types::{MarketSnapshot, PriceChange};

/// `round((new - old) / old * 100, 2)`, `None` when `old` is zero or the
/// ratio does not fit a `Decimal`
pub fn percent_change(old: Decimal, new: Decimal) -> Option<f64> {
    if old.is_zero() {
        return None;
    }

    let change = new
        .checked_sub(old)?
        .checked_div(old)?
        .checked_mul(dec!(100))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    change.to_f64()
}

/// Compare `old` and `new` symbol by symbol.
///
/// Symbols new in `new` use their own price as the old one (zero change, fresh
/// baseline). Symbols gone from `new` are dropped. Symbols whose old price is
/// zero are skipped. Output is sorted by symbol.
pub fn diff(old: &MarketSnapshot, new: &MarketSnapshot) -> Vec<PriceChange> {
    let mut changes: Vec<PriceChange> = new
        .iter()
        .filter_map(|(symbol, quote)| {
            let old_price = old.get(symbol).map_or(quote.price, |q| q.price);

            match percent_change(old_price, quote.price) {
                Some(percent_change) => Some(PriceChange {
                    symbol: symbol.clone(),
                    old_price,
                    new_price: quote.price,
                    percent_change,
                }),
                None => {
                    debug!(symbol = %symbol, "Zero reference price or overflow, skipping symbol");
                    None
                }
            }
        })
        .collect();

    changes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Exchange, MarketQuote};
    use chrono::Utc;

    fn snapshot(entries: &[(&str, Decimal)]) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(Exchange::Binance);
        for (symbol, price) in entries {
            snapshot.insert(
                *symbol,
                MarketQuote {
                    price: *price,
                    volume: Some(dec!(500)),
                    observed_at: Utc::now(),
                },
            );
        }
        snapshot
    }

    #[test]
    fn percent_change_rounds_to_two_decimals() {
        assert_eq!(percent_change(dec!(100), dec!(105)), Some(5.0));
        assert_eq!(percent_change(dec!(100), dec!(90)), Some(-10.0));
        assert_eq!(percent_change(dec!(3), dec!(4)), Some(33.33));
        assert_eq!(percent_change(dec!(3), dec!(2)), Some(-33.33));
        assert_eq!(percent_change(dec!(0.00001234), dec!(0.00001234)), Some(0.0));
    }

    #[test]
    fn percent_change_guards_zero_reference() {
        assert_eq!(percent_change(Decimal::ZERO, dec!(5)), None);
    }

    #[test]
    fn diff_matches_by_symbol_not_position() {
        let old = snapshot(&[("AAABTC", dec!(1)), ("ETHBTC", dec!(100)), ("ZZZBTC", dec!(50))]);
        // Listing reshuffled and one symbol delisted
        let new = snapshot(&[("ZZZBTC", dec!(55)), ("ETHBTC", dec!(105))]);

        let changes = diff(&old, &new);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].symbol, "ETHBTC");
        assert_eq!(changes[0].old_price, dec!(100));
        assert_eq!(changes[0].percent_change, 5.0);
        assert_eq!(changes[1].symbol, "ZZZBTC");
        assert_eq!(changes[1].percent_change, 10.0);
    }

    #[test]
    fn newly_listed_symbol_gets_zero_change() {
        let old = snapshot(&[("ETHBTC", dec!(100))]);
        let new = snapshot(&[("ETHBTC", dec!(100)), ("NEWBTC", dec!(0.5))]);

        let changes = diff(&old, &new);

        let listed = changes.iter().find(|c| c.symbol == "NEWBTC").unwrap();
        assert_eq!(listed.old_price, listed.new_price);
        assert_eq!(listed.percent_change, 0.0);
    }

    #[test]
    fn zero_old_price_is_skipped() {
        let old = snapshot(&[("DEADBTC", Decimal::ZERO), ("ETHBTC", dec!(1))]);
        let new = snapshot(&[("DEADBTC", dec!(1)), ("ETHBTC", dec!(1))]);

        let changes = diff(&old, &new);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].symbol, "ETHBTC");
    }

    #[test]
    fn overflowing_ratio_is_skipped() {
        let dust = dec!(0.00000000000000000001);
        assert_eq!(percent_change(dust, dec!(10000000000)), None);

        let old = snapshot(&[("DUSTBTC", dust), ("ETHBTC", dec!(100))]);
        let new = snapshot(&[("DUSTBTC", dec!(10000000000)), ("ETHBTC", dec!(104))]);

        let changes = diff(&old, &new);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].symbol, "ETHBTC");
        assert_eq!(changes[0].percent_change, 4.0);
    }
}
