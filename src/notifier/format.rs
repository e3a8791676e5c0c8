//! Legacy chat rendering of alerts
//!
//! Kept byte-compatible with the existing consumers: one line wrapped in a
//! triple-backtick fence, e.g. `ETHBTC: *RSI=75 Change=5.0 Vol=1520.75`.
//! `*` marks the significant part, numbers are printed the way Python prints floats.

use chrono::{DateTime, Local, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::types::AlertEvent;

/// Wrap items joined by single spaces in a fenced block
pub fn fenced(items: &[String]) -> String {
    format!("```\n{}\n```", items.join(" "))
}

/// Render a float like Python's `str(float)` (`5.0`, `-10.25`, `1e+16`, `1.5e-05`).
///
/// `{:?}` already switches to exponent form at the same magnitudes as Python;
/// only the exponent is rewritten to carry a sign and at least two digits.
pub fn py_float(value: f64) -> String {
    let debug = format!("{:?}", value);
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };

    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

pub fn alert_text(alert: &AlertEvent) -> String {
    let mark = |significant: bool| if significant { "*" } else { "" };
    let volume = alert.volume.round_dp(2).to_f64().unwrap_or_default();

    fenced(&[
        format!("{}:", alert.symbol),
        format!("{}RSI={}", mark(alert.rsi_significant), alert.rsi.unwrap_or(0)),
        format!(
            "{}Change={}",
            mark(alert.change_significant),
            py_float(alert.percent_change)
        ),
        format!("Vol={}", py_float(volume)),
    ])
}

/// "---Time YYYY-MM-DD HH:MM---" header opening each cycle, in local time
pub fn cycle_header(at: DateTime<Utc>) -> String {
    format!(
        "```\n---Time {}---\n```",
        at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Exchange;
    use rust_decimal_macros::dec;

    fn alert() -> AlertEvent {
        AlertEvent {
            symbol: "ETHBTC".to_string(),
            exchange: Exchange::Binance,
            percent_change: 5.0,
            rsi: Some(55),
            volume: dec!(1520.75),
            change_significant: true,
            rsi_significant: false,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn renders_legacy_alert_line() {
        assert_eq!(
            alert_text(&alert()),
            "```\nETHBTC: RSI=55 *Change=5.0 Vol=1520.75\n```"
        );
    }

    #[test]
    fn marks_rsi_and_renders_missing_reading_as_zero() {
        let mut alert = alert();
        alert.rsi = None;
        alert.rsi_significant = true;
        alert.change_significant = false;
        alert.percent_change = -10.25;
        alert.volume = dec!(300);

        assert_eq!(
            alert_text(&alert),
            "```\nETHBTC: *RSI=0 Change=-10.25 Vol=300.0\n```"
        );
    }

    #[test]
    fn py_float_matches_python_exponent_form() {
        assert_eq!(py_float(5.0), "5.0");
        assert_eq!(py_float(-10.25), "-10.25");
        assert_eq!(py_float(123456789.5), "123456789.5");
        assert_eq!(py_float(1e16), "1e+16");
        assert_eq!(py_float(2.5e20), "2.5e+20");
        assert_eq!(py_float(1.5e-5), "1.5e-05");
        assert_eq!(py_float(1e-100), "1e-100");
    }

    #[test]
    fn header_is_fenced() {
        let header = cycle_header(Utc::now());
        assert!(header.starts_with("```\n---Time "));
        assert!(header.ends_with("---\n```"));
    }
}
