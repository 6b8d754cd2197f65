use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

use super::dcf::ScenarioResult;

/// Ordinal rating scale, most bullish first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Rating {
    /// Bucket an upside (intrinsic ÷ price − 1) into a rating.
    pub fn from_upside(upside: Rate) -> Self {
        if upside >= dec!(0.20) {
            Rating::StrongBuy
        } else if upside >= dec!(0.10) {
            Rating::Buy
        } else if upside > dec!(-0.10) {
            Rating::Hold
        } else if upside > dec!(-0.20) {
            Rating::Sell
        } else {
            Rating::StrongSell
        }
    }

    /// +1 bullish, 0 neutral, −1 bearish.
    pub fn direction(&self) -> i8 {
        match self {
            Rating::StrongBuy | Rating::Buy => 1,
            Rating::Hold => 0,
            Rating::Sell | Rating::StrongSell => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rating: Rating,
    /// Share of the base/bull/bear cases whose rating points the same way as
    /// the base case, in [0, 1]
    pub confidence: Decimal,
    /// Base-case upside to the current price; `None` without a price
    pub upside: Option<Rate>,
    pub reasoning: Vec<String>,
}

fn upside(value: Money, price: Money) -> Rate {
    value / price - Decimal::ONE
}

/// Rate the base case against `current_price`, scoring confidence by how
/// many scenarios agree with its direction.
pub fn recommend(
    current_price: Option<Money>,
    base: &ScenarioResult,
    bull: &ScenarioResult,
    bear: &ScenarioResult,
) -> Recommendation {
    let Some(price) = current_price else {
        return Recommendation {
            rating: Rating::Hold,
            confidence: Decimal::ZERO,
            upside: None,
            reasoning: vec![format!(
                "No current price supplied; intrinsic value {:.2} per share cannot be compared to market",
                base.price_per_share
            )],
        };
    };

    let base_upside = upside(base.price_per_share, price);
    let rating = Rating::from_upside(base_upside);

    let cases = [base, bull, bear];
    let agreeing = cases
        .iter()
        .filter(|c| Rating::from_upside(upside(c.price_per_share, price)).direction() == rating.direction())
        .count();
    let confidence = (Decimal::from(agreeing) / Decimal::from(cases.len())).round_dp(4);

    let mut reasoning = vec![
        format!(
            "Base case value {:.2} per share vs price {:.2}: {:+.1}% upside",
            base.price_per_share,
            price,
            base_upside * dec!(100)
        ),
        format!(
            "Scenario range {:.2} (bear) to {:.2} (bull)",
            bear.price_per_share, bull.price_per_share
        ),
        format!("{agreeing} of {} cases agree with the base-case direction", cases.len()),
    ];
    if base.terminal_value_pct > super::dcf::TERMINAL_VALUE_WARNING_PCT {
        reasoning.push(format!(
            "Terminal value is {:.0}% of enterprise value",
            base.terminal_value_pct * dec!(100)
        ));
    }

    Recommendation {
        rating,
        confidence,
        upside: Some(base_upside),
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(Rating::from_upside(dec!(0.20)), Rating::StrongBuy);
        assert_eq!(Rating::from_upside(dec!(0.1999)), Rating::Buy);
        assert_eq!(Rating::from_upside(dec!(0.10)), Rating::Buy);
        assert_eq!(Rating::from_upside(dec!(0.0)), Rating::Hold);
        assert_eq!(Rating::from_upside(dec!(-0.10)), Rating::Sell);
        assert_eq!(Rating::from_upside(dec!(-0.20)), Rating::StrongSell);
    }

    #[test]
    fn test_rating_serialises_screaming_case() {
        let json = serde_json::to_string(&Rating::StrongBuy).unwrap();
        assert_eq!(json, "\"STRONG_BUY\"");
    }
}
