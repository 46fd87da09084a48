//! Viability Scoring Module
//!
//! Weighted short-term viability score for a freshly launched token:
//! - low market cap scores high (early entry)
//! - SOL already in the bonding curve scores high (price headroom)
//! - oversized initial buys are penalized (dump precursor)

use crate::models::config::ScoreThresholds;
use crate::models::types::{ScoreComponents, ScoreResult, SignalClass, TokenEvent};

const MARKET_CAP_WEIGHT: f64 = 1.5;
const RESERVE_WEIGHT: f64 = 5.0;
const INITIAL_BUY_DIVISOR: f64 = 100_000.0;

/// Pure scorer; holds only the signal thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    thresholds: ScoreThresholds,
}

impl Scorer {
    pub fn new(thresholds: ScoreThresholds) -> Self {
        Self { thresholds }
    }

    pub fn score(&self, event: &TokenEvent) -> ScoreResult {
        let components = Self::components(event);
        let score = components.market_cap_term + components.reserve_term
            - components.initial_buy_penalty;

        ScoreResult {
            score,
            components,
            signals: self.classify(score),
            creator_ownership_ratio: Self::creator_ownership_ratio(event),
        }
    }

    fn components(event: &TokenEvent) -> ScoreComponents {
        ScoreComponents {
            // +1 keeps a zero market cap finite
            market_cap_term: (100.0 / (event.market_cap_sol + 1.0)) * MARKET_CAP_WEIGHT,
            reserve_term: event.v_sol_in_bonding_curve * RESERVE_WEIGHT,
            initial_buy_penalty: event.initial_buy / INITIAL_BUY_DIVISOR,
        }
    }

    /// Both classes are checked independently
    pub fn classify(&self, score: f64) -> Vec<SignalClass> {
        let mut signals = Vec::with_capacity(2);
        if score >= self.thresholds.auto_buy {
            signals.push(SignalClass::AutoBuy);
        }
        if score > self.thresholds.high_potential {
            signals.push(SignalClass::HighPotential);
        }
        signals
    }

    fn creator_ownership_ratio(event: &TokenEvent) -> f64 {
        if event.v_tokens_in_bonding_curve > 0.0 {
            event.creator_holdings / event.v_tokens_in_bonding_curve
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(market_cap: f64, v_sol: f64, initial_buy: f64) -> TokenEvent {
        TokenEvent {
            mint: "M1".into(),
            creator: "C1".into(),
            market_cap_sol: market_cap,
            v_sol_in_bonding_curve: v_sol,
            initial_buy,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_event() {
        let result = Scorer::default().score(&event(5.0, 10.0, 2.0));
        let expected = (100.0 / 6.0) * 1.5 + 50.0 - 0.00002;
        assert!((result.score - expected).abs() < 1e-9, "score was {}", result.score);
        assert_eq!(result.signals, vec![SignalClass::HighPotential]);
        assert!(!result.has(SignalClass::AutoBuy));
    }

    #[test]
    fn test_zero_market_cap_is_finite() {
        let result = Scorer::default().score(&event(0.0, 0.0, 0.0));
        assert_eq!(result.score, 150.0);
        assert_eq!(result.signals, vec![SignalClass::AutoBuy, SignalClass::HighPotential]);
    }

    #[test]
    fn test_thresholds() {
        let scorer = Scorer::default();
        assert_eq!(scorer.classify(100.0), vec![SignalClass::AutoBuy, SignalClass::HighPotential]);
        assert_eq!(scorer.classify(99.9), vec![SignalClass::HighPotential]);
        assert!(scorer.classify(50.0).is_empty());
    }

    #[test]
    fn test_monotonic_in_initial_buy_and_reserve() {
        let scorer = Scorer::default();
        let mut previous = f64::INFINITY;
        for initial_buy in [0.0, 1.0, 1_000.0, 1_000_000.0, 50_000_000.0] {
            let score = scorer.score(&event(30.0, 20.0, initial_buy)).score;
            assert!(score < previous);
            previous = score;
        }

        let mut previous = f64::NEG_INFINITY;
        for v_sol in [0.0, 0.5, 10.0, 30.0, 85.0] {
            let score = scorer.score(&event(30.0, v_sol, 1_000.0)).score;
            assert!(score > previous);
            previous = score;
        }
    }

    #[test]
    fn test_creator_ownership_ratio() {
        let mut e = event(30.0, 30.0, 0.0);
        e.creator_holdings = 50_000_000.0;
        e.v_tokens_in_bonding_curve = 1_000_000_000.0;
        assert!((Scorer::default().score(&e).creator_ownership_ratio - 0.05).abs() < 1e-12);

        e.v_tokens_in_bonding_curve = 0.0;
        assert_eq!(Scorer::default().score(&e).creator_ownership_ratio, 0.0);
    }
}
