use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::call::CallOutcome;

/// Post-call sentiment, derived from the outcome alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// How hard the carrier pushed on price, by round count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSensitivity {
    Unknown,
    Low,
    Medium,
    High,
}

/// How far above the listed rate the carrier opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggressiveness {
    Unknown,
    Conservative,
    Moderate,
    Aggressive,
}

pub fn sentiment(outcome: CallOutcome) -> Sentiment {
    match outcome {
        CallOutcome::Accepted => Sentiment::Positive,
        CallOutcome::Rejected => Sentiment::Negative,
        CallOutcome::Transferred | CallOutcome::Incomplete => Sentiment::Neutral,
    }
}

pub fn rate_sensitivity(negotiation_rounds: u32) -> RateSensitivity {
    match negotiation_rounds {
        0 => RateSensitivity::Unknown,
        1 => RateSensitivity::Low,
        2 => RateSensitivity::Medium,
        _ => RateSensitivity::High,
    }
}

/// Scores the opening ask against the listed rate. Carriers negotiate
/// upward here, so the gap is first ask minus listed; a non-positive
/// listed rate yields `Unknown` rather than an error.
pub fn negotiation_aggressiveness(
    listed_rate: Decimal,
    first_ask: Option<Decimal>,
) -> Aggressiveness {
    let Some(first_ask) = first_ask else {
        return Aggressiveness::Unknown;
    };
    if listed_rate <= Decimal::ZERO {
        return Aggressiveness::Unknown;
    }

    let gap_percentage = (first_ask - listed_rate) / listed_rate * Decimal::ONE_HUNDRED;
    if gap_percentage > Decimal::from(15) {
        Aggressiveness::Aggressive
    } else if gap_percentage > Decimal::from(5) {
        Aggressiveness::Moderate
    } else {
        Aggressiveness::Conservative
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::call::CallOutcome;

    use super::{
        negotiation_aggressiveness, rate_sensitivity, sentiment, Aggressiveness, RateSensitivity,
        Sentiment,
    };

    #[test]
    fn sentiment_follows_outcome() {
        assert_eq!(sentiment(CallOutcome::Accepted), Sentiment::Positive);
        assert_eq!(sentiment(CallOutcome::Rejected), Sentiment::Negative);
        assert_eq!(sentiment(CallOutcome::Transferred), Sentiment::Neutral);
        assert_eq!(sentiment(CallOutcome::Incomplete), Sentiment::Neutral);
    }

    #[test]
    fn rate_sensitivity_scales_with_rounds() {
        assert_eq!(rate_sensitivity(0), RateSensitivity::Unknown);
        assert_eq!(rate_sensitivity(1), RateSensitivity::Low);
        assert_eq!(rate_sensitivity(2), RateSensitivity::Medium);
        assert_eq!(rate_sensitivity(3), RateSensitivity::High);
        assert_eq!(rate_sensitivity(7), RateSensitivity::High);
    }

    #[test]
    fn aggressiveness_uses_gap_above_listed_rate() {
        let listed = Decimal::from(2000);

        // 25% over listed.
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(2500))),
            Aggressiveness::Aggressive
        );
        // 10% over listed.
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(2200))),
            Aggressiveness::Moderate
        );
        // 2% over listed.
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(2040))),
            Aggressiveness::Conservative
        );
        // Asking below the listed rate is as conservative as it gets.
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(1900))),
            Aggressiveness::Conservative
        );
    }

    #[test]
    fn aggressiveness_boundaries_are_exclusive() {
        let listed = Decimal::from(1000);
        // Exactly 15% stays moderate, exactly 5% stays conservative.
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(1150))),
            Aggressiveness::Moderate
        );
        assert_eq!(
            negotiation_aggressiveness(listed, Some(Decimal::from(1050))),
            Aggressiveness::Conservative
        );
    }

    #[test]
    fn aggressiveness_is_unknown_without_history_or_valid_rate() {
        assert_eq!(negotiation_aggressiveness(Decimal::from(2000), None), Aggressiveness::Unknown);
        assert_eq!(
            negotiation_aggressiveness(Decimal::ZERO, Some(Decimal::from(2100))),
            Aggressiveness::Unknown
        );
    }
}
