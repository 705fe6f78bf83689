//! Rate negotiation policy for carrier calls.
//!
//! The broker posts a load at a listed rate; carriers ask for more. The
//! policy closes the gap over at most three rounds, never offering above
//! the broker's walk-away ceiling and never offering more than the carrier
//! asked for.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Fixed policy constants. Built once at startup and shared by every
/// evaluation; nothing here changes per call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hard cap on rounds; at this round the policy accepts or walks away.
    pub max_rounds: u32,
    /// Asks at or below `listed_rate * this` are accepted immediately.
    pub acceptance_threshold_multiplier: Decimal,
    /// Default broker ceiling is `listed_rate * this` when the caller does
    /// not supply one.
    pub walk_away_multiplier: Decimal,
    /// Fraction of the ask/quote gap conceded on the first counter.
    pub round_one_move: Decimal,
    /// Fraction conceded on the second counter.
    pub round_two_move: Decimal,
    /// Fraction conceded on any later counter.
    pub final_round_move: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            acceptance_threshold_multiplier: Decimal::new(105, 2),
            walk_away_multiplier: Decimal::new(120, 2),
            round_one_move: Decimal::new(25, 2),
            round_two_move: Decimal::new(50, 2),
            final_round_move: Decimal::new(75, 2),
        }
    }
}

/// One round of negotiation as seen by the policy. The caller owns all
/// cross-round state and increments `round_number` itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationRequest {
    pub listed_rate: Decimal,
    pub carrier_ask: Decimal,
    pub round_number: u32,
    /// Informational lane baseline; defaults to the listed rate.
    pub market_average: Option<Decimal>,
    /// Hard ceiling override; defaults to `listed_rate * walk_away_multiplier`.
    pub broker_maximum: Option<Decimal>,
}

impl NegotiationRequest {
    pub fn new(listed_rate: Decimal, carrier_ask: Decimal, round_number: u32) -> Self {
        Self { listed_rate, carrier_ask, round_number, market_average: None, broker_maximum: None }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.listed_rate <= Decimal::ZERO {
            return Err(DomainError::InvalidInput(format!(
                "listed_rate must be greater than zero, got {}",
                self.listed_rate
            )));
        }
        if self.carrier_ask <= Decimal::ZERO {
            return Err(DomainError::InvalidInput(format!(
                "carrier_ask must be greater than zero, got {}",
                self.carrier_ask
            )));
        }
        if self.round_number < 1 {
            return Err(DomainError::InvalidInput(format!(
                "round_number must be at least 1, got {}",
                self.round_number
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationOutcome {
    Accept,
    Counter,
    Reject,
}

impl NegotiationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Counter => "counter",
            Self::Reject => "reject",
        }
    }
}

impl std::str::FromStr for NegotiationOutcome {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "counter" => Ok(Self::Counter),
            "reject" => Ok(Self::Reject),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported negotiation outcome `{other}` (expected accept|counter|reject)"
            ))),
        }
    }
}

/// Verdict for one round, with every derived figure the caller might log
/// or read back to the carrier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDecision {
    pub outcome: NegotiationOutcome,
    pub counter_offer: Option<Decimal>,
    pub accepted_rate: Option<Decimal>,
    pub acceptance_threshold: Decimal,
    pub broker_maximum: Decimal,
    pub quoted_rate: Decimal,
    pub market_average: Decimal,
    pub round: u32,
    pub max_rounds: u32,
    pub message: String,
}

/// Policy parameters and derived figures for a listed rate, without running
/// a negotiation. Display/debugging only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub listed_rate: Decimal,
    pub market_average: Decimal,
    pub acceptance_threshold: Decimal,
    pub broker_maximum: Decimal,
    pub max_rounds: u32,
    pub policy: PolicyConfig,
}

/// Decision seam for rate negotiation.
pub trait NegotiationEngine: Send + Sync {
    fn evaluate(&self, request: &NegotiationRequest) -> Result<RateDecision, DomainError>;
    fn summary(&self, listed_rate: Decimal, market_average: Option<Decimal>) -> PolicySnapshot;
}

/// Deterministic implementation of the three-round policy. Stateless: every
/// evaluation is a pure function of the request and the fixed config, so a
/// single instance can be shared across any number of concurrent calls.
#[derive(Clone, Debug, Default)]
pub struct RatePolicy {
    config: PolicyConfig,
}

impl RatePolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate one round. Branch order matters: a reasonable ask is
    /// accepted before the round cap is consulted, and the round cap is
    /// consulted before any counter is computed.
    pub fn evaluate(&self, request: &NegotiationRequest) -> Result<RateDecision, DomainError> {
        request.validate()?;

        let quoted_rate = request.listed_rate;
        let market_average = request.market_average.unwrap_or(quoted_rate);
        let acceptance_threshold = quoted_rate * self.config.acceptance_threshold_multiplier;
        let broker_maximum = request
            .broker_maximum
            .unwrap_or(quoted_rate * self.config.walk_away_multiplier);
        let carrier_ask = request.carrier_ask;
        let round = request.round_number;

        let figures = |outcome, counter_offer, accepted_rate, message| RateDecision {
            outcome,
            counter_offer,
            accepted_rate,
            acceptance_threshold,
            broker_maximum,
            quoted_rate,
            market_average,
            round,
            max_rounds: self.config.max_rounds,
            message,
        };

        // A reasonable ask is taken immediately, whatever the round.
        if carrier_ask <= acceptance_threshold {
            return Ok(figures(
                NegotiationOutcome::Accept,
                None,
                Some(carrier_ask),
                format!("Offer accepted at ${carrier_ask:.2} - that works for us."),
            ));
        }

        // Terminal round: take the deal if it clears the ceiling, otherwise
        // walk away. No further rounds are attempted.
        if round >= self.config.max_rounds {
            if carrier_ask <= broker_maximum {
                return Ok(figures(
                    NegotiationOutcome::Accept,
                    None,
                    Some(carrier_ask),
                    format!("Final round - accepting your rate of ${carrier_ask:.2}."),
                ));
            }
            return Ok(figures(
                NegotiationOutcome::Reject,
                None,
                None,
                format!("Cannot go above our maximum of ${broker_maximum:.2} on this load."),
            ));
        }

        let counter_offer = self.counter_offer(quoted_rate, carrier_ask, round, broker_maximum);

        // Never offer the carrier more than they asked for; if the computed
        // position would, just take the deal.
        if counter_offer >= carrier_ask {
            return Ok(figures(
                NegotiationOutcome::Accept,
                None,
                Some(carrier_ask),
                format!("Your ask of ${carrier_ask:.2} is within our range - accepted."),
            ));
        }

        Ok(figures(
            NegotiationOutcome::Counter,
            Some(counter_offer),
            None,
            format!("We can do ${counter_offer:.2} on this load."),
        ))
    }

    /// Counter amount for a non-terminal round: concede a round-dependent
    /// fraction of the gap, clamped to [quoted_rate, broker_maximum] and to
    /// 98% of the ask, then rounded to the nearest $10.
    fn counter_offer(
        &self,
        quoted_rate: Decimal,
        carrier_ask: Decimal,
        round_number: u32,
        broker_maximum: Decimal,
    ) -> Decimal {
        let gap = carrier_ask - quoted_rate;
        let raw = quoted_rate + gap * self.move_fraction(round_number);
        let below_ask = carrier_ask * Decimal::new(98, 2);

        let counter = raw.max(quoted_rate).min(broker_maximum).min(below_ask);
        round_to_nearest_ten(counter)
    }

    fn move_fraction(&self, round_number: u32) -> Decimal {
        match round_number {
            1 => self.config.round_one_move,
            2 => self.config.round_two_move,
            _ => self.config.final_round_move,
        }
    }

    pub fn summary(&self, listed_rate: Decimal, market_average: Option<Decimal>) -> PolicySnapshot {
        let market_average = market_average.unwrap_or(listed_rate);
        PolicySnapshot {
            listed_rate,
            market_average,
            acceptance_threshold: listed_rate * self.config.acceptance_threshold_multiplier,
            broker_maximum: listed_rate * self.config.walk_away_multiplier,
            max_rounds: self.config.max_rounds,
            policy: self.config.clone(),
        }
    }
}

impl NegotiationEngine for RatePolicy {
    fn evaluate(&self, request: &NegotiationRequest) -> Result<RateDecision, DomainError> {
        RatePolicy::evaluate(self, request)
    }

    fn summary(&self, listed_rate: Decimal, market_average: Option<Decimal>) -> PolicySnapshot {
        RatePolicy::summary(self, listed_rate, market_average)
    }
}

/// Round to the nearest $10, half away from zero.
fn round_to_nearest_ten(amount: Decimal) -> Decimal {
    (amount / Decimal::TEN).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::TEN
}
