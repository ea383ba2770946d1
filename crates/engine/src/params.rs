use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::Money;
use thiserror::Error;

/// Operator-tunable matching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Maximum distance between booking dates, inclusive, in whole days.
    pub date_tolerance_days: u32,
    /// Accepted for compatibility; does not influence matching.
    pub amount_tolerance: Money,
    /// Minimum vendor similarity for a pairing to be accepted.
    pub similarity_threshold: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            date_tolerance_days: 2,
            amount_tolerance: Money::new(Decimal::from(50)),
            similarity_threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("similarity threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("amount tolerance must not be negative, got {0}")]
    NegativeAmountTolerance(Money),
}

impl MatchParams {
    pub fn new(
        date_tolerance_days: u32,
        amount_tolerance: Money,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            date_tolerance_days,
            amount_tolerance,
            similarity_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ParamsError::ThresholdOutOfRange(self.similarity_threshold));
        }
        if self.amount_tolerance.is_negative() {
            return Err(ParamsError::NegativeAmountTolerance(self.amount_tolerance));
        }
        Ok(())
    }
}
