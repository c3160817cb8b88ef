//! Oracle Price Drift
//!
//! The test oracle does not move on its own, so before each new market the
//! service nudges its answer by a random whole-dollar amount. Prices are
//! 8-decimal fixed point and all arithmetic stays in integers.

use crate::services::rpc_errors::ChainError;
use crate::types::PRICE_DECIMALS;
use alloy::primitives::I256;
use rand::Rng;
use std::ops::RangeInclusive;

/// 10^8, one whole dollar in oracle units
pub const PRICE_SCALE: i128 = 10i128.pow(PRICE_DECIMALS);

/// Default magnitude range of a single drift, in whole dollars
pub const DEFAULT_DRIFT_DOLLARS: RangeInclusive<u32> = 41..=341;

/// Draws signed whole-dollar drifts for the test oracle
#[derive(Debug, Clone)]
pub struct PriceDrift {
    magnitude: RangeInclusive<u32>,
}

impl Default for PriceDrift {
    fn default() -> Self {
        Self {
            magnitude: DEFAULT_DRIFT_DOLLARS,
        }
    }
}

impl PriceDrift {
    pub fn new(magnitude: RangeInclusive<u32>) -> Self {
        Self { magnitude }
    }

    /// Draw a magnitude uniformly from the range and flip an independent fair coin for sign
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let amount = i64::from(rng.gen_range(self.magnitude.clone()));
        if rng.gen_bool(0.5) {
            amount
        } else {
            -amount
        }
    }

    /// Apply a whole-dollar delta to an 8-decimal price
    pub fn apply(price: I256, delta_dollars: i64) -> Result<I256, ChainError> {
        let scaled = i128::from(delta_dollars)
            .checked_mul(PRICE_SCALE)
            .ok_or_else(|| ChainError::InvalidValue(format!("drift {} overflows", delta_dollars)))?;
        let scaled = I256::try_from(scaled)
            .map_err(|e| ChainError::InvalidValue(format!("drift {}: {}", delta_dollars, e)))?;

        price
            .checked_add(scaled)
            .ok_or_else(|| ChainError::InvalidValue(format!("price {} + {} overflows", price, scaled)))
    }
}
