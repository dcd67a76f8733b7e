use alloy_primitives::U512;
use serde::{Deserialize, Serialize};

use crate::{
    math::{Fixed, fixed::{narrow, u256_from_u128, widen}},
    types::{AmmError, Result, BIPS_DENOMINATOR},
};

/// Acceptable range around an expected amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageBounds {
    pub minimum: Fixed,
    pub maximum: Fixed,
}

impl SlippageBounds {
    pub fn contains(&self, value: Fixed) -> bool {
        value >= self.minimum && value <= self.maximum
    }
}

fn bips_of(amount: Fixed, bips: u32) -> U512 {
    widen(amount.magnitude()) * widen(u256_from_u128(bips as u128)) / widen(u256_from_u128(BIPS_DENOMINATOR as u128))
}

fn clamp_to_fixed(value: U512) -> Fixed {
    narrow(value)
        .and_then(|magnitude| Fixed::from_magnitude(false, magnitude))
        .unwrap_or(Fixed::MAX)
}

/// `amount ± amount * bips / 10000`, clamped to `[0, Fixed::MAX]`.
pub fn slippage_bounds(amount: Fixed, bips: u32) -> Result<SlippageBounds> {
    if amount.is_negative() {
        return Err(AmmError::domain("slippage_bounds", "negative amount"));
    }
    let offset = bips_of(amount, bips);
    let value = widen(amount.magnitude());

    let minimum = if offset >= value {
        Fixed::ZERO
    } else {
        clamp_to_fixed(value - offset)
    };
    let maximum = clamp_to_fixed(value + offset);
    Ok(SlippageBounds { minimum, maximum })
}

/// Largest input whose upper slippage bound still fits inside `balance`.
pub fn max_spendable(balance: Fixed, bips: u32) -> Result<Fixed> {
    if balance.is_negative() {
        return Err(AmmError::domain("max_spendable", "negative balance"));
    }
    let scaled = widen(balance.magnitude()) * widen(u256_from_u128(BIPS_DENOMINATOR as u128));
    let denominator = widen(u256_from_u128(BIPS_DENOMINATOR as u128 + bips as u128));
    Ok(clamp_to_fixed(scaled / denominator))
}
