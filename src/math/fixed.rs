use std::{fmt, str::FromStr};

use alloy_primitives::{I256, U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    math::transcendental::{REDUCTION_STEPS, ReductionStep, build_tables},
    types::{AmmError, Result},
    utils::config::NumericConfig,
};

/// Fraction bits of the reference behavior (base = 2^127).
pub const DEFAULT_FRACTION_BITS: u32 = 127;
/// Below this the exp/ln lower domain edge (e^-63.875) is no longer representable.
pub const MIN_FRACTION_BITS: u32 = 96;
pub const MAX_FRACTION_BITS: u32 = 127;
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;
pub const MAX_TOKEN_DECIMALS: u32 = 38;
/// Decimal places guaranteed by a `from_decimal` / `to_decimal` round trip.
pub const DECIMAL_PRECISION: u32 = 18;

const MAX_DECIMAL_SCALE: u32 = 28;
const DECIMAL_MANTISSA_LIMIT: u128 = 1 << 96;

/// Signed fixed-point number. The raw integer is scaled by `2^fraction_bits`
/// of the [`FixedMath`] context that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(I256);

impl Fixed {
    pub const ZERO: Fixed = Fixed(I256::ZERO);
    pub const MAX: Fixed = Fixed(I256::MAX);

    pub const fn from_raw(raw: I256) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> I256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == I256::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < I256::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.0 > I256::ZERO
    }

    pub(crate) fn magnitude(&self) -> U256 {
        self.0.unsigned_abs()
    }

    pub(crate) fn from_magnitude(negative: bool, magnitude: U256) -> Option<Self> {
        signed(negative, magnitude).map(Self)
    }
}

impl Default for Fixed {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fixed {
    type Err = AmmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<I256>()
            .map(Fixed)
            .map_err(|e| AmmError::InvalidEvent(format!("invalid fixed-point raw value '{}': {}", s, e)))
    }
}

// Raw integers travel as decimal strings so persisted state is bit-exact.
impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Fixed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<I256>().map(Fixed).map_err(de::Error::custom)
    }
}

// ============================================================================
// Wide integer helpers
// ============================================================================

pub(crate) fn u256_from_u128(value: u128) -> U256 {
    U256::from_limbs([value as u64, (value >> 64) as u64, 0, 0])
}

pub(crate) fn u256_to_u128(value: U256) -> Option<u128> {
    let limbs = value.as_limbs();
    if limbs[2] != 0 || limbs[3] != 0 {
        return None;
    }
    Some(((limbs[1] as u128) << 64) | limbs[0] as u128)
}

pub(crate) fn widen(value: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(value.as_limbs());
    U512::from_limbs(limbs)
}

pub(crate) fn narrow(value: U512) -> Option<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|&limb| limb != 0) {
        return None;
    }
    let mut low = [0u64; 4];
    low.copy_from_slice(&limbs[..4]);
    Some(U256::from_limbs(low))
}

fn signed(negative: bool, magnitude: U256) -> Option<I256> {
    if magnitude > I256::MAX.into_raw() {
        return None;
    }
    let value = I256::from_raw(magnitude);
    if negative { value.checked_neg() } else { Some(value) }
}

fn pow10(exponent: u32) -> U256 {
    u256_from_u128(10u128.pow(exponent))
}

// ============================================================================
// Numeric context
// ============================================================================

/// Fixed-point arithmetic context. Carries the scale factor and the exp/ln
/// tables derived from it; every component that does arithmetic owns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedMath {
    fraction_bits: u32,
    token_decimals: u32,
    one: Fixed,
    pub(crate) ln_min: Fixed,
    pub(crate) exp_min: Fixed,
    pub(crate) ln2: Fixed,
    pub(crate) steps: [ReductionStep; REDUCTION_STEPS],
}

impl FixedMath {
    pub fn new(fraction_bits: u32, token_decimals: u32) -> Result<Self> {
        if !(MIN_FRACTION_BITS..=MAX_FRACTION_BITS).contains(&fraction_bits) {
            return Err(AmmError::InvalidParameters(format!(
                "fraction_bits must be within {}..={}, got {}",
                MIN_FRACTION_BITS, MAX_FRACTION_BITS, fraction_bits
            )));
        }
        if token_decimals > MAX_TOKEN_DECIMALS {
            return Err(AmmError::InvalidParameters(format!(
                "token_decimals must be at most {}, got {}",
                MAX_TOKEN_DECIMALS, token_decimals
            )));
        }
        Ok(Self::build(fraction_bits, token_decimals))
    }

    pub fn from_config(config: &NumericConfig) -> Result<Self> {
        Self::new(config.fraction_bits, config.token_decimals)
    }

    fn build(fraction_bits: u32, token_decimals: u32) -> Self {
        let one = Fixed(I256::from_raw(U256::from_limbs([1, 0, 0, 0]) << fraction_bits as usize));
        let tables = build_tables(fraction_bits);
        Self {
            fraction_bits,
            token_decimals,
            one,
            ln_min: tables.ln_min,
            exp_min: tables.exp_min,
            ln2: tables.ln2,
            steps: tables.steps,
        }
    }

    pub fn fraction_bits(&self) -> u32 {
        self.fraction_bits
    }

    pub fn token_decimals(&self) -> u32 {
        self.token_decimals
    }

    pub fn one(&self) -> Fixed {
        self.one
    }

    // ========== ARITHMETIC ==========

    pub fn add(&self, a: Fixed, b: Fixed) -> Result<Fixed> {
        a.0.checked_add(b.0).map(Fixed).ok_or(AmmError::Overflow("add"))
    }

    pub fn sub(&self, a: Fixed, b: Fixed) -> Result<Fixed> {
        a.0.checked_sub(b.0).map(Fixed).ok_or(AmmError::Overflow("sub"))
    }

    pub fn neg(&self, a: Fixed) -> Result<Fixed> {
        a.0.checked_neg().map(Fixed).ok_or(AmmError::Overflow("neg"))
    }

    pub fn abs(&self, a: Fixed) -> Result<Fixed> {
        if a.is_negative() { self.neg(a) } else { Ok(a) }
    }

    /// `a * b`, truncated toward zero.
    pub fn mul(&self, a: Fixed, b: Fixed) -> Result<Fixed> {
        self.scale(a, b.magnitude(), self.one.magnitude(), b.is_negative(), "mul")
    }

    /// `a / b`, truncated toward zero.
    pub fn div(&self, a: Fixed, b: Fixed) -> Result<Fixed> {
        if b.is_zero() {
            return Err(AmmError::domain("div", "division by zero"));
        }
        self.scale(a, self.one.magnitude(), b.magnitude(), b.is_negative(), "div")
    }

    /// `a * n / d` with a single truncation toward zero.
    pub fn mul_div(&self, a: Fixed, n: Fixed, d: Fixed) -> Result<Fixed> {
        if d.is_zero() {
            return Err(AmmError::domain("mul_div", "division by zero"));
        }
        self.scale(a, n.magnitude(), d.magnitude(), n.is_negative() != d.is_negative(), "mul_div")
    }

    pub fn mul_int(&self, a: Fixed, n: i64) -> Result<Fixed> {
        self.scale(
            a,
            u256_from_u128(n.unsigned_abs() as u128),
            U256::from_limbs([1, 0, 0, 0]),
            n < 0,
            "mul_int",
        )
    }

    pub fn div_int(&self, a: Fixed, n: u64) -> Result<Fixed> {
        if n == 0 {
            return Err(AmmError::domain("div_int", "division by zero"));
        }
        self.scale(a, U256::from_limbs([1, 0, 0, 0]), u256_from_u128(n as u128), false, "div_int")
    }

    /// `|value| * numerator / denominator` in 512 bits, sign re-applied afterwards.
    fn scale(
        &self,
        value: Fixed,
        numerator: U256,
        denominator: U256,
        flip_sign: bool,
        op: &'static str,
    ) -> Result<Fixed> {
        let product = widen(value.magnitude())
            .checked_mul(widen(numerator))
            .ok_or(AmmError::Overflow(op))?;
        let quotient = product
            .checked_div(widen(denominator))
            .ok_or_else(|| AmmError::domain(op, "division by zero"))?;
        let magnitude = narrow(quotient).ok_or(AmmError::Overflow(op))?;
        Fixed::from_magnitude(value.is_negative() != flip_sign, magnitude).ok_or(AmmError::Overflow(op))
    }

    // ========== CONVERSIONS ==========

    pub fn from_int(&self, n: i128) -> Result<Fixed> {
        let magnitude = u256_from_u128(n.unsigned_abs()) << self.fraction_bits as usize;
        Fixed::from_magnitude(n < 0, magnitude).ok_or(AmmError::Overflow("from_int"))
    }

    pub fn from_ratio(&self, numerator: i128, denominator: i128) -> Result<Fixed> {
        self.div(self.from_int(numerator)?, self.from_int(denominator)?)
    }

    /// Exact decimal input, truncated toward zero to the nearest raw unit.
    pub fn from_decimal(&self, value: Decimal) -> Result<Fixed> {
        let shifted = widen(u256_from_u128(value.mantissa().unsigned_abs())) << self.fraction_bits as usize;
        let quotient = shifted
            .checked_div(widen(pow10(value.scale())))
            .ok_or_else(|| AmmError::domain("from_decimal", "invalid scale"))?;
        let magnitude = narrow(quotient).ok_or(AmmError::Overflow("from_decimal"))?;
        Fixed::from_magnitude(value.is_sign_negative(), magnitude).ok_or(AmmError::Overflow("from_decimal"))
    }

    /// Truncating conversion using as many decimal places as `Decimal` can hold.
    pub fn to_decimal(&self, value: Fixed) -> Result<Decimal> {
        let magnitude = widen(value.magnitude());
        for scale in (0..=MAX_DECIMAL_SCALE).rev() {
            let scaled = magnitude
                .checked_mul(widen(pow10(scale)))
                .ok_or(AmmError::Overflow("to_decimal"))?
                >> self.fraction_bits as usize;
            let Some(mantissa) = narrow(scaled).and_then(u256_to_u128) else {
                continue;
            };
            if mantissa < DECIMAL_MANTISSA_LIMIT {
                let mantissa = mantissa as i128;
                let signed = if value.is_negative() { -mantissa } else { mantissa };
                return Ok(Decimal::try_from_i128_with_scale(signed, scale)?.normalize());
            }
        }
        Err(AmmError::Overflow("to_decimal"))
    }

    /// Decimal rendering for logs and error messages; falls back to the raw value
    /// when it does not fit a `Decimal`.
    pub fn readable(&self, value: Fixed) -> String {
        self.to_decimal(value)
            .map(|d| d.to_string())
            .unwrap_or_else(|_| value.to_string())
    }

    /// Integer token units (e.g. wei) into a fixed-point token amount.
    pub fn from_token_units(&self, units: u128) -> Result<Fixed> {
        let shifted = widen(u256_from_u128(units)) << self.fraction_bits as usize;
        let quotient = shifted
            .checked_div(widen(pow10(self.token_decimals)))
            .ok_or_else(|| AmmError::domain("from_token_units", "invalid decimals"))?;
        let magnitude = narrow(quotient).ok_or(AmmError::Overflow("from_token_units"))?;
        Fixed::from_magnitude(false, magnitude).ok_or(AmmError::Overflow("from_token_units"))
    }

    pub fn to_token_units(&self, value: Fixed) -> Result<u128> {
        if value.is_negative() {
            return Err(AmmError::domain("to_token_units", "negative amount"));
        }
        let scaled = widen(value.magnitude())
            .checked_mul(widen(pow10(self.token_decimals)))
            .ok_or(AmmError::Overflow("to_token_units"))?
            >> self.fraction_bits as usize;
        narrow(scaled)
            .and_then(u256_to_u128)
            .ok_or(AmmError::Overflow("to_token_units"))
    }
}

impl Default for FixedMath {
    fn default() -> Self {
        Self::build(DEFAULT_FRACTION_BITS, DEFAULT_TOKEN_DECIMALS)
    }
}
