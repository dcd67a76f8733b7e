use alloy_primitives::{I256, U256};

use crate::{
    math::fixed::{Fixed, FixedMath},
    types::{AmmError, Result},
};

pub const REDUCTION_STEPS: usize = 9;

const LN_SERIES_TERMS: u64 = 17;
const EXP_SERIES_TERMS: u64 = 24;

/// Reduction exponents `k` in eighths: 32, 16, 8, 4, 2, 1, 1/2, 1/4, 1/8.
const STEP_EIGHTHS: [u64; REDUCTION_STEPS] = [256, 128, 64, 32, 16, 8, 4, 2, 1];

/// Sum of all reduction exponents (63.875) in eighths.
const EXP_MIN_EIGHTHS: u64 = 511;

/// `floor(e^-k * 2^127)` for each entry of `STEP_EIGHTHS`.
const E_NEG_K_127: [U256; REDUCTION_STEPS] = [
    U256::from_limbs([0x4f76164681e299a0, 0x000000000001c846, 0, 0]),
    U256::from_limbs([0x2e56d32fb9f99744, 0x000000f1aaddd774, 0, 0]),
    U256::from_limbs([0x5dfe6a33c07f738f, 0x000afe10820813d6, 0, 0]),
    U256::from_limbs([0xfd15e0265855c47a, 0x02582ab704279e8e, 0, 0]),
    U256::from_limbs([0xdb76eae12d029571, 0x1152aaa3bf81cb9f, 0, 0]),
    U256::from_limbs([0x5d6f63c1482a7c86, 0x2f16ac6c59de6f8d, 0, 0]),
    U256::from_limbs([0xeb3ad1aa9866ebb3, 0x4da2cbf1be5827f9, 0, 0]),
    U256::from_limbs([0xa0ae5e4eb1b479dc, 0x63afbe7ab2082ba1, 0, 0]),
    U256::from_limbs([0x1f58934f97aea57d, 0x70f5a893b608861e, 0, 0]),
];

/// `ceil(e^-63.875 * 2^127)`
const LN_MIN_127: U256 = U256::from_limbs([0x0000000733048c5b, 0, 0, 0]);

/// `floor(ln 2 * 2^127)`
const LN2_127: U256 = U256::from_limbs([0xe4f1d9cc01f97b57, 0x58b90bfbe8e7bcd5, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionStep {
    /// `k` as a fixed-point value.
    pub exponent: Fixed,
    /// `e^-k` as a fixed-point value.
    pub factor: Fixed,
}

pub(crate) struct Tables {
    pub ln_min: Fixed,
    pub exp_min: Fixed,
    pub ln2: Fixed,
    pub steps: [ReductionStep; REDUCTION_STEPS],
}

fn unsigned(raw: U256) -> Fixed {
    Fixed::from_raw(I256::from_raw(raw))
}

/// Rescale the 127-bit constants to `fraction_bits`. `fraction_bits` must be in
/// the range accepted by `FixedMath::new`.
pub(crate) fn build_tables(fraction_bits: u32) -> Tables {
    let shift = (127 - fraction_bits) as usize;
    let eighth_shift = (fraction_bits - 3) as usize;

    let mut steps = [ReductionStep {
        exponent: Fixed::ZERO,
        factor: Fixed::ZERO,
    }; REDUCTION_STEPS];
    for (i, step) in steps.iter_mut().enumerate() {
        step.exponent = unsigned(U256::from_limbs([STEP_EIGHTHS[i], 0, 0, 0]) << eighth_shift);
        step.factor = unsigned(E_NEG_K_127[i] >> shift);
    }

    // LN_MIN is rounded up so it never drops below e^-63.875.
    let mut ln_min = LN_MIN_127 >> shift;
    if ln_min << shift != LN_MIN_127 {
        ln_min += U256::from_limbs([1, 0, 0, 0]);
    }

    let exp_min = I256::from_raw(U256::from_limbs([EXP_MIN_EIGHTHS, 0, 0, 0]) << eighth_shift);

    Tables {
        ln_min: unsigned(ln_min),
        exp_min: Fixed::from_raw(-exp_min),
        ln2: unsigned(LN2_127 >> shift),
        steps,
    }
}

fn ceil_div(a: U256, b: U256) -> U256 {
    let quotient = a / b;
    if quotient * b == a { quotient } else { quotient + U256::from_limbs([1, 0, 0, 0]) }
}

fn small(value: U256, limit: u64) -> Option<u64> {
    let limbs = value.as_limbs();
    if limbs[1..].iter().any(|&limb| limb != 0) || limbs[0] > limit {
        return None;
    }
    Some(limbs[0])
}

impl FixedMath {
    pub fn ln_min(&self) -> Fixed {
        self.ln_min
    }

    pub fn exp_min(&self) -> Fixed {
        self.exp_min
    }

    pub fn ln2(&self) -> Fixed {
        self.ln2
    }

    /// Natural log on `[LN_MIN, 1]`.
    pub fn ln(&self, x: Fixed) -> Result<Fixed> {
        if x > self.one() {
            return Err(AmmError::domain("ln", "argument above 1"));
        }
        if x < self.ln_min {
            return Err(AmmError::domain("ln", "argument below e^-63.875"));
        }
        if x == self.one() {
            return Ok(Fixed::ZERO);
        }

        let mut x = x;
        let mut reduced = Fixed::ZERO;
        for step in &self.steps {
            if x <= step.factor {
                reduced = self.sub(reduced, step.exponent)?;
                x = self.div(x, step.factor)?;
            }
        }

        // x is now in (e^-1/8, 1]; ln x = 2 atanh((x - 1) / (x + 1))
        let y = self.div(self.sub(x, self.one())?, self.add(x, self.one())?)?;
        let y_squared = self.mul(y, y)?;
        let mut term = y;
        let mut series = Fixed::ZERO;
        for n in 0..LN_SERIES_TERMS {
            series = self.add(series, self.div_int(term, 2 * n + 1)?)?;
            term = self.mul(term, y_squared)?;
        }

        self.add(reduced, self.add(series, series)?)
    }

    /// Natural exponential on `[-63.875, 0]`.
    pub fn exp(&self, x: Fixed) -> Result<Fixed> {
        if x.is_positive() {
            return Err(AmmError::domain("exp", "argument above 0"));
        }
        if x < self.exp_min {
            return Err(AmmError::domain("exp", "argument below -63.875"));
        }
        if x.is_zero() {
            return Ok(self.one());
        }

        let mut remaining = self.neg(x)?;
        let mut applied = [false; REDUCTION_STEPS];
        for (hit, step) in applied.iter_mut().zip(&self.steps) {
            if remaining >= step.exponent {
                remaining = self.sub(remaining, step.exponent)?;
                *hit = true;
            }
        }

        // Taylor series of e^-z for z in [0, 1/8)
        let minus_z = self.neg(remaining)?;
        let mut term = self.one();
        let mut result = self.one();
        for n in 1..=EXP_SERIES_TERMS {
            term = self.div_int(self.mul(term, minus_z)?, n)?;
            if term.is_zero() {
                break;
            }
            result = self.add(result, term)?;
        }

        for (_, step) in applied.iter().zip(&self.steps).filter(|(hit, _)| **hit) {
            result = self.mul(result, step.factor)?;
        }
        Ok(result)
    }

    /// Split a positive `x` into `(m, k)` with `m` in `(1/2, 1]` and `x = m * 2^k`.
    pub fn mantissa(&self, x: Fixed) -> Result<(Fixed, i32)> {
        if !x.is_positive() {
            return Err(AmmError::domain("mantissa", "argument must be positive"));
        }
        let magnitude = x.magnitude();
        let bit_len = (256 - magnitude.leading_zeros()) as i32;
        let fraction_bits = self.fraction_bits() as i32;
        let power_of_two = magnitude.count_ones() == 1;
        let exponent = if power_of_two {
            bit_len - 1 - fraction_bits
        } else {
            bit_len - fraction_bits
        };

        let raw = if exponent >= 0 {
            magnitude >> exponent as usize
        } else {
            magnitude << (-exponent) as usize
        };
        Ok((unsigned(raw), exponent))
    }

    /// `ln` over all positive values.
    pub fn ln_normalized(&self, x: Fixed) -> Result<Fixed> {
        if !x.is_positive() {
            return Err(AmmError::domain("ln", "argument must be positive"));
        }
        if x >= self.ln_min && x <= self.one() {
            return self.ln(x);
        }
        let (m, k) = self.mantissa(x)?;
        self.add(self.ln(m)?, self.mul_int(self.ln2, k as i64)?)
    }

    /// `exp` over all values whose result is representable. Results below the
    /// smallest raw unit come back as zero.
    pub fn exp_normalized(&self, y: Fixed) -> Result<Fixed> {
        if y >= self.exp_min && !y.is_positive() {
            return self.exp(y);
        }
        let ln2 = self.ln2.magnitude();

        if y.is_positive() {
            // y = k ln2 + r with r in (-ln2, 0]
            let k = small(ceil_div(y.magnitude(), ln2), 255).ok_or(AmmError::Overflow("exp"))?;
            let r = self.sub(y, self.mul_int(self.ln2, k as i64)?)?;
            let base = self.exp(r)?.magnitude();
            if base.leading_zeros() <= k as usize {
                return Err(AmmError::Overflow("exp"));
            }
            return Fixed::from_magnitude(false, base << k as usize).ok_or(AmmError::Overflow("exp"));
        }

        // y below EXP_MIN: y = r - k ln2 with r in [EXP_MIN, EXP_MIN + ln2)
        let gap = self.sub(self.exp_min, y)?;
        let Some(k) = small(ceil_div(gap.magnitude(), ln2), 255) else {
            return Ok(Fixed::ZERO);
        };
        let r = self.add(y, self.mul_int(self.ln2, k as i64)?)?;
        let base = self.exp(r)?.magnitude();
        Ok(unsigned(base >> k as usize))
    }

    /// `base^exponent` for a non-negative base and arbitrary fixed-point exponent.
    pub fn pow(&self, base: Fixed, exponent: Fixed) -> Result<Fixed> {
        if base.is_negative() {
            return Err(AmmError::domain("pow", "negative base"));
        }
        if exponent.is_zero() {
            return Ok(self.one());
        }
        if base.is_zero() {
            if exponent.is_positive() {
                return Ok(Fixed::ZERO);
            }
            return Err(AmmError::domain("pow", "zero base with negative exponent"));
        }
        let log = self.ln_normalized(base)?;
        self.exp_normalized(self.mul(exponent, log)?)
    }

    /// `base^exponent` by repeated squaring.
    pub fn pow_int(&self, base: Fixed, exponent: u64) -> Result<Fixed> {
        let mut result = self.one();
        let mut square = base;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = self.mul(result, square)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                square = self.mul(square, square)?;
            }
        }
        Ok(result)
    }
}
