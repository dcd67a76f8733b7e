use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    math::{DEFAULT_FRACTION_BITS, Fixed, FixedMath},
    types::{AmmError, Result},
    utils::config::SolverConfig,
};

/// Enough halvings to shrink any representable bracket to one raw unit.
pub const DEFAULT_MAX_ITERATIONS: u32 = 256;
/// Default tolerance is one raw unit of the default context.
pub const DEFAULT_TOLERANCE_BITS: u32 = DEFAULT_FRACTION_BITS;

/// Closed search interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub lo: Fixed,
    pub hi: Fixed,
}

impl Bracket {
    pub fn new(lo: Fixed, hi: Fixed) -> Result<Self> {
        if lo > hi {
            return Err(AmmError::InvalidParameters(format!(
                "bracket lower bound {} above upper bound {}",
                lo, hi
            )));
        }
        Ok(Self { lo, hi })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub root: Fixed,
    /// `f(root) - target`
    pub residual: Fixed,
    /// Final interval around the root: width within tolerance, or collapsed
    /// onto `root` when the residual met the tolerance first.
    pub bracket: Bracket,
    pub iterations: u32,
}

/// Bisection root finder over a fallible monotone function.
///
/// The iteration is a pure function of its inputs, so identical calls return
/// identical roots and iteration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BisectionSolver {
    max_iterations: u32,
    tolerance: Fixed,
}

impl BisectionSolver {
    /// `tolerance_bits` beyond the context's fraction bits clamp to one raw unit.
    pub fn new(math: &FixedMath, max_iterations: u32, tolerance_bits: u32) -> Result<Self> {
        if max_iterations == 0 {
            return Err(AmmError::InvalidParameters("solver needs at least one iteration".into()));
        }
        let bits = tolerance_bits.min(math.fraction_bits());
        let tolerance = Fixed::from_magnitude(false, math.one().raw().into_raw() >> bits as usize)
            .ok_or(AmmError::Overflow("tolerance"))?;
        Ok(Self {
            max_iterations,
            tolerance,
        })
    }

    pub fn from_config(math: &FixedMath, config: &SolverConfig) -> Result<Self> {
        Self::new(math, config.max_iterations, config.tolerance_bits)
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> Fixed {
        self.tolerance
    }

    /// Find `x` in `bracket` with `f(x) = target`. `f` must be monotone on the bracket.
    ///
    /// Stops once `|f(mid) - target|` or the bracket width is within tolerance.
    pub fn solve<F>(&self, math: &FixedMath, f: F, target: Fixed, bracket: Bracket) -> Result<SolverOutcome>
    where
        F: Fn(Fixed) -> Result<Fixed>,
    {
        let Bracket { mut lo, mut hi } = Bracket::new(bracket.lo, bracket.hi)?;

        let residual_lo = math.sub(f(lo)?, target)?;
        if residual_lo.is_zero() {
            return Ok(SolverOutcome {
                root: lo,
                residual: residual_lo,
                bracket: Bracket { lo, hi: lo },
                iterations: 0,
            });
        }
        let residual_hi = math.sub(f(hi)?, target)?;
        if residual_hi.is_zero() {
            return Ok(SolverOutcome {
                root: hi,
                residual: residual_hi,
                bracket: Bracket { lo: hi, hi },
                iterations: 0,
            });
        }
        let lo_negative = residual_lo.is_negative();
        if lo_negative == residual_hi.is_negative() {
            return Err(AmmError::InfeasibleTrade(format!(
                "target {} is not bracketed by [{}, {}]",
                math.readable(target),
                math.readable(lo),
                math.readable(hi)
            )));
        }
        if math.sub(hi, lo)? <= self.tolerance {
            return Ok(SolverOutcome {
                root: lo,
                residual: residual_lo,
                bracket: Bracket { lo, hi },
                iterations: 0,
            });
        }

        for iteration in 1..=self.max_iterations {
            let width = math.sub(hi, lo)?;
            let mid = math.add(lo, math.div_int(width, 2)?)?;
            let residual = math.sub(f(mid)?, target)?;

            if math.abs(residual)? <= self.tolerance {
                return Ok(SolverOutcome {
                    root: mid,
                    residual,
                    bracket: Bracket { lo: mid, hi: mid },
                    iterations: iteration,
                });
            }
            if residual.is_negative() == lo_negative {
                lo = mid;
            } else {
                hi = mid;
            }

            if math.sub(hi, lo)? <= self.tolerance {
                return Ok(SolverOutcome {
                    root: mid,
                    residual,
                    bracket: Bracket { lo, hi },
                    iterations: iteration,
                });
            }
        }

        warn!(
            "Bisection did not converge after {} iterations, last bracket [{}, {}]",
            self.max_iterations,
            math.readable(lo),
            math.readable(hi)
        );
        Err(AmmError::NonConvergence {
            iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::I256;
    use rust_decimal_macros::dec;

    use super::*;

    fn setup() -> (FixedMath, BisectionSolver) {
        let math = FixedMath::default();
        let solver = BisectionSolver::new(&math, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE_BITS).unwrap();
        (math, solver)
    }

    #[test]
    fn test_square_root_of_two() {
        let (math, solver) = setup();
        let two = math.from_int(2).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, two).unwrap();
        let outcome = solver.solve(&math, |x| math.mul(x, x), two, bracket).unwrap();

        let root = math.to_decimal(outcome.root).unwrap();
        assert!((root - dec!(1.41421356237309504880)).abs() < dec!(0.000000000000000000001));
        assert!(outcome.iterations > 0 && outcome.iterations <= DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_solver_is_deterministic() {
        let (math, solver) = setup();
        let target = math.from_int(3).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, math.from_int(5).unwrap()).unwrap();
        let first = solver.solve(&math, |x| math.mul(x, x), target, bracket).unwrap();
        let second = solver.solve(&math, |x| math.mul(x, x), target, bracket).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decreasing_function() {
        let (math, solver) = setup();
        let ten = math.from_int(10).unwrap();
        let target = math.from_int(4).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, ten).unwrap();
        let outcome = solver.solve(&math, |x| math.sub(ten, x), target, bracket).unwrap();
        let root = math.to_decimal(outcome.root).unwrap();
        assert!((root - dec!(6)).abs() < dec!(0.000000000001));
    }

    #[test]
    fn test_unbracketed_target_is_infeasible() {
        let (math, solver) = setup();
        let bracket = Bracket::new(Fixed::ZERO, math.one()).unwrap();
        let result = solver.solve(&math, |x| math.mul(x, x), math.from_int(4).unwrap(), bracket);
        assert!(matches!(result, Err(AmmError::InfeasibleTrade(_))));
    }

    #[test]
    fn test_endpoint_hit_returns_without_iterating() {
        let (math, solver) = setup();
        let bracket = Bracket::new(Fixed::ZERO, math.one()).unwrap();
        let outcome = solver.solve(&math, Ok, Fixed::ZERO, bracket).unwrap();
        assert_eq!(outcome.root, Fixed::ZERO);
        assert_eq!(outcome.iterations, 0);

        let outcome = solver.solve(&math, Ok, math.one(), bracket).unwrap();
        assert_eq!(outcome.root, math.one());
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_iteration_cap() {
        let math = FixedMath::default();
        let solver = BisectionSolver::new(&math, 3, DEFAULT_TOLERANCE_BITS).unwrap();
        let two = math.from_int(2).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, two).unwrap();
        let result = solver.solve(&math, |x| math.mul(x, x), two, bracket);
        assert!(matches!(result, Err(AmmError::NonConvergence { iterations: 3 })));
    }

    #[test]
    fn test_evaluation_errors_propagate() {
        let (math, solver) = setup();
        let bracket = Bracket::new(Fixed::ZERO, math.one()).unwrap();
        let result = solver.solve(&math, |x| math.ln(x), Fixed::ZERO, bracket);
        assert!(matches!(result, Err(AmmError::Domain { op: "ln", .. })));
    }

    #[test]
    fn test_construction_checks() {
        let math = FixedMath::default();
        assert!(BisectionSolver::new(&math, 0, 40).is_err());
        assert!(Bracket::new(math.one(), Fixed::ZERO).is_err());
        let solver = BisectionSolver::new(&math, 10, 1).unwrap();
        assert_eq!(solver.tolerance(), math.from_ratio(1, 2).unwrap());

        let finest = BisectionSolver::new(&math, 10, 200).unwrap();
        assert_eq!(finest.tolerance().raw(), I256::ONE);
        let coarse = FixedMath::new(96, 18).unwrap();
        let solver = BisectionSolver::new(&coarse, 10, DEFAULT_TOLERANCE_BITS).unwrap();
        assert_eq!(solver.tolerance().raw(), I256::ONE);
    }

    #[test]
    fn test_converges_to_one_raw_unit() {
        let (math, solver) = setup();
        let two = math.from_int(2).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, two).unwrap();
        let outcome = solver.solve(&math, |x| math.mul(x, x), two, bracket).unwrap();

        let Bracket { lo, hi } = outcome.bracket;
        assert!(math.sub(hi, lo).unwrap().raw() <= I256::ONE);
        assert!(lo <= outcome.root && outcome.root <= hi);
        let squared = math.mul(outcome.root, outcome.root).unwrap();
        assert!(math.sub(squared, two).unwrap().raw().abs() <= I256::try_from(4i64).unwrap());
        assert!(outcome.iterations <= 129);
    }

    #[test]
    fn test_resolves_targets_far_below_one() {
        let (math, solver) = setup();
        // Slope of 1 near x = 1e6; a target step of 1e-15 must move the root by 1e-15.
        let base = math.from_int(1_000_000).unwrap();
        let step = math.from_decimal(dec!(0.000000000000001)).unwrap();
        let target = math.sub(base, step).unwrap();
        let bracket = Bracket::new(Fixed::ZERO, base).unwrap();
        let outcome = solver.solve(&math, Ok, target, bracket).unwrap();

        let moved = math.sub(base, outcome.bracket.hi).unwrap();
        assert!(math.sub(moved, step).unwrap().raw().abs() <= I256::ONE);
    }
}
