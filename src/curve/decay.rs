use crate::{
    math::{Fixed, FixedMath},
    types::{CurveParameters, PoolState, Result, Tick},
};

/// Ticks elapsed since `last_update`. Events from the past decay by zero ticks.
pub fn elapsed(last_update: Tick, time: Tick) -> u64 {
    time.saturating_sub(last_update)
}

/// Pull the expected price toward spot: `w * pBar + (1 - w) * spot` with
/// `w = beta^elapsed`.
pub fn decay_expected_price(
    math: &FixedMath,
    params: &CurveParameters,
    state: &PoolState,
    time: Tick,
) -> Result<Fixed> {
    let ticks = elapsed(state.last_update(), time);
    if ticks == 0 {
        return Ok(state.expected_price());
    }
    let spot = state.spot_price(math)?;
    let weight = math.pow_int(params.beta, ticks)?;
    let anchored = math.mul(weight, state.expected_price())?;
    let drift = math.mul(math.sub(math.one(), weight)?, spot)?;
    math.add(anchored, drift)
}

/// Move the expected price a `kappa` fraction toward the realized trade price.
pub fn blend_realized_price(math: &FixedMath, kappa: Fixed, expected: Fixed, realized: Fixed) -> Result<Fixed> {
    let gap = math.sub(realized, expected)?;
    math.add(expected, math.mul(kappa, gap)?)
}
