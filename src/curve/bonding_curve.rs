use tracing::debug;

use crate::{
    curve::decay::{blend_realized_price, decay_expected_price},
    math::{BisectionSolver, Bracket, Fixed, FixedMath},
    types::{AmmError, CurveParameters, PoolState, Result, Side, TradeEvent, TradeReceipt},
};

/// Constant-elasticity curve anchored at the pool's expected price.
///
/// For taker asset `A` and maker asset `B` with reserves `(a, b)` the invariant is
/// `U(a, b) = w * a^(1 - rho) + b^(1 - rho)` with `w = pA * (a / b)^rho`, where
/// `pA` is the expected price of `A` in `B`. The marginal rate at the current
/// reserves is therefore `pA`, and the curve flattens toward constant sum as
/// `rho` goes to zero.
#[derive(Debug, Clone)]
pub struct BondingCurve {
    math: FixedMath,
    solver: BisectionSolver,
}

/// Reserve and price quantities for one trade direction.
struct TradeSide {
    taker: Side,
    taker_reserve: Fixed,
    maker_reserve: Fixed,
    /// Expected price of the taker asset in units of the maker asset.
    taker_price: Fixed,
}

impl BondingCurve {
    pub fn new(math: FixedMath, solver: BisectionSolver) -> Self {
        Self { math, solver }
    }

    pub fn math(&self) -> &FixedMath {
        &self.math
    }

    pub fn solver(&self) -> &BisectionSolver {
        &self.solver
    }

    /// Compute the outcome of `event` without committing it.
    pub fn quote_trade(
        &self,
        state: &PoolState,
        params: &CurveParameters,
        event: &TradeEvent,
    ) -> Result<TradeReceipt> {
        self.transition(state, params, event).map(|(_, receipt)| receipt)
    }

    /// Apply `event` to `state`, returning the successor state. `state` itself
    /// is never modified, so a failed trade leaves the pool untouched.
    pub fn apply_trade(
        &self,
        state: &PoolState,
        params: &CurveParameters,
        event: &TradeEvent,
    ) -> Result<(PoolState, TradeReceipt)> {
        let (next, receipt) = self.transition(state, params, event)?;
        let math = &self.math;
        debug!(
            "Trade {} {} -> {} {} at t={}, expected price {} -> {}",
            math.readable(receipt.taker_amount),
            receipt.taker_asset,
            math.readable(receipt.net_maker_amount),
            receipt.maker_asset,
            receipt.time,
            math.readable(state.expected_price()),
            math.readable(receipt.expected_price)
        );
        Ok((next, receipt))
    }

    fn transition(
        &self,
        state: &PoolState,
        params: &CurveParameters,
        event: &TradeEvent,
    ) -> Result<(PoolState, TradeReceipt)> {
        let math = &self.math;
        if state.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        let taker = state.assets().resolve(&event.taker_asset, &event.maker_asset)?;
        if !event.taker_amount.is_positive() {
            return Err(AmmError::InvalidEvent(format!(
                "trade amount must be positive, got {}",
                math.readable(event.taker_amount)
            )));
        }

        let decayed = decay_expected_price(math, params, state, event.time)?;
        let side = self.trade_side(state, taker, decayed)?;
        let (gross, iterations) = self.solve_output(params, &side, event.taker_amount)?;
        if !gross.is_positive() {
            return Err(AmmError::InvalidEvent(format!(
                "trade of {} {} rounds to zero output",
                math.readable(event.taker_amount),
                event.taker_asset
            )));
        }

        let fee_rate = params.fee.charged();
        let fee_amount = math.mul(gross, fee_rate)?;
        let net = math.sub(gross, fee_amount)?;
        if !net.is_positive() {
            return Err(AmmError::InvalidEvent(format!(
                "trade of {} {} rounds to zero output after fees",
                math.readable(event.taker_amount),
                event.taker_asset
            )));
        }

        let taker_reserve = math.add(side.taker_reserve, event.taker_amount)?;
        let maker_reserve = math.sub(side.maker_reserve, net)?;
        if !maker_reserve.is_positive() {
            return Err(AmmError::InsufficientReserve(format!(
                "trade would drain the {} reserve",
                event.maker_asset
            )));
        }

        // Realized price is always quoted as X in units of Y.
        let realized = match taker {
            Side::X => math.div(gross, event.taker_amount)?,
            Side::Y => math.div(event.taker_amount, gross)?,
        };
        let expected = blend_realized_price(math, params.kappa, decayed, realized)?;

        let mut next = state.clone();
        match taker {
            Side::X => {
                next.reserve_x = taker_reserve;
                next.reserve_y = maker_reserve;
            }
            Side::Y => {
                next.reserve_y = taker_reserve;
                next.reserve_x = maker_reserve;
            }
        }
        next.expected_price = expected;
        next.last_update = state.last_update().max(event.time);

        let receipt = TradeReceipt {
            taker_asset: event.taker_asset.clone(),
            maker_asset: event.maker_asset.clone(),
            taker_amount: event.taker_amount,
            gross_maker_amount: gross,
            net_maker_amount: net,
            fee_amount,
            fee_rate,
            realized_price: realized,
            decayed_expected_price: decayed,
            expected_price: expected,
            solver_iterations: iterations,
            time: event.time,
        };
        Ok((next, receipt))
    }

    fn trade_side(&self, state: &PoolState, taker: Side, decayed: Fixed) -> Result<TradeSide> {
        let taker_price = match taker {
            Side::X => decayed,
            Side::Y => self.math.div(self.math.one(), decayed)?,
        };
        Ok(TradeSide {
            taker,
            taker_reserve: state.reserve(taker),
            maker_reserve: state.reserve(taker.opposite()),
            taker_price,
        })
    }

    /// Gross maker output for `amount_in` of the taker asset, plus solver iterations.
    fn solve_output(&self, params: &CurveParameters, side: &TradeSide, amount_in: Fixed) -> Result<(Fixed, u32)> {
        let math = &self.math;
        let elasticity = math.sub(math.one(), params.rho)?;
        let a = side.taker_reserve;
        let b = side.maker_reserve;

        let ratio = math.div(a, b)?;
        let weight = math.mul(side.taker_price, math.pow(ratio, params.rho)?)?;
        let invariant = math.add(
            math.mul(weight, math.pow(a, elasticity)?)?,
            math.pow(b, elasticity)?,
        )?;

        let taker_term = math.mul(weight, math.pow(math.add(a, amount_in)?, elasticity)?)?;
        let maker_target = math.sub(invariant, taker_term)?;
        if !maker_target.is_positive() {
            return Err(AmmError::InfeasibleTrade(format!(
                "input of {} exceeds what the {:?} reserve can absorb",
                math.readable(amount_in),
                side.taker
            )));
        }

        let outcome = self.solver.solve(
            math,
            |candidate| math.pow(candidate, elasticity),
            maker_target,
            Bracket::new(Fixed::ZERO, b)?,
        )?;
        // Upper end of the final bracket keeps the larger remaining reserve.
        let remaining = outcome.bracket.hi.min(b);
        Ok((math.sub(b, remaining)?, outcome.iterations))
    }
}
