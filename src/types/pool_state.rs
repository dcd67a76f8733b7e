use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    math::{Fixed, FixedMath},
    types::{AmmError, AssetPair, ProviderId, Result, Side, Tick},
};

/// Fee band of the pool. `lo` is the base fee and the charged floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBand {
    pub lo: Fixed,
    pub hi: Fixed,
}

impl FeeBand {
    pub fn flat(fee: Fixed) -> Self {
        Self { lo: fee, hi: fee }
    }

    /// Rate charged on a trade.
    pub fn charged(&self) -> Fixed {
        self.lo
    }
}

/// Curve shape and price-anchor parameters, fixed for the life of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParameters {
    /// Curvature in (0, 1); small values behave close to constant sum at the anchor.
    pub rho: Fixed,
    pub fee: FeeBand,
    /// Per-tick decay factor of the expected price toward spot.
    pub beta: Fixed,
    /// Weight of a trade's realized price in the expected price.
    pub kappa: Fixed,
}

impl CurveParameters {
    pub fn new(math: &FixedMath, rho: Fixed, fee: FeeBand, beta: Fixed, kappa: Fixed) -> Result<Self> {
        let params = Self { rho, fee, beta, kappa };
        params.validate(math)?;
        Ok(params)
    }

    pub fn validate(&self, math: &FixedMath) -> Result<()> {
        let one = math.one();
        if !self.rho.is_positive() || self.rho >= one {
            return Err(AmmError::InvalidParameters("rho must lie strictly between 0 and 1".into()));
        }
        if self.fee.lo.is_negative() || self.fee.lo >= one {
            return Err(AmmError::InvalidParameters("base fee must lie in [0, 1)".into()));
        }
        if self.fee.hi < self.fee.lo || self.fee.hi >= one {
            return Err(AmmError::InvalidParameters("fee cap must lie in [base fee, 1)".into()));
        }
        if self.beta.is_negative() || self.beta > one {
            return Err(AmmError::InvalidParameters("beta must lie in [0, 1]".into()));
        }
        if self.kappa.is_negative() || self.kappa > one {
            return Err(AmmError::InvalidParameters("kappa must lie in [0, 1]".into()));
        }
        Ok(())
    }
}

/// Pool state. Fields are only written by curve and liquidity transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub(crate) assets: AssetPair,
    pub(crate) reserve_x: Fixed,
    pub(crate) reserve_y: Fixed,
    /// Reference price `pBar`, units of Y per unit of X.
    pub(crate) expected_price: Fixed,
    pub(crate) last_update: Tick,
    pub(crate) total_liquidity_tokens: Fixed,
    pub(crate) liquidity_balance: BTreeMap<ProviderId, Fixed>,
}

impl PoolState {
    /// An unseeded pool.
    pub fn new(assets: AssetPair) -> Self {
        Self {
            assets,
            reserve_x: Fixed::ZERO,
            reserve_y: Fixed::ZERO,
            expected_price: Fixed::ZERO,
            last_update: 0,
            total_liquidity_tokens: Fixed::ZERO,
            liquidity_balance: BTreeMap::new(),
        }
    }

    pub fn assets(&self) -> &AssetPair {
        &self.assets
    }

    pub fn reserve_x(&self) -> Fixed {
        self.reserve_x
    }

    pub fn reserve_y(&self) -> Fixed {
        self.reserve_y
    }

    pub fn reserve(&self, side: Side) -> Fixed {
        match side {
            Side::X => self.reserve_x,
            Side::Y => self.reserve_y,
        }
    }

    pub fn expected_price(&self) -> Fixed {
        self.expected_price
    }

    pub fn last_update(&self) -> Tick {
        self.last_update
    }

    pub fn total_liquidity_tokens(&self) -> Fixed {
        self.total_liquidity_tokens
    }

    pub fn liquidity_balance(&self) -> &BTreeMap<ProviderId, Fixed> {
        &self.liquidity_balance
    }

    pub fn balance_of(&self, provider: &ProviderId) -> Fixed {
        self.liquidity_balance.get(provider).copied().unwrap_or(Fixed::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.reserve_x.is_zero() && self.reserve_y.is_zero()
    }

    /// Marginal price `reserveY / reserveX`.
    pub fn spot_price(&self, math: &FixedMath) -> Result<Fixed> {
        if self.is_empty() {
            return Err(AmmError::EmptyPool);
        }
        math.div(self.reserve_y, self.reserve_x)
    }

    /// Fraction of all liquidity tokens held by `provider`.
    pub fn pool_share(&self, math: &FixedMath, provider: &ProviderId) -> Result<Fixed> {
        if self.total_liquidity_tokens.is_zero() {
            return Ok(Fixed::ZERO);
        }
        math.div(self.balance_of(provider), self.total_liquidity_tokens)
    }

    /// Reserves `(x, y)` that `provider` could withdraw right now.
    pub fn provider_reserves(&self, math: &FixedMath, provider: &ProviderId) -> Result<(Fixed, Fixed)> {
        self.claim(math, self.balance_of(provider))
    }

    /// Reserves `(x, y)` backing a single liquidity token.
    pub fn reserves_per_token(&self, math: &FixedMath) -> Result<(Fixed, Fixed)> {
        self.claim(math, math.one())
    }

    pub(crate) fn claim(&self, math: &FixedMath, tokens: Fixed) -> Result<(Fixed, Fixed)> {
        if self.total_liquidity_tokens.is_zero() {
            return Ok((Fixed::ZERO, Fixed::ZERO));
        }
        Ok((
            math.mul_div(self.reserve_x, tokens, self.total_liquidity_tokens)?,
            math.mul_div(self.reserve_y, tokens, self.total_liquidity_tokens)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::AssetId;

    fn pair() -> AssetPair {
        AssetPair::new(AssetId::new("ETH"), AssetId::new("USDC")).unwrap()
    }

    fn params(math: &FixedMath) -> CurveParameters {
        CurveParameters {
            rho: math.from_decimal(dec!(0.01)).unwrap(),
            fee: FeeBand::flat(math.from_decimal(dec!(0.003)).unwrap()),
            beta: math.from_decimal(dec!(0.9)).unwrap(),
            kappa: math.from_decimal(dec!(0.1)).unwrap(),
        }
    }

    #[test]
    fn test_parameter_validation() {
        let math = FixedMath::default();
        assert!(params(&math).validate(&math).is_ok());

        let mut bad = params(&math);
        bad.rho = math.one();
        assert!(matches!(bad.validate(&math), Err(AmmError::InvalidParameters(_))));

        let mut bad = params(&math);
        bad.fee.hi = math.from_decimal(dec!(0.001)).unwrap();
        assert!(bad.validate(&math).is_err());

        let mut bad = params(&math);
        bad.kappa = math.from_int(2).unwrap();
        assert!(bad.validate(&math).is_err());
    }

    #[test]
    fn test_empty_pool_views() {
        let math = FixedMath::default();
        let state = PoolState::new(pair());
        assert!(state.is_empty());
        assert!(matches!(state.spot_price(&math), Err(AmmError::EmptyPool)));
        let alice = ProviderId::new("alice");
        assert_eq!(state.pool_share(&math, &alice).unwrap(), Fixed::ZERO);
        assert_eq!(state.reserves_per_token(&math).unwrap(), (Fixed::ZERO, Fixed::ZERO));
    }

    #[test]
    fn test_share_helpers() {
        let math = FixedMath::default();
        let alice = ProviderId::new("alice");
        let bob = ProviderId::new("bob");
        let mut state = PoolState::new(pair());
        state.reserve_x = math.from_int(400).unwrap();
        state.reserve_y = math.from_int(800).unwrap();
        state.total_liquidity_tokens = math.from_int(400).unwrap();
        state.liquidity_balance.insert(alice.clone(), math.from_int(300).unwrap());
        state.liquidity_balance.insert(bob.clone(), math.from_int(100).unwrap());

        assert_eq!(state.spot_price(&math).unwrap(), math.from_int(2).unwrap());
        assert_eq!(state.pool_share(&math, &bob).unwrap(), math.from_ratio(1, 4).unwrap());
        assert_eq!(
            state.provider_reserves(&math, &alice).unwrap(),
            (math.from_int(300).unwrap(), math.from_int(600).unwrap())
        );
        assert_eq!(
            state.reserves_per_token(&math).unwrap(),
            (math.one(), math.from_int(2).unwrap())
        );
        assert_eq!(state.balance_of(&ProviderId::new("carol")), Fixed::ZERO);
    }

    #[test]
    fn test_state_serde_is_exact() {
        let math = FixedMath::default();
        let mut state = PoolState::new(pair());
        state.reserve_x = math.from_decimal(dec!(123.456)).unwrap();
        state.expected_price = math.from_ratio(1, 3).unwrap();
        state.liquidity_balance.insert(ProviderId::new("alice"), math.from_int(5).unwrap());
        let json = serde_json::to_string(&state).unwrap();
        let back: PoolState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
