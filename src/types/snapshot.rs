use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    math::FixedMath,
    types::{PoolState, Result, Tick},
};

/// Human-readable view of a pool state for summaries and UIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub pair: String,
    pub reserve_x: Decimal,
    pub reserve_y: Decimal,
    pub expected_price: Decimal,
    /// None for an unseeded pool
    pub spot_price: Option<Decimal>,
    pub last_update: Tick,
    pub total_liquidity_tokens: Decimal,
    pub providers: BTreeMap<String, ProviderSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub liquidity_tokens: Decimal,
    pub share: Decimal,
    pub claimable_x: Decimal,
    pub claimable_y: Decimal,
}

impl PoolSummary {
    pub fn from_state(state: &PoolState, math: &FixedMath) -> Result<Self> {
        let spot_price = if state.is_empty() {
            None
        } else {
            Some(math.to_decimal(state.spot_price(math)?)?)
        };

        let mut providers = BTreeMap::new();
        for (provider, tokens) in state.liquidity_balance() {
            let (claimable_x, claimable_y) = state.provider_reserves(math, provider)?;
            providers.insert(
                provider.to_string(),
                ProviderSummary {
                    liquidity_tokens: math.to_decimal(*tokens)?,
                    share: math.to_decimal(state.pool_share(math, provider)?)?,
                    claimable_x: math.to_decimal(claimable_x)?,
                    claimable_y: math.to_decimal(claimable_y)?,
                },
            );
        }

        Ok(Self {
            pair: state.assets().to_string(),
            reserve_x: math.to_decimal(state.reserve_x())?,
            reserve_y: math.to_decimal(state.reserve_y())?,
            expected_price: math.to_decimal(state.expected_price())?,
            spot_price,
            last_update: state.last_update(),
            total_liquidity_tokens: math.to_decimal(state.total_liquidity_tokens())?,
            providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::{AssetId, AssetPair, ProviderId};

    #[test]
    fn test_summary_of_empty_pool() {
        let math = FixedMath::default();
        let pair = AssetPair::new(AssetId::new("ETH"), AssetId::new("USDC")).unwrap();
        let summary = PoolSummary::from_state(&PoolState::new(pair), &math).unwrap();
        assert_eq!(summary.pair, "ETH/USDC");
        assert_eq!(summary.spot_price, None);
        assert!(summary.providers.is_empty());
    }

    #[test]
    fn test_summary_lists_providers() {
        let math = FixedMath::default();
        let pair = AssetPair::new(AssetId::new("ETH"), AssetId::new("USDC")).unwrap();
        let mut state = PoolState::new(pair);
        state.reserve_x = math.from_int(10).unwrap();
        state.reserve_y = math.from_int(25).unwrap();
        state.total_liquidity_tokens = math.from_int(10).unwrap();
        state.liquidity_balance.insert(ProviderId::new("alice"), math.from_int(10).unwrap());

        let summary = PoolSummary::from_state(&state, &math).unwrap();
        assert_eq!(summary.spot_price, Some(dec!(2.5)));
        let alice = &summary.providers["alice"];
        assert_eq!(alice.share, dec!(1));
        assert_eq!(alice.claimable_y, dec!(25));
    }
}
