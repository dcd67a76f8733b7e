use serde::{Deserialize, Serialize};

use crate::{
    math::Fixed,
    types::{AssetId, ProviderId, Tick},
};

/// Outcome of a single trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub taker_asset: AssetId,
    pub maker_asset: AssetId,
    pub taker_amount: Fixed,
    /// Maker amount released by the curve before fees.
    pub gross_maker_amount: Fixed,
    /// Maker amount received by the taker.
    pub net_maker_amount: Fixed,
    pub fee_amount: Fixed,
    pub fee_rate: Fixed,
    /// Realized price of X in units of Y.
    pub realized_price: Fixed,
    pub decayed_expected_price: Fixed,
    pub expected_price: Fixed,
    pub solver_iterations: u32,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub provider: ProviderId,
    pub amount_x: Fixed,
    pub amount_y: Fixed,
    pub minted: Fixed,
    /// True when this deposit seeded an empty pool.
    pub seeded: bool,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub provider: ProviderId,
    pub burned: Fixed,
    pub amount_x: Fixed,
    pub amount_y: Fixed,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventReceipt {
    Trade(TradeReceipt),
    Deposit(DepositReceipt),
    Withdraw(WithdrawReceipt),
}

impl EventReceipt {
    pub fn time(&self) -> Tick {
        match self {
            EventReceipt::Trade(r) => r.time,
            EventReceipt::Deposit(r) => r.time,
            EventReceipt::Withdraw(r) => r.time,
        }
    }
}
