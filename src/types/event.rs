use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    math::{Fixed, FixedMath},
    types::{AssetId, ProviderId, Result, Tick, ALLOWED_SLIPPAGE_BIPS},
};

/// A taker sells `taker_amount` of `taker_asset` for the pool's `maker_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub taker_asset: AssetId,
    pub maker_asset: AssetId,
    pub taker_amount: Fixed,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub provider: ProviderId,
    pub amount_x: Fixed,
    pub amount_y: Fixed,
    /// Tolerated deviation of `amount_y` from the pool ratio.
    pub max_slippage_bips: u32,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawEvent {
    pub provider: ProviderId,
    pub liquidity_tokens: Fixed,
    pub time: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityEvent {
    Deposit(DepositEvent),
    Withdraw(WithdrawEvent),
}

/// Anything the sequencer can apply to a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolEvent {
    Trade(TradeEvent),
    Deposit(DepositEvent),
    Withdraw(WithdrawEvent),
}

impl PoolEvent {
    pub fn time(&self) -> Tick {
        match self {
            PoolEvent::Trade(e) => e.time,
            PoolEvent::Deposit(e) => e.time,
            PoolEvent::Withdraw(e) => e.time,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            PoolEvent::Trade(_) => "trade",
            PoolEvent::Deposit(_) => "deposit",
            PoolEvent::Withdraw(_) => "withdraw",
        }
    }
}

impl From<TradeEvent> for PoolEvent {
    fn from(event: TradeEvent) -> Self {
        PoolEvent::Trade(event)
    }
}

impl From<LiquidityEvent> for PoolEvent {
    fn from(event: LiquidityEvent) -> Self {
        match event {
            LiquidityEvent::Deposit(e) => PoolEvent::Deposit(e),
            LiquidityEvent::Withdraw(e) => PoolEvent::Withdraw(e),
        }
    }
}

fn default_slippage_bips() -> u32 {
    ALLOWED_SLIPPAGE_BIPS
}

/// Event as it appears in an event log: decimal amounts, plain string ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRecord {
    Trade {
        taker_asset: String,
        maker_asset: String,
        amount: Decimal,
        time: Tick,
    },
    Deposit {
        provider: String,
        amount_x: Decimal,
        amount_y: Decimal,
        #[serde(default = "default_slippage_bips")]
        max_slippage_bips: u32,
        time: Tick,
    },
    Withdraw {
        provider: String,
        liquidity_tokens: Decimal,
        time: Tick,
    },
}

impl EventRecord {
    /// Convert into a fixed-point event for `math`.
    pub fn parse(&self, math: &FixedMath) -> Result<PoolEvent> {
        let event = match self {
            EventRecord::Trade {
                taker_asset,
                maker_asset,
                amount,
                time,
            } => PoolEvent::Trade(TradeEvent {
                taker_asset: taker_asset.parse()?,
                maker_asset: maker_asset.parse()?,
                taker_amount: math.from_decimal(*amount)?,
                time: *time,
            }),
            EventRecord::Deposit {
                provider,
                amount_x,
                amount_y,
                max_slippage_bips,
                time,
            } => PoolEvent::Deposit(DepositEvent {
                provider: provider.parse()?,
                amount_x: math.from_decimal(*amount_x)?,
                amount_y: math.from_decimal(*amount_y)?,
                max_slippage_bips: *max_slippage_bips,
                time: *time,
            }),
            EventRecord::Withdraw {
                provider,
                liquidity_tokens,
                time,
            } => PoolEvent::Withdraw(WithdrawEvent {
                provider: provider.parse()?,
                liquidity_tokens: math.from_decimal(*liquidity_tokens)?,
                time: *time,
            }),
        };
        Ok(event)
    }

    /// Parse a JSON array of records.
    pub fn parse_log(json: &str, math: &FixedMath) -> Result<Vec<PoolEvent>> {
        let records: Vec<EventRecord> = serde_json::from_str(json)?;
        records.iter().map(|record| record.parse(math)).collect()
    }
}
