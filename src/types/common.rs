use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{AmmError, Result};

/// Logical time. Events carry ticks; the pool only ever compares them.
pub type Tick = u64;

/// Basis points in a whole (100%).
pub const BIPS_DENOMINATOR: u32 = 10_000;

/// Default tolerance for deposits against the pool ratio (2%).
pub const ALLOWED_SLIPPAGE_BIPS: u32 = 200;

/// Default tolerance offered to takers when quoting a swap (1%).
pub const SWAP_SLIPPAGE_BIPS: u32 = 100;

/// Identifier of a pool asset, e.g. `"ETH"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = AmmError;

    fn from_str(s: &str) -> Result<Self> {
        let symbol = s.trim();
        if symbol.is_empty() {
            return Err(AmmError::InvalidEvent("empty asset identifier".into()));
        }
        Ok(Self::new(symbol))
    }
}

/// Identifier of a liquidity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderId {
    type Err = AmmError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim();
        if id.is_empty() {
            return Err(AmmError::InvalidEvent("empty provider identifier".into()));
        }
        Ok(Self::new(id))
    }
}

/// Which reserve of the pool an asset maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    X,
    Y,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::X => Side::Y,
            Side::Y => Side::X,
        }
    }
}

/// The two assets of a pool. Prices are quoted as units of `y` per unit of `x`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub x: AssetId,
    pub y: AssetId,
}

impl AssetPair {
    pub fn new(x: AssetId, y: AssetId) -> Result<Self> {
        if x == y {
            return Err(AmmError::InvalidParameters(format!(
                "pool assets must differ, got {} twice",
                x
            )));
        }
        Ok(Self { x, y })
    }

    pub fn side_of(&self, asset: &AssetId) -> Option<Side> {
        if asset == &self.x {
            Some(Side::X)
        } else if asset == &self.y {
            Some(Side::Y)
        } else {
            None
        }
    }

    pub fn asset(&self, side: Side) -> &AssetId {
        match side {
            Side::X => &self.x,
            Side::Y => &self.y,
        }
    }

    /// Resolve a taker/maker pair against the pool, rejecting foreign or repeated assets.
    pub fn resolve(&self, taker: &AssetId, maker: &AssetId) -> Result<Side> {
        let taker_side = self
            .side_of(taker)
            .ok_or_else(|| AmmError::InvalidEvent(format!("asset {} is not traded in {}", taker, self)))?;
        let maker_side = self
            .side_of(maker)
            .ok_or_else(|| AmmError::InvalidEvent(format!("asset {} is not traded in {}", maker, self)))?;
        if taker_side == maker_side {
            return Err(AmmError::InvalidEvent(format!(
                "taker and maker asset are both {}",
                taker
            )));
        }
        Ok(taker_side)
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}
