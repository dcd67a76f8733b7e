use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{
    math::{
        BisectionSolver, DEFAULT_FRACTION_BITS, DEFAULT_MAX_ITERATIONS, DEFAULT_TOKEN_DECIMALS,
        DEFAULT_TOLERANCE_BITS, FixedMath,
    },
    types::{AmmError, AssetId, AssetPair, CurveParameters, FeeBand, Result},
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "ANCHORED_AMM";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed-point context
    pub numeric: NumericConfig,

    /// Traded assets
    pub pool: PoolConfig,

    /// Curve shape, fee and price anchor
    pub curve: CurveConfig,

    /// Price-discovery solver
    pub solver: SolverConfig,

    /// Event replay input and state persistence
    pub replay: ReplayConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericConfig {
    pub fraction_bits: u32,
    pub token_decimals: u32,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            fraction_bits: DEFAULT_FRACTION_BITS,
            token_decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub asset_x: String,
    pub asset_y: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            asset_x: "X".into(),
            asset_y: "Y".into(),
        }
    }
}

impl PoolConfig {
    pub fn asset_pair(&self) -> Result<AssetPair> {
        AssetPair::new(self.asset_x.parse::<AssetId>()?, self.asset_y.parse::<AssetId>()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub rho: Decimal,
    pub base_fee: Decimal,
    /// Upper edge of the fee band; defaults to `base_fee`
    pub fee_cap: Option<Decimal>,
    pub beta: Decimal,
    pub kappa: Decimal,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            rho: dec!(0.01),
            base_fee: dec!(0.003),
            fee_cap: None,
            beta: dec!(0.9),
            kappa: dec!(0.1),
        }
    }
}

impl CurveConfig {
    pub fn to_parameters(&self, math: &FixedMath) -> Result<CurveParameters> {
        let lo = math.from_decimal(self.base_fee)?;
        let hi = match self.fee_cap {
            Some(cap) => math.from_decimal(cap)?,
            None => lo,
        };
        CurveParameters::new(
            math,
            math.from_decimal(self.rho)?,
            FeeBand { lo, hi },
            math.from_decimal(self.beta)?,
            math.from_decimal(self.kappa)?,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: u32,
    /// Tolerance is `2^-tolerance_bits`, at finest one raw unit of the numeric context
    pub tolerance_bits: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance_bits: DEFAULT_TOLERANCE_BITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub events_path: String,
    pub state_path: String,
    /// Abort the whole replay on the first rejected event
    pub stop_on_error: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            events_path: "events.json".into(),
            state_path: "pool_state.json".into(),
            stop_on_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl Config {
    pub fn numeric_config(&self) -> &NumericConfig {
        &self.numeric
    }

    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn curve_config(&self) -> &CurveConfig {
        &self.curve
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn replay_config(&self) -> &ReplayConfig {
        &self.replay
    }

    pub fn logging_config(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Defaults, then the TOML file at `path` (if present), then
    /// `ANCHORED_AMM__SECTION__KEY` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn math(&self) -> Result<FixedMath> {
        FixedMath::from_config(&self.numeric)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let math = self.math().map_err(|e| AmmError::Config(e.to_string()))?;
        self.pool
            .asset_pair()
            .map_err(|e| AmmError::Config(e.to_string()))?;
        self.curve
            .to_parameters(&math)
            .map_err(|e| AmmError::Config(e.to_string()))?;
        BisectionSolver::from_config(&math, &self.solver).map_err(|e| AmmError::Config(e.to_string()))?;

        if self.replay.events_path.trim().is_empty() {
            return Err(AmmError::Config("replay.events_path must not be empty".into()));
        }
        Ok(())
    }
}
