// 7.0 config.rs: risk parameters the ledger reads but never writes.
// the ledger only sees the ConfigProvider trait. StaticConfig (7.1) is the
// in-process implementation used by the simulator and tests.

use crate::types::MarketId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Read-only source of margin and liquidation parameters. Errors propagate to
/// the caller of the risk query unchanged.
pub trait ConfigProvider: fmt::Debug + Send + Sync {
    /// Fraction of notional an open position or order must be backed by.
    fn min_allowable_margin(&self) -> Result<Decimal, ConfigError>;
    /// Margin fraction below which a trader is liquidated.
    fn maintenance_margin(&self) -> Result<Decimal, ConfigError>;
    /// Smallest size a liquidation may take in `market`.
    fn min_size_requirement(&self, market: MarketId) -> Result<Decimal, ConfigError>;
    /// Share of a position one liquidation may take in `market`.
    fn max_liquidation_ratio(&self, market: MarketId) -> Result<Decimal, ConfigError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no risk config for market {0:?}")]
    UnknownMarket(MarketId),

    #[error("invalid config: {reason}")]
    Invalid { reason: String },

    #[error("config parse error: {reason}")]
    Parse { reason: String },

    #[error("config unavailable: {reason}")]
    Unavailable { reason: String },
}

/** 7.1: per-market liquidation params */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRiskConfig {
    pub min_size_requirement: Decimal,
    pub max_liquidation_ratio: Decimal,
}

impl Default for MarketRiskConfig {
    fn default() -> Self {
        Self {
            min_size_requirement: dec!(0.01),
            max_liquidation_ratio: dec!(0.25),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub min_allowable_margin: Decimal,
    pub maintenance_margin: Decimal,
    pub markets: BTreeMap<MarketId, MarketRiskConfig>,
    // used for unlisted markets unless strict
    pub default_market: MarketRiskConfig,
    pub strict_markets: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            min_allowable_margin: dec!(0.2),
            maintenance_margin: dec!(0.1),
            markets: BTreeMap::new(),
            default_market: MarketRiskConfig::default(),
            strict_markets: false,
        }
    }
}

impl StaticConfig {
    pub fn with_market(mut self, market: MarketId, config: MarketRiskConfig) -> Self {
        self.markets.insert(market, config);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    fn market(&self, market: MarketId) -> Result<&MarketRiskConfig, ConfigError> {
        match self.markets.get(&market) {
            Some(config) => Ok(config),
            None if self.strict_markets => Err(ConfigError::UnknownMarket(market)),
            None => Ok(&self.default_market),
        }
    }

    // 7.2: ratios are fractions of notional
    pub fn validate(&self) -> Result<(), ConfigError> {
        let is_fraction = |d: Decimal| d > Decimal::ZERO && d <= Decimal::ONE;

        if !is_fraction(self.min_allowable_margin) || !is_fraction(self.maintenance_margin) {
            return Err(ConfigError::Invalid {
                reason: "margin ratios must be in (0, 1]".to_string(),
            });
        }
        if self.maintenance_margin > self.min_allowable_margin {
            return Err(ConfigError::Invalid {
                reason: "maintenance margin above min allowable margin".to_string(),
            });
        }

        for (market, config) in std::iter::once((None, &self.default_market))
            .chain(self.markets.iter().map(|(m, c)| (Some(*m), c)))
        {
            if !is_fraction(config.max_liquidation_ratio) || config.min_size_requirement < Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    reason: format!("bad liquidation params for market {:?}", market),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for StaticConfig {
    fn min_allowable_margin(&self) -> Result<Decimal, ConfigError> {
        Ok(self.min_allowable_margin)
    }

    fn maintenance_margin(&self) -> Result<Decimal, ConfigError> {
        Ok(self.maintenance_margin)
    }

    fn min_size_requirement(&self, market: MarketId) -> Result<Decimal, ConfigError> {
        self.market(market).map(|c| c.min_size_requirement)
    }

    fn max_liquidation_ratio(&self, market: MarketId) -> Result<Decimal, ConfigError> {
        self.market(market).map(|c| c.max_liquidation_ratio)
    }
}
