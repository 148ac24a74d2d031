use crate::engine::TieBreak;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub tie_break: TieBreak,
    pub pnl_mode: PnlMode,
    pub max_trades_per_request: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PnlMode {
    #[default]
    Gross,
    Net,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            tie_break: TieBreak::StrictTimestamp,
            pnl_mode: PnlMode::Gross,
            max_trades_per_request: 10_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let tie_break = match env_map
            .get("TIE_BREAK")
            .map(|s| s.as_str())
            .unwrap_or("strict")
        {
            "strict" => TieBreak::StrictTimestamp,
            "sequence" => TieBreak::Sequence,
            other => {
                return Err(ConfigError::InvalidValue(
                    "TIE_BREAK".to_string(),
                    format!("must be strict or sequence, got {}", other),
                ))
            }
        };

        let pnl_mode = match env_map
            .get("PNL_MODE")
            .map(|s| s.as_str())
            .unwrap_or("gross")
        {
            "gross" => PnlMode::Gross,
            "net" => PnlMode::Net,
            other => {
                return Err(ConfigError::InvalidValue(
                    "PNL_MODE".to_string(),
                    format!("must be gross or net, got {}", other),
                ))
            }
        };

        let max_trades_per_request = env_map
            .get("MAX_TRADES_PER_REQUEST")
            .map(|s| s.as_str())
            .unwrap_or("10000")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "MAX_TRADES_PER_REQUEST".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            tie_break,
            pnl_mode,
            max_trades_per_request,
        })
    }
}
