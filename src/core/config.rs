// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Application configuration (TOML).

use crate::core::bank::module_address;
use crate::core::types::AccAddress;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid authority address: {0}")]
    Authority(String),
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Configuration root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Node settings.
    pub node: NodeSettings,
    /// Log output.
    pub logging: LoggingConfig,
    /// Invariant checking.
    pub crisis: CrisisConfig,
    /// Staking engine settings.
    pub staking: StakingConfig,
    /// Consensus parameters visible to modules.
    pub consensus: ConsensusConfig,
    /// Hex address allowed to update module params. Defaults to the `gov` module account.
    pub authority: Option<String>,
}

/// Node settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Human-readable name.
    pub name: String,
    /// Data directory (sled db).
    pub data_dir: String,
    /// Chain identifier.
    pub chain_id: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: "amunchain".to_string(),
            data_dir: "./data".to_string(),
            chain_id: "amunchain-1".to_string(),
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON lines instead of compact text.
    pub json: bool,
    /// Max level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Invariant checking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    /// Assert invariants every N blocks; 0 disables.
    pub inv_check_period: u64,
    /// Module account receiving the invariant-verification fee.
    pub fee_collector_name: String,
    /// Skip the invariant assertion at genesis.
    pub skip_genesis_invariants: bool,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            inv_check_period: 0,
            fee_collector_name: "fee_collector".to_string(),
            skip_genesis_invariants: false,
        }
    }
}

/// Staking engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Tokens per unit of consensus power.
    pub power_reduction: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            power_reduction: 1_000_000,
        }
    }
}

/// Consensus parameters visible to modules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Permitted validator public key types.
    pub pub_key_types: Vec<String>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            pub_key_types: vec!["ed25519".to_string()],
        }
    }
}

impl AppConfig {
    /// Parse from a TOML string; missing sections take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staking.power_reduction == 0 {
            return Err(ConfigError::Invalid("staking.power_reduction must be > 0".into()));
        }
        if self.crisis.fee_collector_name.is_empty() {
            return Err(ConfigError::Invalid("crisis.fee_collector_name is empty".into()));
        }
        self.authority()?;
        Ok(())
    }

    /// Governance authority.
    pub fn authority(&self) -> Result<AccAddress, ConfigError> {
        match &self.authority {
            None => Ok(module_address("gov")),
            Some(h) => match AccAddress::from_hex(h) {
                Ok(a) if !a.is_empty() => Ok(a),
                _ => Err(ConfigError::Authority(h.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = AppConfig::from_toml_str("[crisis]\ninv_check_period = 5\n").unwrap();
        assert_eq!(cfg.crisis.inv_check_period, 5);
        assert_eq!(cfg.crisis.fee_collector_name, "fee_collector");
        assert_eq!(cfg.staking.power_reduction, 1_000_000);
        assert_eq!(cfg.authority().unwrap(), module_address("gov"));
    }

    #[test]
    fn rejects_bad_authority() {
        assert!(AppConfig::from_toml_str("authority = \"zz\"\n").is_err());
    }
}
