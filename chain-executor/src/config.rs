//! Executor configuration

use crate::gas::GasSchedule;
use anyhow::Context;
use chain_core::{Address, BlockNumber, Gas};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fork activation rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainRules {
    /// First block running homestead rules, `None` if never active
    pub homestead_block: Option<BlockNumber>,
}

impl Default for ChainRules {
    fn default() -> Self {
        Self {
            homestead_block: Some(0),
        }
    }
}

impl ChainRules {
    pub fn is_homestead(&self, number: BlockNumber) -> bool {
        self.homestead_block.is_some_and(|block| number >= block)
    }
}

/// Address the registry contract is deployed at by default
pub const DEFAULT_REGISTRY_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x11,
]);

/// Symbolic contract name resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    /// Registry contract answering name lookups. When unset, the address is
    /// read once from world state and cached by the executor.
    pub registry_address: Option<Address>,
    /// Gas limit of the nested lookup message
    pub lookup_gas: Gas,
    /// Size of the isolated gas pool funding each lookup
    pub lookup_pool: Gas,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            registry_address: Some(DEFAULT_REGISTRY_ADDRESS),
            lookup_gas: 0x99999,
            lookup_pool: Gas::MAX / 2,
        }
    }
}

/// Everything the executor needs besides the VM and the gas pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub gas: GasSchedule,
    pub rules: ChainRules,
    pub alias: AliasConfig,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML document; missing sections take their defaults
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str).context("Failed to parse executor config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read executor config {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string(self).context("Failed to serialize executor config")
    }

    pub fn with_gas_schedule(mut self, gas: GasSchedule) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_homestead_block(mut self, block: Option<BlockNumber>) -> Self {
        self.rules.homestead_block = block;
        self
    }

    pub fn with_registry_address(mut self, address: Address) -> Self {
        self.alias.registry_address = Some(address);
        self
    }

    /// Look the registry address up in world state instead
    pub fn with_registry_from_state(mut self) -> Self {
        self.alias.registry_address = None;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.gas.tx_create_base < self.gas.tx_base {
            return Err(
                "Contract creation base cost must not be below the plain base cost".to_string(),
            );
        }

        if self.alias.lookup_gas == 0 {
            return Err("Alias lookup gas must be greater than 0".to_string());
        }

        if self.alias.lookup_pool < self.alias.lookup_gas {
            return Err("Alias lookup pool must cover the lookup gas".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alias.lookup_gas, 0x99999);
        assert_eq!(config.alias.lookup_pool, Gas::MAX / 2);
        assert_eq!(
            config.alias.registry_address,
            Some(Address::from_hex("0000000000000000000000000000000000000011").unwrap())
        );
        assert!(config.rules.is_homestead(0));

        let from_state = ExecutorConfig::new().with_registry_from_state();
        assert_eq!(from_state.alias.registry_address, None);
    }

    #[test]
    fn test_homestead_activation() {
        let rules = ChainRules {
            homestead_block: Some(10),
        };
        assert!(!rules.is_homestead(9));
        assert!(rules.is_homestead(10));
        assert!(!ChainRules { homestead_block: None }.is_homestead(u64::MAX));
    }

    #[test]
    fn test_config_from_toml() {
        let config = ExecutorConfig::from_toml(
            r#"
            [gas]
            tx_base = 1

            [alias]
            registry_address = "0x0000000000000000000000000000000000000011"
            "#,
        )
        .unwrap();

        assert_eq!(config.gas.tx_base, 1);
        assert_eq!(config.gas.tx_data_non_zero, 68);
        assert_eq!(
            config.alias.registry_address,
            Some(Address::from_hex("0000000000000000000000000000000000000011").unwrap())
        );
        assert_eq!(config.rules, ChainRules::default());

        let back = ExecutorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ExecutorConfig::default();
        config.alias.lookup_pool = config.alias.lookup_gas - 1;
        assert!(config.validate().is_err());

        let mut config = ExecutorConfig::default();
        config.gas.tx_create_base = 1;
        assert!(config.validate().is_err());

        assert!(ExecutorConfig::from_toml("[alias]\nlookup_gas = 0").is_err());
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rules]\nhomestead_block = 5").unwrap();

        let config = ExecutorConfig::load(file.path()).unwrap();
        assert_eq!(config.rules.homestead_block, Some(5));

        assert!(ExecutorConfig::load("/nonexistent/executor.toml").is_err());
    }
}
