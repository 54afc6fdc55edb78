//! Bridge configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Target the page-side provider listens for
pub const WINDOW_PROVIDER_TARGET: &str = "tally-window-provider";

/// Target the content-script relay listens for
pub const PROVIDER_BRIDGE_TARGET: &str = "tally-provider-bridge";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    pub version: String,
    pub default_wallet: bool,
    pub chain_id: String,
    pub selected_account: Option<String>,
    pub daemon: DaemonConfig,
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    pub socket_path: String,
    pub log_level: String,
}

/// Opaque channel markers used to tell the two window endpoints apart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub window_provider_target: String,
    pub provider_bridge_target: String,
}

impl BridgeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_hex_quantity(&self.chain_id) {
            return Err(Error::Validation(format!(
                "Invalid chain id '{}'. Must be a 0x-prefixed hex quantity",
                self.chain_id
            )));
        }

        if let Some(ref account) = self.selected_account {
            if account.trim().is_empty() {
                return Err(Error::Validation(
                    "Selected account cannot be empty".to_string(),
                ));
            }
        }

        self.daemon.validate()?;
        self.channel.validate()?;
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            default_wallet: false,
            chain_id: "0x1".to_string(),
            selected_account: None,
            daemon: DaemonConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Validate daemon configuration
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.trim().is_empty() {
            return Err(Error::Validation("Socket path cannot be empty".to_string()));
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            )));
        }

        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/provider-bridge.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ChannelConfig {
    /// Validate channel targets
    pub fn validate(&self) -> Result<()> {
        if self.window_provider_target.is_empty() || self.provider_bridge_target.is_empty() {
            return Err(Error::Validation(
                "Channel targets cannot be empty".to_string(),
            ));
        }

        // a shared target would let the relay answer its own requests
        if self.window_provider_target == self.provider_bridge_target {
            return Err(Error::Validation(
                "Window provider and provider bridge targets must differ".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            window_provider_target: WINDOW_PROVIDER_TARGET.to_string(),
            provider_bridge_target: PROVIDER_BRIDGE_TARGET.to_string(),
        }
    }
}

fn is_hex_quantity(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.version, "1.0.0");
        assert!(config.selected_account.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chain_id_validation() {
        let mut config = BridgeConfig::default();

        config.chain_id = "1".to_string();
        assert!(config.validate().is_err());

        config.chain_id = "0x".to_string();
        assert!(config.validate().is_err());

        config.chain_id = "0x89".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_daemon_config_validation() {
        let mut config = DaemonConfig::default();
        assert!(config.validate().is_ok());

        config.socket_path = "".to_string();
        assert!(config.validate().is_err());

        config.socket_path = "/tmp/test.sock".to_string();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_targets_must_differ() {
        let config = ChannelConfig {
            window_provider_target: "same".to_string(),
            provider_bridge_target: "same".to_string(),
        };
        assert!(config.validate().is_err());
        assert!(ChannelConfig::default().validate().is_ok());
    }
}
