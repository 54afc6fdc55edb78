//! Configuration manager

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use bridge_core::{
    models::{BridgeConfig, InternalNotification},
    storage::{init_config_dir, ConfigStorage},
    Result as CoreResult,
};

use crate::event_manager::EventManager;

/// Config manager error
#[derive(Debug, thiserror::Error)]
pub enum ConfigManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] bridge_core::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigManagerError>;

/// Owns the bridge configuration and announces changes to connected pages
pub struct ConfigManager {
    storage: ConfigStorage,
    config: Arc<RwLock<BridgeConfig>>,
    event_manager: Arc<EventManager>,
}

impl ConfigManager {
    pub fn new(event_manager: Arc<EventManager>) -> CoreResult<Self> {
        let config_dir = init_config_dir()?;
        Self::with_dir(config_dir, event_manager)
    }

    pub fn with_dir(config_dir: PathBuf, event_manager: Arc<EventManager>) -> CoreResult<Self> {
        let storage = ConfigStorage::new(config_dir);

        // Load or create default config
        let config = storage.load()?;

        Ok(Self {
            storage,
            config: Arc::new(RwLock::new(config)),
            event_manager,
        })
    }

    pub async fn get(&self) -> BridgeConfig {
        self.config.read().await.clone()
    }

    pub async fn update(&self, config: BridgeConfig) -> Result<BridgeConfig> {
        config
            .validate()
            .map_err(|e| ConfigManagerError::Invalid(e.to_string()))?;

        self.storage.save(&config)?;

        let previous = {
            let mut current = self.config.write().await;
            std::mem::replace(&mut *current, config.clone())
        };

        if previous.default_wallet != config.default_wallet || previous.chain_id != config.chain_id
        {
            tracing::info!("Config changed, notifying pages");
            self.event_manager.emit(config_notification(&config));
        }

        if previous.selected_account != config.selected_account {
            tracing::info!("Selected account changed, notifying pages");
            self.event_manager.emit(account_notification(&config));
        }

        Ok(config)
    }

    pub async fn set_default_wallet(&self, default_wallet: bool) -> Result<BridgeConfig> {
        let mut config = self.get().await;
        config.default_wallet = default_wallet;
        self.update(config).await
    }

    pub async fn set_chain_id(&self, chain_id: impl Into<String>) -> Result<BridgeConfig> {
        let mut config = self.get().await;
        config.chain_id = chain_id.into();
        self.update(config).await
    }

    pub async fn set_selected_account(&self, account: Option<String>) -> Result<BridgeConfig> {
        let mut config = self.get().await;
        config.selected_account = account;
        self.update(config).await
    }

    pub async fn update_daemon_config(
        &self,
        socket_path: Option<String>,
        log_level: Option<String>,
    ) -> Result<BridgeConfig> {
        let mut config = self.get().await;

        if let Some(path) = socket_path {
            config.daemon.socket_path = path;
        }

        if let Some(level) = log_level {
            config.daemon.log_level = level;
        }

        self.update(config).await
    }

    pub async fn reset_to_default(&self) -> Result<BridgeConfig> {
        self.update(BridgeConfig::default()).await
    }
}

/// `tally_getConfig` notification for `config`
pub fn config_notification(config: &BridgeConfig) -> InternalNotification {
    InternalNotification::config(config.default_wallet, Some(config.chain_id.clone()))
}

/// `tally_accountChanged` notification for `config`
pub fn account_notification(config: &BridgeConfig) -> InternalNotification {
    InternalNotification::account_changed(config.selected_account.iter().cloned().collect())
}
