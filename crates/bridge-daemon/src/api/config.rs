//! Config API methods

use bridge_core::models::{RequestParams, TallyConfigPayload};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{param, ApiError, Result};
use crate::config::ConfigManager;

/// `tally_getConfig`: the wallet settings pages care about
pub async fn get(manager: &Arc<ConfigManager>) -> Result<Value> {
    let config = manager.get().await;
    let payload = TallyConfigPayload {
        default_wallet: config.default_wallet,
        chain_id: Some(config.chain_id),
        should_reload: None,
        extra: Map::new(),
    };
    Ok(serde_json::to_value(payload)?)
}

/// `eth_chainId`
pub async fn chain_id(manager: &Arc<ConfigManager>) -> Result<Value> {
    Ok(Value::String(manager.get().await.chain_id))
}

pub async fn set_chain_id(manager: &Arc<ConfigManager>, params: &RequestParams) -> Result<Value> {
    let chain_id: String = param(params, 0, "chainId")?;

    let config = manager
        .set_chain_id(chain_id)
        .await
        .map_err(|e| ApiError::Config(e.to_string()))?;

    Ok(Value::String(config.chain_id))
}

pub async fn set_default_wallet(
    manager: &Arc<ConfigManager>,
    params: &RequestParams,
) -> Result<Value> {
    let default_wallet: bool = param(params, 0, "defaultWallet")?;

    let config = manager
        .set_default_wallet(default_wallet)
        .await
        .map_err(|e| ApiError::Config(e.to_string()))?;

    Ok(Value::Bool(config.default_wallet))
}

pub async fn set_selected_account(
    manager: &Arc<ConfigManager>,
    params: &RequestParams,
) -> Result<Value> {
    let account: Option<String> = param(params, 0, "address")?;

    let config = manager
        .set_selected_account(account)
        .await
        .map_err(|e| ApiError::Config(e.to_string()))?;

    Ok(serde_json::to_value(config.selected_account)?)
}
