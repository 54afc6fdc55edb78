//! Account API methods

use bridge_core::models::PermissionState;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiError, RequestContext, Result};
use crate::config::ConfigManager;
use crate::permission::PermissionManager;

/// `eth_accounts`: the selected account if the origin may see it, else `[]`
pub async fn accounts(
    config: &Arc<ConfigManager>,
    permissions: &Arc<PermissionManager>,
    ctx: &RequestContext,
) -> Result<Value> {
    let config = config.get().await;
    let Some(account) = config.selected_account else {
        return Ok(json!([]));
    };

    if ctx.is_operator() || permissions.is_allowed(&ctx.origin, &account, &config.chain_id).await {
        Ok(json!([account]))
    } else {
        Ok(json!([]))
    }
}

/// `eth_requestAccounts`: ask for access and wait until it is decided
pub async fn request_accounts(
    config: &Arc<ConfigManager>,
    permissions: &Arc<PermissionManager>,
    ctx: &RequestContext,
) -> Result<Value> {
    let config = config.get().await;
    let account = config.selected_account.ok_or(ApiError::NoAccount)?;

    if ctx.is_operator() {
        return Ok(json!([account]));
    }

    let request = permissions
        .request_permission(&ctx.origin, &config.chain_id, &account)
        .await
        .map_err(|e| ApiError::Permission(e.to_string()))?;

    let state = match request.state {
        PermissionState::Request => {
            tracing::info!("Waiting for a decision on {}", request.key);
            permissions
                .wait_for_decision(&request.key)
                .await
                .map_err(|e| ApiError::Permission(e.to_string()))?
        }
        decided => decided,
    };

    match state {
        PermissionState::Allow => Ok(json!([account])),
        _ => Err(ApiError::Rejected),
    }
}
