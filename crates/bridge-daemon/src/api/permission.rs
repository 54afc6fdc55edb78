//! Permission API methods

use bridge_core::models::RequestParams;
use serde_json::Value;
use std::sync::Arc;

use super::{param, ApiError, Result};
use crate::permission::{PermissionManager, PermissionManagerError};

pub async fn pending(manager: &Arc<PermissionManager>) -> Result<Value> {
    Ok(serde_json::to_value(manager.pending().await)?)
}

pub async fn allow(manager: &Arc<PermissionManager>, params: &RequestParams) -> Result<Value> {
    let key: String = param(params, 0, "key")?;
    let record = manager.allow(&key).await.map_err(map_error)?;
    Ok(serde_json::to_value(record)?)
}

pub async fn deny(manager: &Arc<PermissionManager>, params: &RequestParams) -> Result<Value> {
    let key: String = param(params, 0, "key")?;
    let record = manager.deny(&key).await.map_err(map_error)?;
    Ok(serde_json::to_value(record)?)
}

fn map_error(error: PermissionManagerError) -> ApiError {
    match error {
        PermissionManagerError::NotFound(key) => {
            ApiError::InvalidParams(format!("Unknown permission {}", key))
        }
        other => ApiError::Permission(other.to_string()),
    }
}
