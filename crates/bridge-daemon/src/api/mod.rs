//! API handlers

pub mod account;
pub mod config;
pub mod permission;

use bridge_core::models::{ProviderError, RequestParams, RpcRequest};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ConfigManager;
use crate::permission::PermissionManager;

/// Origin reported for connections that did not announce one. Only this
/// origin may call the `wallet_*` methods.
pub const OPERATOR_ORIGIN: &str = "ipc://local";

/// API error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Origin {0} is not allowed to call this method")]
    Forbidden(String),

    #[error("No account selected")]
    NoAccount,

    #[error("Request rejected")]
    Rejected,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ApiError> for ProviderError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::MethodNotFound(method) => {
                ProviderError::unsupported_method().with_data(json!({ "method": method }))
            }
            ApiError::Forbidden(_) | ApiError::NoAccount => ProviderError::unauthorized(),
            ApiError::Rejected => ProviderError::user_rejected(),
            ApiError::InvalidParams(_) | ApiError::Config(_) | ApiError::Permission(_) => {
                let reason = error.to_string();
                ProviderError::unsupported_method().with_data(json!({ "reason": reason }))
            }
            // internal, never forwarded
            ApiError::Json(_) => ProviderError::unsupported_method(),
        }
    }
}

/// Who sent a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub origin: String,
}

impl RequestContext {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    pub fn is_operator(&self) -> bool {
        self.origin == OPERATOR_ORIGIN
    }
}

/// Trusted side of the bridge. Whatever goes wrong in here leaves the
/// boundary as a [`ProviderError`].
pub trait RequestHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        request: RpcRequest,
    ) -> BoxFuture<'a, std::result::Result<Value, ProviderError>>;
}

/// Main API handler that routes requests to appropriate handlers
pub struct ApiHandler {
    config_manager: Arc<ConfigManager>,
    permission_manager: Arc<PermissionManager>,
}

impl ApiHandler {
    pub fn new(
        config_manager: Arc<ConfigManager>,
        permission_manager: Arc<PermissionManager>,
    ) -> Self {
        Self {
            config_manager,
            permission_manager,
        }
    }

    pub async fn dispatch(&self, ctx: &RequestContext, request: RpcRequest) -> Result<Value> {
        let params = request.params;
        match request.method.as_str() {
            // Provider methods
            "tally_getConfig" => config::get(&self.config_manager).await,
            "eth_chainId" => config::chain_id(&self.config_manager).await,
            "eth_accounts" => {
                account::accounts(&self.config_manager, &self.permission_manager, ctx).await
            }
            "eth_requestAccounts" => {
                account::request_accounts(&self.config_manager, &self.permission_manager, ctx)
                    .await
            }

            // Operator methods
            "wallet_setChainId" => {
                require_operator(ctx)?;
                config::set_chain_id(&self.config_manager, &params).await
            }
            "wallet_setDefaultWallet" => {
                require_operator(ctx)?;
                config::set_default_wallet(&self.config_manager, &params).await
            }
            "wallet_setSelectedAccount" => {
                require_operator(ctx)?;
                config::set_selected_account(&self.config_manager, &params).await
            }
            "wallet_getPendingPermissions" => {
                require_operator(ctx)?;
                permission::pending(&self.permission_manager).await
            }
            "wallet_allowPermission" => {
                require_operator(ctx)?;
                permission::allow(&self.permission_manager, &params).await
            }
            "wallet_denyPermission" => {
                require_operator(ctx)?;
                permission::deny(&self.permission_manager, &params).await
            }

            // Unknown method
            method => Err(ApiError::MethodNotFound(method.to_string())),
        }
    }
}

impl RequestHandler for ApiHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        request: RpcRequest,
    ) -> BoxFuture<'a, std::result::Result<Value, ProviderError>> {
        Box::pin(async move {
            let method = request.method.clone();
            self.dispatch(ctx, request).await.map_err(|e| {
                tracing::debug!("{} from {} failed: {}", method, ctx.origin, e);
                ProviderError::from(e)
            })
        })
    }
}

fn require_operator(ctx: &RequestContext) -> Result<()> {
    if ctx.is_operator() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(ctx.origin.clone()))
    }
}

/// Read one argument, by position or by name
pub(crate) fn param<T: DeserializeOwned>(
    params: &RequestParams,
    index: usize,
    name: &str,
) -> Result<T> {
    let value = match params {
        RequestParams::Positional(values) => values.get(index),
        RequestParams::Named(map) => map.get(name),
    }
    .ok_or_else(|| ApiError::InvalidParams(format!("Missing {}", name)))?;

    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::InvalidParams(format!("{}: {}", name, e)))
}
