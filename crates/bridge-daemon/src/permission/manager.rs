//! dApp connection permissions

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use bridge_core::models::{PermissionRequest, PermissionState};

#[derive(Debug, thiserror::Error)]
pub enum PermissionManagerError {
    #[error("Permission not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] bridge_core::Error),

    #[error("Permission manager shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, PermissionManagerError>;

/// Keeps one [`PermissionRequest`] per origin, account and chain.
///
/// Every decision bumps a watch counter so callers parked in
/// [`PermissionManager::wait_for_decision`] re-check their record.
pub struct PermissionManager {
    records: Arc<RwLock<HashMap<String, PermissionRequest>>>,
    decisions: watch::Sender<u64>,
}

impl PermissionManager {
    pub fn new() -> Self {
        let (decisions, _) = watch::channel(0);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            decisions,
        }
    }

    /// Current record for the triple, pending requests included
    pub async fn get(
        &self,
        origin: &str,
        account_address: &str,
        chain_id: &str,
    ) -> Option<PermissionRequest> {
        let key = PermissionRequest::key_for(origin, account_address, chain_id);
        self.records.read().await.get(&key).cloned()
    }

    pub async fn is_allowed(&self, origin: &str, account_address: &str, chain_id: &str) -> bool {
        matches!(
            self.get(origin, account_address, chain_id).await,
            Some(PermissionRequest {
                state: PermissionState::Allow,
                ..
            })
        )
    }

    /// Record a pending request unless one already exists for the triple.
    /// Returns the record as it stands afterwards.
    pub async fn request_permission(
        &self,
        origin: &str,
        chain_id: &str,
        account_address: &str,
    ) -> Result<PermissionRequest> {
        let request = PermissionRequest::new(origin, chain_id, account_address)?;

        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&request.key) {
            return Ok(existing.clone());
        }

        tracing::info!("Permission requested by {}", origin);
        records.insert(request.key.clone(), request.clone());
        Ok(request)
    }

    /// Allow a triple without going through a pending request
    pub async fn grant(
        &self,
        origin: &str,
        chain_id: &str,
        account_address: &str,
    ) -> Result<PermissionRequest> {
        let request = self
            .request_permission(origin, chain_id, account_address)
            .await?;
        if request.is_pending() {
            return self.allow(&request.key).await;
        }
        Ok(request)
    }

    pub async fn allow(&self, key: &str) -> Result<PermissionRequest> {
        self.decide(key, PermissionState::Allow).await
    }

    pub async fn deny(&self, key: &str) -> Result<PermissionRequest> {
        self.decide(key, PermissionState::Deny).await
    }

    async fn decide(&self, key: &str, state: PermissionState) -> Result<PermissionRequest> {
        let decided = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(key)
                .ok_or_else(|| PermissionManagerError::NotFound(key.to_string()))?;

            match state {
                PermissionState::Allow => record.allow()?,
                PermissionState::Deny => record.deny()?,
                PermissionState::Request => {}
            }
            record.clone()
        };

        tracing::info!("Permission {} for {}", key, state_name(decided.state));
        self.decisions.send_modify(|count| *count += 1);
        Ok(decided)
    }

    /// Requests still waiting for a decision
    pub async fn pending(&self) -> Vec<PermissionRequest> {
        let mut pending: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.key.cmp(&b.key));
        pending
    }

    /// Wait until the record for `key` leaves the request state
    pub async fn wait_for_decision(&self, key: &str) -> Result<PermissionState> {
        let mut decisions = self.decisions.subscribe();
        loop {
            let state = self
                .records
                .read()
                .await
                .get(key)
                .map(|record| record.state)
                .ok_or_else(|| PermissionManagerError::NotFound(key.to_string()))?;

            if state != PermissionState::Request {
                return Ok(state);
            }

            decisions
                .changed()
                .await
                .map_err(|_| PermissionManagerError::Closed)?;
        }
    }
}

impl Default for PermissionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn state_name(state: PermissionState) -> &'static str {
    match state {
        PermissionState::Request => "pending",
        PermissionState::Allow => "allowed",
        PermissionState::Deny => "denied",
    }
}
