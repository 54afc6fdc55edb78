//! dApp permission records

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Request,
    Allow,
    Deny,
}

/// Connection request raised by a dApp origin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub key: String,
    pub origin: String,
    pub favicon_url: String,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub title: String,
    pub state: PermissionState,
    pub account_address: String,
}

impl PermissionRequest {
    /// Create a pending request for `origin` on `account_address`
    pub fn new(
        origin: impl Into<String>,
        chain_id: impl Into<String>,
        account_address: impl Into<String>,
    ) -> Result<Self> {
        let origin = origin.into();
        let chain_id = chain_id.into();
        let account_address = account_address.into();

        if origin.trim().is_empty() {
            return Err(Error::Validation("Origin cannot be empty".to_string()));
        }

        Ok(Self {
            key: Self::key_for(&origin, &account_address, &chain_id),
            origin,
            favicon_url: String::new(),
            chain_id,
            title: String::new(),
            state: PermissionState::Request,
            account_address,
        })
    }

    pub fn key_for(origin: &str, account_address: &str, chain_id: &str) -> String {
        format!("{}_{}_{}", origin, account_address, chain_id)
    }

    pub fn is_pending(&self) -> bool {
        self.state == PermissionState::Request
    }

    pub fn allow(&mut self) -> Result<()> {
        self.transition(PermissionState::Allow)
    }

    pub fn deny(&mut self) -> Result<()> {
        self.transition(PermissionState::Deny)
    }

    // A decided request stays decided.
    fn transition(&mut self, next: PermissionState) -> Result<()> {
        if !self.is_pending() {
            return Err(Error::Permission(format!(
                "Permission for {} already decided ({:?})",
                self.origin, self.state
            )));
        }
        self.state = next;
        Ok(())
    }
}
