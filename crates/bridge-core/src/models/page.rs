//! In-page navigation targets the popup may be routed to

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllowedPage {
    SignTransaction,
    AddEvmChain,
    DappPermission,
    SignData,
    PersonalSign,
    SignPlume,
}

impl AllowedPage {
    pub const ALL: [Self; 6] = [
        Self::SignTransaction,
        Self::AddEvmChain,
        Self::DappPermission,
        Self::SignData,
        Self::PersonalSign,
        Self::SignPlume,
    ];

    pub const fn path(&self) -> &'static str {
        match self {
            Self::SignTransaction => "/sign-transaction",
            Self::AddEvmChain => "/add-evm-chain",
            Self::DappPermission => "/dapp-permission",
            Self::SignData => "/sign-data",
            Self::PersonalSign => "/personal-sign",
            Self::SignPlume => "/sign-plume",
        }
    }

    /// Exact match only; anything outside the closed set is rejected.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page| page.path() == path)
    }
}

impl fmt::Display for AllowedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
