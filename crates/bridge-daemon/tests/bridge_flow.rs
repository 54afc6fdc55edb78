//! Page → relay → background and back, all in one process

use anyhow::Result;
use bridge_client::{ClientError, PortTransport, ProviderClient, Relay, WindowBus, WindowTransport};
use bridge_core::models::{
    ChannelConfig, Eip1193ErrorCode, InternalNotification, PROVIDER_BRIDGE_TARGET,
    WINDOW_PROVIDER_TARGET,
};
use bridge_daemon::ipc::Attachment;
use bridge_daemon::{ApiHandler, ConfigManager, EventManager, PermissionManager, PortGate};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const ORIGIN: &str = "https://dapp.example";
const ACCOUNT: &str = "0x1111111111111111111111111111111111112222";

struct Bridge {
    client: ProviderClient<WindowTransport>,
    config: Arc<ConfigManager>,
    permissions: Arc<PermissionManager>,
    _relay: Relay,
    _attachment: Attachment,
    _temp_dir: TempDir,
}

async fn bridge() -> Result<Bridge> {
    let temp_dir = TempDir::new()?;

    let events = Arc::new(EventManager::new());
    let config = Arc::new(ConfigManager::with_dir(
        temp_dir.path().to_path_buf(),
        events.clone(),
    )?);
    config.set_selected_account(Some(ACCOUNT.to_string())).await?;
    let permissions = Arc::new(PermissionManager::new());

    let gate = Arc::new(PortGate::new(Arc::new(ApiHandler::new(
        config.clone(),
        permissions.clone(),
    ))));

    let bus = WindowBus::new(ORIGIN);
    let (content, background) = PortTransport::pair(ORIGIN, "chrome-extension://wallet");
    let attachment = gate.attach(&Arc::new(background), &events);
    let relay = Relay::new(bus.clone(), Arc::new(content), &ChannelConfig::default());

    let transport = WindowTransport::new(bus, WINDOW_PROVIDER_TARGET, PROVIDER_BRIDGE_TARGET);
    let client = ProviderClient::new(Arc::new(transport));

    Ok(Bridge {
        client,
        config,
        permissions,
        _relay: relay,
        _attachment: attachment,
        _temp_dir: temp_dir,
    })
}

async fn first_pending(permissions: &PermissionManager) -> String {
    loop {
        if let Some(request) = permissions.pending().await.into_iter().next() {
            return request.key;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_request_accounts_end_to_end() -> Result<()> {
    let bridge = bridge().await?;

    let call = bridge.client.call("eth_requestAccounts", Vec::new());
    let approve = async {
        let key = first_pending(&bridge.permissions).await;
        bridge.permissions.allow(&key).await
    };

    let (accounts, approved) = tokio::time::timeout(Duration::from_secs(2), async {
        tokio::join!(call, approve)
    })
    .await?;
    approved?;

    assert_eq!(accounts?, json!([ACCOUNT]));
    assert_eq!(bridge.client.pending_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_denied_request_is_user_rejection() -> Result<()> {
    let bridge = bridge().await?;

    let call = bridge.client.call("eth_requestAccounts", Vec::new());
    let deny = async {
        let key = first_pending(&bridge.permissions).await;
        bridge.permissions.deny(&key).await
    };

    let (result, denied) =
        tokio::time::timeout(Duration::from_secs(2), async { tokio::join!(call, deny) }).await?;
    denied?;

    match result {
        Err(ClientError::Provider(error)) => {
            assert_eq!(error.code(), Eip1193ErrorCode::UserRejectedRequest);
            assert_eq!(error.message(), "The user rejected the request.");
        }
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_unsupported_method_end_to_end() -> Result<()> {
    let bridge = bridge().await?;

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        bridge.client.call("eth_sign", vec![json!("0x00")]),
    )
    .await?;

    match result {
        Err(ClientError::Provider(error)) => {
            assert_eq!(error.code(), Eip1193ErrorCode::UnsupportedMethod);
            assert_eq!(error.data(), Some(&json!({"method": "eth_sign"})));
        }
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_resolve_independently() -> Result<()> {
    let bridge = bridge().await?;

    let (chain, config, accounts) = tokio::time::timeout(Duration::from_secs(2), async {
        tokio::join!(
            bridge.client.call("eth_chainId", Vec::new()),
            bridge.client.call("tally_getConfig", Vec::new()),
            bridge.client.call("eth_accounts", Vec::new()),
        )
    })
    .await?;

    assert_eq!(chain?, json!("0x1"));
    assert_eq!(config?, json!({"defaultWallet": false, "chainId": "0x1"}));
    assert_eq!(accounts?, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_wallet_notifications_reach_page() -> Result<()> {
    let bridge = bridge().await?;
    let mut notifications = bridge.client.subscribe_notifications();

    bridge.config.set_default_wallet(true).await?;
    let notification = tokio::time::timeout(Duration::from_secs(2), notifications.recv()).await??;
    assert_eq!(
        notification,
        InternalNotification::config(true, Some("0x1".to_string()))
    );

    bridge.config.set_selected_account(None).await?;
    let notification = tokio::time::timeout(Duration::from_secs(2), notifications.recv()).await??;
    assert_eq!(notification, InternalNotification::account_changed(vec![]));
    Ok(())
}
