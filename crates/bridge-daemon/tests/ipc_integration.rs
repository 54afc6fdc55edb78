use anyhow::Result;
use bridge_core::validate;
use bridge_daemon::ipc::{split, MessageReader, MessageWriter};
use bridge_daemon::{ApiHandler, ConfigManager, EventManager, IpcServer, PermissionManager, PortGate};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::UnixStream;

const ORIGIN: &str = "https://dapp.example";
const ACCOUNT: &str = "0x1111111111111111111111111111111111112222";

async fn start_daemon(temp_dir: &TempDir) -> Result<(String, tokio::task::JoinHandle<()>)> {
    let socket_path = temp_dir.path().join("bridge_test.sock");
    let socket_str = socket_path.to_string_lossy().to_string();

    let event_manager = Arc::new(EventManager::new());
    let config_manager = Arc::new(ConfigManager::with_dir(
        temp_dir.path().join("config"),
        event_manager.clone(),
    )?);
    config_manager
        .set_selected_account(Some(ACCOUNT.to_string()))
        .await?;

    let api_handler = Arc::new(ApiHandler::new(
        config_manager,
        Arc::new(PermissionManager::new()),
    ));
    let gate = Arc::new(PortGate::new(api_handler));
    let ipc_server = Arc::new(IpcServer::new(socket_str.clone(), gate, event_manager));

    let server_handle = tokio::spawn(async move {
        ipc_server.start().await.unwrap();
    });

    wait_for_socket(&socket_path).await;
    Ok((socket_str, server_handle))
}

async fn wait_for_socket(socket_path: &Path) {
    let mut retries = 0;
    while !socket_path.exists() && retries < 50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        retries += 1;
    }
    if !socket_path.exists() {
        panic!("Socket was not created");
    }
}

async fn connect(socket: &str, origin: Option<&str>) -> Result<(MessageReader, MessageWriter)> {
    let (reader, mut writer) = split(UnixStream::connect(socket).await?);
    if let Some(origin) = origin {
        writer.write_message(&json!({ "origin": origin })).await?;
    }
    Ok((reader, writer))
}

async fn call(
    reader: &mut MessageReader,
    writer: &mut MessageWriter,
    id: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    writer
        .write_message(&json!({"id": id, "request": {"method": method, "params": params}}))
        .await?;
    read_response(reader, id).await
}

/// Skip notifications until the response for `id` shows up
async fn read_response(reader: &mut MessageReader, id: &str) -> Result<Value> {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), reader.read_message()).await??;
        if validate::is_port_response(&message) && message["id"] == id {
            assert_eq!(message["jsonrpc"], "2.0");
            return Ok(message["result"].clone());
        }
    }
}

#[tokio::test]
async fn test_provider_methods_over_socket() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (socket, server_handle) = start_daemon(&temp_dir).await?;
    let (mut reader, mut writer) = connect(&socket, Some(ORIGIN)).await?;

    let chain = call(&mut reader, &mut writer, "1", "eth_chainId", json!([])).await?;
    assert_eq!(chain, "0x1");

    let config = call(&mut reader, &mut writer, "2", "tally_getConfig", json!([])).await?;
    assert_eq!(config, json!({"defaultWallet": false, "chainId": "0x1"}));

    let accounts = call(&mut reader, &mut writer, "3", "eth_accounts", json!([])).await?;
    assert_eq!(accounts, json!([]));

    let error = call(&mut reader, &mut writer, "4", "eth_signTypedData_v4", json!({})).await?;
    assert!(validate::is_eip1193_error(&error));
    assert_eq!(error["code"], 4200);

    // pages cannot reach the operator methods
    let error = call(&mut reader, &mut writer, "5", "wallet_setChainId", json!(["0x89"])).await?;
    assert_eq!(error["code"], 4100);

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_malformed_input_is_dropped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (socket, server_handle) = start_daemon(&temp_dir).await?;

    let stream = UnixStream::connect(&socket).await?;
    let (mut reader, mut writer) = split(stream);

    writer.write_message(&json!({"id": "1", "request": "eth_chainId"})).await?;
    writer.write_message(&json!({"request": {"method": "eth_chainId"}})).await?;
    writer.write_message(&json!(["not", "a", "request"])).await?;

    let chain = call(&mut reader, &mut writer, "2", "eth_chainId", json!([])).await?;
    assert_eq!(chain, "0x1");

    // nothing else is waiting on the socket
    let extra = tokio::time::timeout(Duration::from_millis(100), reader.read_message()).await;
    assert!(extra.is_err());

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_request_accounts_approved_by_operator() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (socket, server_handle) = start_daemon(&temp_dir).await?;

    let (mut page_reader, mut page_writer) = connect(&socket, Some(ORIGIN)).await?;
    let (mut op_reader, mut op_writer) = connect(&socket, None).await?;

    page_writer
        .write_message(&json!({"id": "req-1", "request": {"method": "eth_requestAccounts"}}))
        .await?;

    let mut attempt = 0;
    let pending = loop {
        let id = format!("pending-{}", attempt);
        let pending = call(
            &mut op_reader,
            &mut op_writer,
            &id,
            "wallet_getPendingPermissions",
            json!([]),
        )
        .await?;
        if pending.as_array().is_some_and(|p| !p.is_empty()) {
            break pending;
        }
        attempt += 1;
        assert!(attempt < 50, "permission request never showed up");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(pending[0]["origin"], ORIGIN);
    assert_eq!(pending[0]["accountAddress"], ACCOUNT);

    let key = pending[0]["key"].clone();
    let record = call(
        &mut op_reader,
        &mut op_writer,
        "allow",
        "wallet_allowPermission",
        json!([key]),
    )
    .await?;
    assert_eq!(record["state"], "allow");

    let accounts = read_response(&mut page_reader, "req-1").await?;
    assert_eq!(accounts, json!([ACCOUNT]));

    let accounts =
        call(&mut page_reader, &mut page_writer, "req-2", "eth_accounts", json!([])).await?;
    assert_eq!(accounts, json!([ACCOUNT]));

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_config_change_notifies_pages() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (socket, server_handle) = start_daemon(&temp_dir).await?;

    let (mut page_reader, mut page_writer) = connect(&socket, Some(ORIGIN)).await?;
    let (mut op_reader, mut op_writer) = connect(&socket, None).await?;

    // both connections are attached once they have answered a call
    call(&mut page_reader, &mut page_writer, "ping", "eth_chainId", json!([])).await?;

    let chain = call(
        &mut op_reader,
        &mut op_writer,
        "1",
        "wallet_setChainId",
        json!({"chainId": "0x89"}),
    )
    .await?;
    assert_eq!(chain, "0x89");

    let notification =
        tokio::time::timeout(Duration::from_secs(2), page_reader.read_message()).await??;
    assert!(validate::is_tally_config_payload(&notification));
    assert_eq!(notification["id"], "tallyHo");
    assert_eq!(notification["chainId"], "0x89");

    server_handle.abort();
    Ok(())
}
