//! In-process LSP integration tests.
//!
//! These tests use tower-lsp's in-process testing capabilities to verify
//! the LSP server behavior without spawning subprocesses or parsing protocols.

use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc::Receiver;
use tower::Service;
use tower_lsp::LspService;
use tower_lsp::jsonrpc::Request;

use fsotbl_lsp::{FsoTableServer, UserConfig};

const VALID: &str = "#Armor Type
$Name: Standard
$Damage Type: Laser
+Calculation: Linear
+Value: 1.5
#End
";

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Value) -> Request {
    let req = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    });
    serde_json::from_value(req).expect("valid request")
}

/// Helper to create a JSON-RPC notification (no id)
fn make_notification(method: &str, params: Value) -> Request {
    let req = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    });
    serde_json::from_value(req).expect("valid notification")
}

fn did_open(uri: &str, text: &str) -> Request {
    make_notification(
        "textDocument/didOpen",
        json!({
            "textDocument": {
                "uri": uri,
                "languageId": "fso-table",
                "version": 1,
                "text": text
            }
        }),
    )
}

/// Start a server with default configuration, initialize it, and return the
/// service plus a channel of server-to-client notifications.
async fn start() -> (
    LspService<FsoTableServer>,
    Receiver<Request>,
    tokio::task::JoinHandle<()>,
) {
    let (mut service, socket) =
        LspService::new(|client| FsoTableServer::with_config(client, UserConfig::default()));
    let (mut notifications, _responses) = socket.split();

    // Spawn a task to drain notifications - this prevents blocking when server sends
    let (tx, rx) = tokio::sync::mpsc::channel::<Request>(32);
    let drain_task = tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            let _ = tx.send(notification).await;
        }
    });

    let init_request = make_request(
        1,
        "initialize",
        json!({
            "processId": null,
            "capabilities": {},
            "rootUri": null
        }),
    );
    let response: Option<tower_lsp::jsonrpc::Response> =
        service.call(init_request).await.expect("initialize failed");
    assert!(response.is_some(), "initialize should return a response");
    let _ = service
        .call(make_notification("initialized", json!({})))
        .await;

    (service, rx, drain_task)
}

/// Wait up to a second for the next `publishDiagnostics` for `uri` and
/// return its params.
async fn next_diagnostics(rx: &mut Receiver<Request>, uri: &str) -> Option<Value> {
    let timeout = tokio::time::sleep(tokio::time::Duration::from_secs(1));
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            Some(notification) = rx.recv() => {
                if notification.method() == "textDocument/publishDiagnostics"
                    && let Some(params) = notification.params()
                    && params.get("uri").and_then(|u| u.as_str()) == Some(uri)
                {
                    return Some(params.clone());
                }
            }
            _ = &mut timeout => {
                return None;
            }
        }
    }
}

fn messages(params: &Value) -> Vec<String> {
    params
        .get("diagnostics")
        .and_then(|d| d.as_array())
        .map(|diagnostics| {
            diagnostics
                .iter()
                .map(|d| d.get("message").and_then(|m| m.as_str()).unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_initialize_advertises_incremental_sync_and_hover() {
    let (mut service, socket) =
        LspService::new(|client| FsoTableServer::with_config(client, UserConfig::default()));
    let (_notifications, _responses) = socket.split();

    let response = service
        .call(make_request(
            1,
            "initialize",
            json!({ "processId": null, "capabilities": {}, "rootUri": null }),
        ))
        .await
        .expect("initialize failed")
        .expect("initialize should return a response");
    let result = response.result().expect("initialize should succeed");

    assert_eq!(result["capabilities"]["textDocumentSync"], json!(2));
    assert_eq!(result["capabilities"]["hoverProvider"], json!(true));
    assert_eq!(result["capabilities"]["positionEncoding"], json!("utf-16"));
    assert_eq!(result["serverInfo"]["name"], json!("fsotbl-lsp"));
}

#[tokio::test]
async fn test_no_diagnostics_for_valid_document() {
    let (mut service, mut rx, drain_task) = start().await;

    let _ = service.call(did_open("file:///valid/armor.tbl", VALID)).await;
    let params = next_diagnostics(&mut rx, "file:///valid/armor.tbl").await;

    drain_task.abort();

    let params = params.expect("Should have received diagnostics for our document");
    assert!(messages(&params).is_empty(), "Valid document should have no diagnostics");
    assert_eq!(params.get("version"), Some(&json!(1)));
}

#[tokio::test]
async fn test_diagnostics_published_for_missing_end() {
    let (mut service, mut rx, drain_task) = start().await;

    let _ = service
        .call(did_open(
            "file:///broken/armor.tbl",
            "#Armor Type\n$Name: Standard\n",
        ))
        .await;
    let params = next_diagnostics(&mut rx, "file:///broken/armor.tbl").await;

    drain_task.abort();

    let params = params.expect("Server should publish diagnostics for a broken document");
    let diagnostics = params["diagnostics"].as_array().cloned().unwrap_or_default();
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    let diagnostic = &diagnostics[0];
    assert!(
        diagnostic["message"].as_str().unwrap_or("").contains("#End"),
        "Diagnostic should name the missing terminator, got: {}",
        diagnostic["message"]
    );
    assert_eq!(diagnostic["code"], json!("missing-section-end"));
    assert_eq!(diagnostic["source"], json!("fsotbl"));
    assert_eq!(diagnostic["severity"], json!(1));
}

#[tokio::test]
async fn test_incremental_edit_fixes_document() {
    let (mut service, mut rx, drain_task) = start().await;
    let uri = "file:///edit/armor.tbl";

    let _ = service
        .call(did_open(uri, "#Armor Type\n$Name: Standard\n+Value: x\n"))
        .await;
    let first = next_diagnostics(&mut rx, uri).await;

    // Drop the stray line and close the section.
    let did_change = make_notification(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": uri, "version": 2 },
            "contentChanges": [
                {
                    "range": {
                        "start": { "line": 2, "character": 0 },
                        "end": { "line": 3, "character": 0 }
                    },
                    "text": ""
                },
                {
                    "range": {
                        "start": { "line": 2, "character": 0 },
                        "end": { "line": 2, "character": 0 }
                    },
                    "text": "#End\n"
                }
            ]
        }),
    );
    let _ = service.call(did_change).await;
    let second = next_diagnostics(&mut rx, uri).await;

    drain_task.abort();

    let first = first.expect("diagnostics for the first version");
    assert!(!messages(&first).is_empty(), "First version has errors");
    let second = second.expect("diagnostics for the edited version");
    assert_eq!(second.get("version"), Some(&json!(2)));
    assert!(
        messages(&second).is_empty(),
        "Edited document should be clean, got: {:?}",
        messages(&second)
    );
}

#[tokio::test]
async fn test_hover_on_label() {
    let (mut service, mut rx, drain_task) = start().await;
    let uri = "file:///hover/armor.tbl";

    let _ = service.call(did_open(uri, VALID)).await;
    let published = next_diagnostics(&mut rx, uri).await;
    assert!(published.is_some(), "analysis should finish before hovering");

    let hover = service
        .call(make_request(
            2,
            "textDocument/hover",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": 4, "character": 2 }
            }),
        ))
        .await
        .expect("hover failed")
        .expect("hover should return a response");

    let miss = service
        .call(make_request(
            3,
            "textDocument/hover",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": 4, "character": 10 }
            }),
        ))
        .await
        .expect("hover failed")
        .expect("hover should return a response");

    drain_task.abort();

    let result = hover.result().expect("hover should succeed");
    let text = result["contents"]["value"].as_str().unwrap_or("");
    assert!(text.starts_with("**+Value** (float)"), "got: {}", text);
    assert_eq!(result["range"]["start"], json!({ "line": 4, "character": 0 }));

    assert_eq!(miss.result(), Some(&Value::Null));
}

#[tokio::test]
async fn test_close_clears_diagnostics() {
    let (mut service, mut rx, drain_task) = start().await;
    let uri = "file:///close/armor.tbl";

    let _ = service.call(did_open(uri, "#Armor Type\n")).await;
    let opened = next_diagnostics(&mut rx, uri).await;

    let _ = service
        .call(make_notification(
            "textDocument/didClose",
            json!({ "textDocument": { "uri": uri } }),
        ))
        .await;
    let closed = next_diagnostics(&mut rx, uri).await;

    drain_task.abort();

    assert!(!messages(&opened.expect("diagnostics after open")).is_empty());
    let closed = closed.expect("diagnostics after close");
    assert!(messages(&closed).is_empty());
    assert_eq!(closed.get("version"), None);
}
