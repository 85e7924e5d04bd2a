//! End-to-end tests over the JSON-RPC transport.
//!
//! The external linter is a shell one-liner, so these only run on unix.
#![cfg(unix)]

mod common;

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{DuplexStream, WriteHalf};
use tokio::sync::mpsc::UnboundedReceiver;
use tower_lsp::lsp_types::Url;

use common::{recv_matching, recv_msg, send_msg};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Reports one `tag-close` error on line 2 for every input.
const FAKE_LINTER: &str = r#"cat >/dev/null; echo '[{"ruleName":"tag-close","type":"error","message":"Tag is not closed","node":{"location":{"line":2,"col":3}}}]'"#;

/// Reports one `attr-quotes` warning on line 1 for every input.
const OTHER_LINTER: &str = r#"cat >/dev/null; echo '[{"ruleName":"attr-quotes","type":"warn","message":"Use double quotes","node":{"location":{"line":1,"col":1}}}]'"#;

struct TestClient {
    writer: WriteHalf<DuplexStream>,
    rx: UnboundedReceiver<Value>,
    next_id: i64,
}

impl TestClient {
    async fn start(initialization_options: Value) -> Self {
        Self::start_in(None, initialization_options).await
    }

    async fn start_in(root: Option<&Path>, initialization_options: Value) -> Self {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, writer) = tokio::io::split(client_io);

        let (service, socket) = htmllinter_lsp::build_service();
        tokio::spawn(async move {
            tower_lsp::Server::new(server_read, server_write, socket)
                .serve(service)
                .await;
        });

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut reader = tokio::io::BufReader::new(client_read);
            while let Some(msg) = recv_msg(&mut reader).await {
                let value: Value = serde_json::from_str(&msg).unwrap();
                if tx.send(value).is_err() {
                    break;
                }
            }
        });

        let mut client = Self {
            writer,
            rx,
            next_id: 1,
        };

        client
            .request(
                "initialize",
                json!({
                    "capabilities": {},
                    "rootUri": root.map(|path| Url::from_directory_path(path).unwrap()),
                    "initializationOptions": initialization_options
                }),
            )
            .await;
        client.notify("initialized", json!({})).await;
        client
    }

    async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let msg = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        send_msg(&mut self.writer, &msg.to_string()).await;

        recv_matching(&mut self.rx, TIMEOUT, |m| m["id"] == json!(id))
            .await
            .unwrap_or_else(|| panic!("no response to {}", method))
    }

    async fn notify(&mut self, method: &str, params: Value) {
        let msg = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        send_msg(&mut self.writer, &msg.to_string()).await;
    }

    async fn open(&mut self, uri: &str, language_id: &str, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": { "uri": uri, "languageId": language_id, "version": 1, "text": text }
            }),
        )
        .await;
    }

    async fn diagnostics_for(&mut self, uri: &str) -> Vec<Value> {
        let msg = recv_matching(&mut self.rx, TIMEOUT, |m| {
            m["method"] == "textDocument/publishDiagnostics" && m["params"]["uri"] == uri
        })
        .await
        .unwrap_or_else(|| panic!("no diagnostics published for {}", uri));
        msg["params"]["diagnostics"].as_array().cloned().unwrap()
    }

    /// Waits for a diagnostics publish for `uri` whose first diagnostic
    /// comes from `rule`.
    async fn diagnostics_from_rule(&mut self, uri: &str, rule: &str) -> Vec<Value> {
        let msg = recv_matching(&mut self.rx, TIMEOUT, |m| {
            m["method"] == "textDocument/publishDiagnostics"
                && m["params"]["uri"] == uri
                && m["params"]["diagnostics"][0]["code"] == rule
        })
        .await
        .unwrap_or_else(|| panic!("no {} diagnostics published for {}", rule, uri));
        msg["params"]["diagnostics"].as_array().cloned().unwrap()
    }

    /// Returns the URI of the next diagnostics publish, whatever the document.
    async fn next_published_uri(&mut self) -> String {
        let msg = recv_matching(&mut self.rx, TIMEOUT, |m| {
            m["method"] == "textDocument/publishDiagnostics"
        })
        .await
        .expect("no diagnostics published");
        msg["params"]["uri"].as_str().unwrap().to_string()
    }

    async fn change(&mut self, uri: &str, version: i32, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }]
            }),
        )
        .await;
    }

    async fn save(&mut self, uri: &str, text: &str) {
        self.notify(
            "textDocument/didSave",
            json!({ "textDocument": { "uri": uri }, "text": text }),
        )
        .await;
    }
}

fn linter_settings(script: &str) -> Value {
    json!({ "linter": { "command": "sh", "args": ["-c", script] } })
}

fn fake_linter_options() -> Value {
    json!({ "htmllinter": linter_settings(FAKE_LINTER) })
}

#[tokio::test]
async fn initialize_reports_full_sync() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let (client_read, mut writer) = tokio::io::split(client_io);

    let (service, socket) = htmllinter_lsp::build_service();
    tokio::spawn(async move {
        tower_lsp::Server::new(server_read, server_write, socket)
            .serve(service)
            .await;
    });

    let init = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{}}}"#;
    send_msg(&mut writer, init).await;

    let mut reader = tokio::io::BufReader::new(client_read);
    let response: Value = serde_json::from_str(&recv_msg(&mut reader).await.unwrap()).unwrap();

    assert_eq!(response["result"]["serverInfo"]["name"], "htmllinter-lsp");
    assert_eq!(
        response["result"]["capabilities"]["textDocumentSync"]["change"],
        json!(1)
    );
    assert_eq!(
        response["result"]["capabilities"]["textDocumentSync"]["save"]["includeText"],
        json!(true)
    );
}

#[tokio::test]
async fn open_html_publishes_line_diagnostics() {
    let mut client = TestClient::start(fake_linter_options()).await;
    let uri = "file:///tmp/htmllinter-e2e/index.html";

    client.open(uri, "html", "<html>\n  <div>\n</html>\n").await;
    let diagnostics = client.diagnostics_for(uri).await;

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(
        diagnostic["message"],
        "htmllinter/tag-close: Tag is not closed [2:3]"
    );
    assert_eq!(diagnostic["severity"], json!(1));
    assert_eq!(diagnostic["source"], "htmllinter");
    assert_eq!(diagnostic["code"], "tag-close");
    assert_eq!(
        diagnostic["range"],
        json!({ "start": { "line": 1, "character": 0 }, "end": { "line": 1, "character": 7 } })
    );
}

#[tokio::test]
async fn close_clears_published_diagnostics() {
    let mut client = TestClient::start(fake_linter_options()).await;
    let uri = "file:///tmp/htmllinter-e2e/close.html";

    client.open(uri, "html", "<p>\n<div>\n").await;
    assert_eq!(client.diagnostics_for(uri).await.len(), 1);

    client
        .notify(
            "textDocument/didClose",
            json!({ "textDocument": { "uri": uri } }),
        )
        .await;
    assert!(client.diagnostics_for(uri).await.is_empty());
}

#[tokio::test]
async fn visible_documents_are_linted_regardless_of_language() {
    let mut client = TestClient::start(fake_linter_options()).await;
    let css = "file:///tmp/htmllinter-e2e/site.css";

    client.open(css, "css", "p {}\ndiv {}\n").await;
    client
        .notify(
            "htmllinter/didChangeVisibleDocuments",
            json!({ "uris": [css] }),
        )
        .await;

    assert_eq!(client.diagnostics_for(css).await.len(), 1);
}

#[tokio::test]
async fn missing_linter_is_reported_to_the_user() {
    let options = json!({ "linter": { "command": "htmllinter-definitely-missing-program" } });
    let mut client = TestClient::start(options).await;

    client
        .open("file:///tmp/htmllinter-e2e/missing.html", "html", "<p>")
        .await;

    let shown = recv_matching(&mut client.rx, TIMEOUT, |m| {
        m["method"] == "window/showMessage"
    })
    .await
    .expect("no showMessage for linter failure");
    let message = shown["params"]["message"].as_str().unwrap();
    assert!(message.starts_with("ERROR: Linting"));
    assert!(message.contains("htmllinter-definitely-missing-program"));
}

#[tokio::test]
async fn html_change_and_save_relint_while_other_languages_are_ignored() {
    let mut client = TestClient::start(fake_linter_options()).await;
    let page = "file:///tmp/htmllinter-e2e/edit.html";
    let css = "file:///tmp/htmllinter-e2e/edit.css";

    client.open(css, "css", "p {}\n").await;
    client.open(page, "html", "<p>\n<div>\n").await;
    assert_eq!(client.next_published_uri().await, page);

    client.change(css, 2, "p { color: red }\n").await;
    client.save(css, "p { color: red }\n").await;
    client.change(page, 2, "<p>\n<div>\n<span>\n").await;
    assert_eq!(client.next_published_uri().await, page);

    client.save(page, "<p>\n<div>\n<span>\n").await;
    assert_eq!(client.next_published_uri().await, page);
}

#[tokio::test]
async fn configuration_change_rebuilds_linter_and_relints() {
    let mut client = TestClient::start(fake_linter_options()).await;
    let uri = "file:///tmp/htmllinter-e2e/settings.html";

    client.open(uri, "html", "<p class='a'>\n<div>\n").await;
    let before = client.diagnostics_for(uri).await;
    assert_eq!(before[0]["code"], "tag-close");

    client
        .notify(
            "workspace/didChangeConfiguration",
            json!({ "settings": { "htmllinter": linter_settings(OTHER_LINTER) } }),
        )
        .await;

    let after = client.diagnostics_from_rule(uri, "attr-quotes").await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0]["severity"], json!(2));
    assert_eq!(
        after[0]["message"],
        "htmllinter/attr-quotes: Use double quotes [1:1]"
    );
}

#[tokio::test]
async fn config_file_change_relints_open_documents() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(".htmllinterrc.json");
    std::fs::write(&config, linter_settings(FAKE_LINTER).to_string()).unwrap();

    let mut client = TestClient::start_in(Some(dir.path()), Value::Null).await;
    let page = Url::from_file_path(dir.path().join("index.html")).unwrap();

    client.open(page.as_str(), "html", "<p>\n<div>\n").await;
    assert_eq!(client.diagnostics_for(page.as_str()).await[0]["code"], "tag-close");

    std::fs::write(&config, linter_settings(OTHER_LINTER).to_string()).unwrap();
    client
        .notify(
            "workspace/didChangeWatchedFiles",
            json!({ "changes": [{ "uri": Url::from_file_path(&config).unwrap(), "type": 2 }] }),
        )
        .await;

    let after = client.diagnostics_from_rule(page.as_str(), "attr-quotes").await;
    assert_eq!(after.len(), 1);
}
