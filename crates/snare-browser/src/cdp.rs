//! CDP WebSocket client for a single inspector target
//!
//! Commands get auto-incrementing ids and are correlated with their responses
//! by a background reader task. Events are not consumed by snare and are
//! dropped. When the socket closes, every pending command fails.
//!
//! No command timeout is applied: an awaited `Runtime.evaluate` legitimately
//! stays pending until the remote operation finishes.

use crate::channel::CommandChannel;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snare_core::{EvaluateOptions, EvaluationResponse, RemoteExpression};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

#[derive(Debug, Serialize)]
struct CdpCommand<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

/// A CDP response correlated to a command id
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

/// Error object in a CDP response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpResponseError {
    pub code: i64,
    pub message: String,
}

/// CDP client bound to one target's WebSocket endpoint
pub struct CdpClient {
    next_id: AtomicU64,
    pending: PendingMap,
    writer: Mutex<WsSink>,
    reader: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a target endpoint such as
    /// `ws://127.0.0.1:9222/devtools/page/<target-id>`
    pub async fn connect(ws_url: &str) -> Result<Self> {
        info!("Connecting to inspector at {}", ws_url);

        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::Transport(format!("Failed to connect to {}: {}", ws_url, e)))?;

        let (writer, reader) = stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(reader, Arc::clone(&pending)));

        info!("Inspector connection established");

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(writer),
            reader,
        })
    }

    /// Send a CDP command and wait for its result object
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&CdpCommand { id, method, params })?;

        // Register before sending so a fast reply cannot be missed
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        debug!("Sending CDP command {} ({})", id, method);
        let sent = self.writer.lock().await.send(Message::Text(json.into())).await;
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(BrowserError::Transport(format!(
                "Failed to send {}: {}",
                method, e
            )));
        }

        let response = rx.await.map_err(|_| {
            BrowserError::Transport(format!("Connection dropped while awaiting {}", method))
        })?;

        if let Some(err) = response.error {
            return Err(BrowserError::Cdp {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl CommandChannel for CdpClient {
    async fn enable(&self) -> Result<()> {
        self.send("Runtime.enable", serde_json::json!({})).await?;
        Ok(())
    }

    #[instrument(skip(self, expression), fields(await_promise = options.await_promise))]
    async fn send_command(
        &self,
        expression: &RemoteExpression,
        options: EvaluateOptions,
    ) -> Result<EvaluationResponse> {
        let result = self.send("Runtime.evaluate", evaluate_params(expression, options)).await?;
        parse_evaluate_result(result)
    }
}

/// Build `Runtime.evaluate` params
pub fn evaluate_params(expression: &RemoteExpression, options: EvaluateOptions) -> Value {
    serde_json::json!({
        "expression": expression.as_str(),
        "awaitPromise": options.await_promise,
        "returnByValue": options.return_by_value,
    })
}

/// Map a `Runtime.evaluate` result object onto an [`EvaluationResponse`]
pub fn parse_evaluate_result(result: Value) -> Result<EvaluationResponse> {
    serde_json::from_value(result).map_err(|e| {
        BrowserError::Protocol(format!("Unexpected Runtime.evaluate result: {}", e))
    })
}

/// Parse one incoming frame. Frames without an `id` are events.
pub fn parse_cdp_response(json: &Value) -> Option<CdpResponse> {
    let id = json.get("id")?.as_u64()?;
    Some(CdpResponse {
        id,
        result: json.get("result").cloned(),
        error: json
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok()),
    })
}

async fn read_loop(mut reader: SplitStream<WsStream>, pending: PendingMap) {
    while let Some(frame) = reader.next().await {
        let text = match frame {
            Ok(Message::Text(t)) => t.to_string(),
            Ok(Message::Binary(b)) => match String::from_utf8(b.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => {
                info!("Inspector closed the connection");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket read error, stopping reader: {}", e);
                break;
            }
        };

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse CDP frame: {}", e);
                continue;
            }
        };

        if let Some(response) = parse_cdp_response(&json) {
            if let Some(tx) = pending.lock().await.remove(&response.id) {
                let _ = tx.send(response);
            } else {
                debug!("Response for unknown command id {}", response.id);
            }
        }
    }

    // Dropping the senders fails every waiter
    pending.lock().await.clear();
}
