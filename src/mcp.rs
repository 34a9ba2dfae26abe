use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SearxngMcpError};
use crate::logger::Logger;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "searxng";
pub const SERVER_VERSION: &str = "1.0.0";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// `None` only when the member is absent; an explicit `null` id still gets a reply.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn present<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

/// Tool handlers return the text shown to the caller. `InvalidRequest` errors become
/// JSON-RPC `-32602`; anything else becomes an `isError` tool result.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Named tools in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<(ToolSpec, ToolHandler)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ToolSpec, handler: ToolHandler) {
        self.tools.retain(|(s, _)| s.name != spec.name);
        self.tools.push((spec, handler));
    }

    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|(s, _)| s).collect()
    }

    fn get(&self, name: &str) -> Option<&ToolHandler> {
        self.tools.iter().find(|(s, _)| s.name == name).map(|(_, h)| h)
    }
}

pub struct McpServer {
    registry: ToolRegistry,
    logger: Logger,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, logger: Logger) -> Self {
        Self { registry, logger }
    }

    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Reads newline-delimited requests until EOF, answering each in turn.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(resp) = self.handle_line(&line).await {
                write_response(&mut writer, &resp).await?;
            }
        }
        self.logger.info("stdin closed, shutting down");
        Ok(())
    }

    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let req: RpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                self.logger.warn(format_args!("unparseable request: {e}"));
                return Some(RpcResponse::err(Value::Null, -32700, format!("parse error: {e}")));
            }
        };

        let RpcRequest { id, method, params } = req;

        // 没有 id 的消息是通知，不需要应答
        let Some(id) = id else {
            self.logger.in_scope(|| tracing::debug!(method = %method, "notification"));
            return None;
        };

        let resp = match method.as_str() {
            "initialize" => RpcResponse::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
                }),
            ),
            "ping" => RpcResponse::ok(id, json!({})),
            "tools/list" => RpcResponse::ok(id, json!({ "tools": self.registry.specs() })),
            "tools/call" => self.handle_call(id, params).await,
            _ => RpcResponse::err(id, -32601, format!("method not found: {method}")),
        };
        Some(resp)
    }

    async fn handle_call(&self, id: Value, params: Value) -> RpcResponse {
        let params: CallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return RpcResponse::err(id, -32602, format!("invalid params: {e}")),
        };
        let Some(handler) = self.registry.get(&params.name) else {
            return RpcResponse::err(id, -32602, format!("unknown tool: {}", params.name));
        };

        let started = Instant::now();
        let outcome = handler(params.arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                self.logger.in_scope(|| {
                    tracing::info!(tool = %params.name, elapsed_ms, "tool call succeeded")
                });
                RpcResponse::ok(id, tool_result(text, false))
            }
            Err(SearxngMcpError::InvalidRequest(message)) => {
                self.logger.in_scope(|| {
                    tracing::warn!(tool = %params.name, error = %message, "tool call rejected")
                });
                RpcResponse::err(id, -32602, message)
            }
            Err(e) => {
                self.logger.in_scope(|| {
                    tracing::error!(tool = %params.name, elapsed_ms, error = %e, "tool call failed")
                });
                RpcResponse::ok(id, tool_result(e.to_string(), true))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn tool_result(text: String, is_error: bool) -> Value {
    let mut result = json!({ "content": [{ "type": "text", "text": text }] });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, resp: &RpcResponse) -> Result<()> {
    let line = serde_json::to_string(resp)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
