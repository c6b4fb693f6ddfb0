//! MCP stdio server
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! `tools/call` requests run on their own tasks so a long consumption does not
//! hold up `ping` or a cancellation for it; every response goes through a
//! single writer task so lines never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::ToolContext;
use super::protocol::{
    methods, CancelledParams, InitializeParams, InitializeResult, McpError, McpRequest,
    McpResponse, RequestId, ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCapability,
    ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use super::registry::McpRegistry;

/// Name reported in `initialize`
pub const SERVER_NAME: &str = "kafka-mcp";

pub struct McpServer {
    registry: Arc<McpRegistry>,
    context: ToolContext,
    in_flight: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl McpServer {
    pub fn new(registry: McpRegistry, context: ToolContext) -> Self {
        Self {
            registry: Arc::new(registry),
            context,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &McpRegistry {
        &self.registry
    }

    /// Serve MCP over the process's stdin and stdout.
    pub async fn serve_stdio(self: Arc<Self>) -> anyhow::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches end of input, then wait for in-flight
    /// calls to answer.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<McpResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        info!(tools = self.registry.tool_count(), "MCP server starting");

        let mut lines = reader.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from input")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request = match parse_request(line) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(*response);
                    continue;
                }
            };

            let call_id = match request.method.as_str() {
                methods::TOOLS_CALL => request.id.clone(),
                _ => None,
            };

            if let Some(id) = call_id {
                // Registered before the next line is read, so a cancellation
                // right behind the call always finds it.
                let cancel = self.begin_call(&id).await;
                let server = Arc::clone(&self);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = server.respond(request, Some(cancel)).await {
                        let _ = tx.send(response);
                    }
                });
            } else if let Some(response) = self.dispatch(request).await {
                let _ = tx.send(response);
            }
        }

        info!("input closed, MCP server stopping");
        drop(tx);
        writer_task
            .await
            .context("Response writer task failed")?
    }

    /// Parse and handle one line, returning the response to write, if any.
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        match parse_request(line) {
            Ok(request) => self.dispatch(request).await,
            Err(response) => Some(*response),
        }
    }

    /// Handle one request. Notifications never produce a response.
    pub async fn dispatch(&self, request: McpRequest) -> Option<McpResponse> {
        self.respond(request, None).await
    }

    /// Track a `tools/call` as in flight and return its cancellation token.
    async fn begin_call(&self, id: &RequestId) -> CancellationToken {
        let cancel = CancellationToken::new();
        self.in_flight.lock().await.insert(id.clone(), cancel.clone());
        cancel
    }

    async fn respond(
        &self,
        request: McpRequest,
        cancel: Option<CancellationToken>,
    ) -> Option<McpResponse> {
        debug!(method = %request.method, id = ?request.id, "MCP request");

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request).await;
            return None;
        };

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request),
            methods::PING => Ok(serde_json::json!({})),
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => {
                let cancel = match cancel {
                    Some(cancel) => cancel,
                    None => self.begin_call(&id).await,
                };
                let result = self.handle_tools_call(&id, &request, cancel).await;
                self.in_flight.lock().await.remove(&id);
                result
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => {
                warn!(method = %request.method, error = %e, "MCP request failed");
                McpResponse::error(Some(id), e)
            }
        })
    }

    async fn handle_notification(&self, request: &McpRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => debug!("client initialized"),
            methods::CANCELLED => {
                let params = request
                    .params
                    .clone()
                    .map(serde_json::from_value::<CancelledParams>);
                match params {
                    Some(Ok(params)) => self.cancel(&params.request_id, params.reason).await,
                    _ => warn!("ignoring malformed cancellation"),
                }
            }
            other => debug!(method = other, "ignoring notification"),
        }
    }

    async fn cancel(&self, id: &RequestId, reason: Option<String>) {
        match self.in_flight.lock().await.get(id) {
            Some(token) => {
                info!(?id, reason = reason.as_deref().unwrap_or(""), "cancelling request");
                token.cancel();
            }
            None => debug!(?id, "cancellation for unknown or finished request"),
        }
    }

    fn handle_initialize(&self, request: &McpRequest) -> Result<Value, McpError> {
        let params: InitializeParams = request
            .params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("missing initialize params".to_string()))?;

        info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            protocol = %params.protocol_version,
            "MCP client connected"
        );

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        to_value(&result)
    }

    fn handle_tools_list(&self) -> Result<Value, McpError> {
        to_value(&ToolsListResult {
            tools: self.registry.list_tools(),
        })
    }

    async fn handle_tools_call(
        &self,
        id: &RequestId,
        request: &McpRequest,
        cancel: CancellationToken,
    ) -> Result<Value, McpError> {
        let params: ToolsCallParams = request
            .params
            .clone()
            .ok_or_else(|| McpError::InvalidParams("missing tools/call params".to_string()))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| McpError::InvalidParams(e.to_string()))
            })?;

        let tool = self
            .registry
            .get_tool(&params.name)
            .ok_or_else(|| McpError::InvalidParams(format!("unknown tool: {}", params.name)))?;

        info!(tool = %params.name, ?id, "calling tool");
        let handler = Arc::clone(&tool.handler);
        let outcome = handler(
            self.context.with_cancel(cancel),
            params.arguments.unwrap_or(Value::Null),
        )
        .await;

        to_value(&outcome?)
    }
}

fn parse_request(line: &str) -> Result<McpRequest, Box<McpResponse>> {
    let request: McpRequest = serde_json::from_str(line).map_err(|e| {
        error!(error = %e, "failed to parse JSON-RPC request");
        Box::new(McpResponse::error(None, McpError::ParseError(e.to_string())))
    })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(Box::new(McpResponse::error(
            request.id,
            McpError::InvalidRequest(format!(
                "unsupported jsonrpc version {:?}",
                request.jsonrpc
            )),
        )));
    }

    Ok(request)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<McpResponse>,
    mut writer: W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line =
            serde_json::to_string(&response).context("Failed to serialize MCP response")?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write MCP response")?;
        writer.flush().await.context("Failed to flush output")?;
    }
    Ok(())
}
