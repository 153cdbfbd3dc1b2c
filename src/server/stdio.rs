//! Newline-delimited JSON adapter over stdin/stdout.
//!
//! Each input line is a request `{"id", "tool", "arguments"}` and produces
//! exactly one output line `{"id", "content", "structuredContent", "isError"}`.
//! The pseudo-tool `list_tools` returns `{"id", "tools"}`. Requests run
//! concurrently; responses are written as they complete.

use crate::error::{GatewayError, Result};
use crate::server::state::ServerState;
use crate::tools::{ToolDefinition, ToolResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

const LIST_TOOLS: &str = "list_tools";

#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub id: Value,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Tool {
        id: Value,
        #[serde(flatten)]
        response: ToolResponse,
    },
    Tools {
        id: Value,
        tools: Vec<ToolDefinition>,
    },
}

/// Line-oriented transport over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Next non-blank line as raw bytes, or `None` at EOF.
    ///
    /// An undecodable line fails only its own request in `handle_line`.
    async fn read_line(&self) -> Result<Option<Vec<u8>>> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = Vec::new();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_ascii();
            if !trimmed.is_empty() {
                trace!("Received line: {}", String::from_utf8_lossy(trimmed));
                return Ok(Some(trimmed.to_vec()));
            }
        }
    }

    async fn write_line(&self, content: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        trace!("Sending line: {}", content);
        writer.write_all(content.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn write_reply(&self, reply: &Reply) -> Result<()> {
        let json = serde_json::to_string(reply)?;
        self.write_line(&json).await
    }
}

/// Serve tool requests until EOF, then wait for in-flight requests.
pub async fn serve<R, W>(state: Arc<ServerState>, transport: Arc<LineTransport<R, W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut in_flight = JoinSet::new();

    while let Some(line) = transport.read_line().await? {
        let state = Arc::clone(&state);
        let transport = Arc::clone(&transport);
        in_flight.spawn(async move {
            let reply = handle_line(&state, &line).await;
            if let Err(e) = transport.write_reply(&reply).await {
                error!("Failed to write response: {}", e);
            }
        });

        // Reap finished requests so the set does not grow unbounded.
        while in_flight.try_join_next().is_some() {}
    }

    info!("Input closed, waiting for {} in-flight requests", in_flight.len());
    while in_flight.join_next().await.is_some() {}
    Ok(())
}

/// Serve on the process stdin/stdout.
pub async fn serve_stdio(state: Arc<ServerState>) -> Result<()> {
    let transport = Arc::new(LineTransport::new(
        tokio::io::BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    ));
    serve(state, transport).await
}

async fn handle_line(state: &ServerState, line: &[u8]) -> Reply {
    let request_number = state.next_request_id();
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            warn!(request = request_number, "Undecodable request: {}", e);
            return Reply::Tool {
                id: Value::Null,
                response: ToolResponse::error(format!("Invalid request: {}", e)),
            };
        }
    };
    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(request = request_number, "Malformed request: {}", e);
            return Reply::Tool {
                id: Value::Null,
                response: ToolResponse::error(format!("Invalid request: {}", e)),
            };
        }
    };

    debug!(request = request_number, tool = %request.tool, "Handling request");

    if request.tool == LIST_TOOLS {
        return Reply::Tools {
            id: request.id,
            tools: state.tools.list(),
        };
    }

    let response = match state.tools.execute(&request.tool, request.arguments).await {
        Ok(response) => response,
        Err(e) => {
            log_tool_error(&request.tool, &e);
            ToolResponse::error(e.to_string())
        }
    };

    Reply::Tool {
        id: request.id,
        response,
    }
}

fn log_tool_error(tool: &str, e: &GatewayError) {
    match e {
        GatewayError::Tool(_) => warn!(tool, "Tool rejected request: {}", e),
        _ => error!(tool, "Tool failed: {}", e),
    }
}
