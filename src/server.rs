//! Stdio JSON-RPC server
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! Requests are handled in arrival order; notifications get no reply.

use crate::notes::NoteStore;
use crate::prompts;
use crate::protocol::{
    self, error_codes, methods, notifications, CallToolParams, GetPromptParams, InitializeParams,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse,
};
use crate::tools::ToolRegistry;
use crate::{NotesConfig, NotesError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

pub struct Server {
    tools: ToolRegistry,
}

impl Server {
    pub fn new(store: NoteStore) -> Self {
        Self {
            tools: ToolRegistry::new(store),
        }
    }

    pub fn from_config(config: &NotesConfig) -> Self {
        Self::new(NoteStore::new(config.notes_file.clone()))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Serve until the reader reaches EOF.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(path = %self.tools.store().path().display(), "Notekeeper serving on stdio");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line.trim_end_matches(['\n', '\r'])).await,
                Err(e) => {
                    warn!("Message is not valid UTF-8: {}", e);
                    serialize(parse_error(format!("Parse error: invalid UTF-8: {}", e)))
                }
            };
            if let Some(response) = response {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw line. Returns the serialized response, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => {
                warn!("Unparseable message: {}", e);
                Some(parse_error(format!("Parse error: {}", e)))
            }
            Ok(json) => match serde_json::from_value::<JsonRpcRequest>(json.clone()) {
                Ok(request) => self.handle_request(request).await,
                // Anything with an id that isn't a request still deserves an answer
                Err(e) => json.get("id").filter(|id| !id.is_null()).map(|id| {
                    JsonRpcResponse::failure(
                        id.clone(),
                        JsonRpcError::new(error_codes::INVALID_REQUEST, format!("Invalid request: {}", e)),
                    )
                }),
            },
        }?;

        serialize(response)
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        debug!(method = %request.method, "Handling request");
        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            notifications::INITIALIZED => info!("Client initialized"),
            notifications::CANCELLED => debug!("Client cancelled a request"),
            other => debug!(method = %other, "Ignoring notification"),
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        match method {
            methods::INITIALIZE => {
                let params: InitializeParams = params
                    .map(parse_params::<InitializeParams>)
                    .transpose()?
                    .unwrap_or_default();
                let version = params
                    .protocol_version
                    .unwrap_or_else(|| protocol::DEFAULT_PROTOCOL_VERSION.to_string());
                info!(protocol_version = %version, "Initializing");
                Ok(protocol::create_initialize_result(&version, prompts::SERVER_INSTRUCTIONS))
            }
            methods::PING => Ok(serde_json::json!({})),
            methods::TOOLS_LIST => Ok(serde_json::json!({ "tools": self.tools.definitions() })),
            methods::TOOLS_CALL => {
                let params: CallToolParams = parse_params(params.unwrap_or(Value::Null))?;
                let result = self
                    .tools
                    .call(&params.name, params.arguments)
                    .await
                    .map_err(to_rpc_error)?;
                to_value(result)
            }
            methods::PROMPTS_LIST => Ok(serde_json::json!({ "prompts": prompts::definitions() })),
            methods::PROMPTS_GET => {
                let params: GetPromptParams = parse_params(params.unwrap_or(Value::Null))?;
                let result = prompts::render(&params.name, params.arguments.as_ref()).map_err(to_rpc_error)?;
                to_value(result)
            }
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }
}

fn parse_error(message: String) -> JsonRpcResponse {
    JsonRpcResponse::failure(Value::Null, JsonRpcError::new(error_codes::PARSE_ERROR, message))
}

fn serialize(response: JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            None
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_value<T: serde::Serialize>(value: T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
}

fn to_rpc_error(error: NotesError) -> JsonRpcError {
    let code = match error {
        NotesError::InvalidParams(_) | NotesError::UnknownTool(_) | NotesError::UnknownPrompt(_) => {
            error_codes::INVALID_PARAMS
        }
        _ => error_codes::INTERNAL_ERROR,
    };
    JsonRpcError::new(code, error.to_string())
}
