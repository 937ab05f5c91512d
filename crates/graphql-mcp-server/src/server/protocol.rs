//! JSON-RPC messages and method dispatch

use std::sync::LazyLock;

use regex::Regex;
use rmcp::model::{
    CallToolResult, Content, ErrorCode, Implementation, ProtocolVersion, ServerCapabilities,
    ServerInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::Server;
use crate::errors::McpError;

const JSONRPC_VERSION: &str = "2.0";

const NOTIFICATION_PREFIX: &str = "notifications/";

/// Matches the `id` member of a request that failed to parse
static ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""id"\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+)"#).ok());

/// An incoming JSON-RPC message
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Notifications never get a response
    pub fn is_notification(&self) -> bool {
        self.method.starts_with(NOTIFICATION_PREFIX)
    }

    pub fn id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// An outgoing JSON-RPC response
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl Response {
    pub fn new(id: Value, result: Result<Value, McpError>) -> Self {
        let (result, error) = match result {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
            error,
        }
    }

    pub fn error(id: Value, error: McpError) -> Self {
        Self::new(id, Err(error))
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Parse one line of input.
///
/// A line that is not a valid request yields the error response to send back.
/// Lines that are not JSON at all are addressed to whatever id can be
/// recovered from the raw text.
pub fn parse_line(line: &str) -> Result<Request, Box<Response>> {
    let message: Value = serde_json::from_str(line).map_err(|error| {
        warn!(%error, "Received unparseable message");
        Box::new(Response::error(
            recover_id(line),
            McpError::new(
                ErrorCode::PARSE_ERROR,
                format!("Parse error: {error}"),
                None,
            ),
        ))
    })?;

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(message).map_err(|error| {
        warn!(%error, %id, "Received invalid request");
        Box::new(Response::error(
            id,
            McpError::new(
                ErrorCode::INVALID_REQUEST,
                format!("Invalid request: {error}"),
                None,
            ),
        ))
    })
}

/// Best-effort extraction of the request id from malformed input
pub fn recover_id(line: &str) -> Value {
    ID_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(line))
        .and_then(|captures| captures.get(1))
        .and_then(|id| serde_json::from_str(id.as_str()).ok())
        .unwrap_or(Value::Null)
}

/// Handle a request, returning the response to send, if any
pub async fn handle(server: &Server, request: Request) -> Option<Response> {
    if request.is_notification() {
        debug!(method = %request.method, "Received notification");
        return None;
    }

    let id = request.id();
    debug!(%id, method = %request.method, "Handling request");
    let result = match request.method.as_str() {
        "initialize" => initialize(),
        "tools/list" => list_tools(server).await,
        "tools/call" | "tool.call" => call_tool(server, request.params).await,
        "resources/list" => Ok(json!({ "resources": [] })),
        "prompts/list" => Ok(json!({ "prompts": [] })),
        other => Err(McpError::new(
            ErrorCode::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
            None,
        )),
    };
    if let Err(error) = &result {
        debug!(%id, method = %request.method, code = error.code.0, message = %error.message, "Request failed");
    }
    Some(Response::new(id, result))
}

fn initialize() -> Result<Value, McpError> {
    let mut implementation = Implementation::default();
    implementation.name = env!("CARGO_PKG_NAME").to_string();
    implementation.version = env!("CARGO_PKG_VERSION").to_string();

    to_value(ServerInfo {
        protocol_version: ProtocolVersion::V_2024_11_05,
        capabilities: ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .enable_prompts()
            .build(),
        server_info: implementation,
        ..Default::default()
    })
}

async fn list_tools(server: &Server) -> Result<Value, McpError> {
    let tools = server.list_tools().await?;
    Ok(json!({ "tools": tools }))
}

async fn call_tool(server: &Server, params: Option<Value>) -> Result<Value, McpError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|error| {
            McpError::new(
                ErrorCode::INVALID_PARAMS,
                format!("Invalid tool call: {error}"),
                Some(json!({ "kind": "InvalidArguments" })),
            )
        })?;

    let data = server
        .call_tool(&params.name, params.arguments.unwrap_or_default())
        .await?;

    to_value(CallToolResult {
        content: vec![Content::text(data.to_string())],
        is_error: None,
    })
}

fn to_value(value: impl Serialize) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|error| {
        McpError::new(
            ErrorCode::INTERNAL_ERROR,
            format!("Failed to serialize response: {error}"),
            None,
        )
    })
}
