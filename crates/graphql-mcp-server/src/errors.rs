use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};
use rmcp::model::ErrorCode;
use serde_json::json;

/// An error in server initialization
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),

    #[error("invalid header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Transport failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// An error while obtaining the GraphQL schema.
///
/// This is `Clone` because a single in-flight fetch hands its result to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to send introspection request: {0}")]
    Request(String),

    #[error("Introspection request returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid introspection response: {0}")]
    InvalidResponse(String),

    #[error("Introspection returned errors: {0}")]
    GraphQL(String),

    #[error("Could not read schema file {path}: {message}")]
    ReadFile { path: String, message: String },

    #[error("Could not parse GraphQL schema: {0}")]
    Sdl(String),
}

/// A failure while listing or calling a tool
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(#[from] SchemaError),

    #[error("Unknown query field: {0}")]
    UnknownField(String),

    #[error("Unknown mutation: {0}")]
    UnknownMutation(String),

    #[error("Tool {0} is not allowed by the configured whitelist")]
    WhitelistRejected(String),

    #[error("Missing required arguments: {}", .0.join(", "))]
    MissingArguments(Vec<String>),

    #[error("Invalid tool call: {0}")]
    InvalidArguments(String),

    #[error("Generated operation is not valid GraphQL: {0}")]
    InvalidQuerySyntax(String),

    #[error("GraphQL request failed: {0}")]
    UpstreamGraphQLError(String),
}

impl ToolError {
    /// A stable tag for the failure, reported to clients in the error data
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::SchemaUnavailable(_) => "SchemaUnavailable",
            ToolError::UnknownField(_) => "UnknownField",
            ToolError::UnknownMutation(_) => "UnknownMutation",
            ToolError::WhitelistRejected(_) => "WhitelistRejected",
            ToolError::MissingArguments(_) => "MissingArguments",
            ToolError::InvalidArguments(_) => "InvalidArguments",
            ToolError::InvalidQuerySyntax(_) => "InvalidQuerySyntax",
            ToolError::UpstreamGraphQLError(_) => "UpstreamGraphQLError",
        }
    }
}

impl From<ToolError> for McpError {
    fn from(error: ToolError) -> Self {
        let code = match error {
            ToolError::MissingArguments(_) | ToolError::InvalidArguments(_) => {
                ErrorCode::INVALID_PARAMS
            }
            _ => ErrorCode::INTERNAL_ERROR,
        };
        McpError::new(code, error.to_string(), Some(json!({ "kind": error.kind() })))
    }
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;
