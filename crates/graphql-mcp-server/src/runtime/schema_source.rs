use std::path::PathBuf;

use graphql_mcp_server::server;
use schemars::JsonSchema;
use serde::Deserialize;

/// Source for the upstream GraphQL schema
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SchemaSource {
    /// Introspect the GraphQL endpoint
    #[default]
    Introspect,

    /// Read the schema from a local SDL file, re-read whenever the cache expires
    Local { path: PathBuf },
}

impl From<SchemaSource> for server::SchemaSource {
    fn from(value: SchemaSource) -> Self {
        match value {
            SchemaSource::Introspect => server::SchemaSource::Introspect,
            SchemaSource::Local { path } => server::SchemaSource::Local(path),
        }
    }
}
