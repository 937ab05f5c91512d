use std::time::Duration;

use graphql_mcp_server::cache::DEFAULT_TTL;
use schemars::JsonSchema;
use serde::Deserialize;

/// Schema caching options
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SchemaCache {
    /// How long a fetched schema is used before it is fetched again (default: 5m)
    #[serde(deserialize_with = "humantime_serde::deserialize")]
    #[schemars(with = "String")]
    pub ttl: Duration,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}
