use graphql_mcp_server::catalog::Whitelists;
use graphql_mcp_server::whitelist::Whitelist;
use schemars::JsonSchema;
use serde::Deserialize;

/// Allowed root fields, per operation kind.
///
/// Each value is either a comma separated list or a JSON array of field names.
/// An absent or empty value allows every field.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Query fields exposed as tools
    #[serde(deserialize_with = "super::config::parsers::optional_text")]
    pub query: Option<String>,

    /// Mutation fields exposed as tools
    #[serde(deserialize_with = "super::config::parsers::optional_text")]
    pub mutation: Option<String>,
}

impl WhitelistConfig {
    pub fn whitelists(&self) -> Whitelists {
        Whitelists {
            query: Whitelist::parse(self.query.as_deref()),
            mutation: Whitelist::parse(self.mutation.as_deref()),
        }
    }
}
