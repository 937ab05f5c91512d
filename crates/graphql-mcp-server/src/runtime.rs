//! Runtime utilites
//!
//! This module is only used by the main binary and provides helper code
//! related to runtime configuration.

mod config;
mod endpoint;
mod logging;
mod schema_cache;
mod schema_source;
mod schemas;
mod whitelist;

use std::path::Path;

pub use config::Config;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
pub use logging::setup_logging;
pub use schema_source::SchemaSource;

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Prefix for environment variables overriding any config field
const ENV_PREFIX: &str = "GRAPHQL_MCP_";

/// Read configuration from environment variables only (when no config file is provided)
#[allow(clippy::result_large_err)]
pub fn read_config_from_env() -> Result<Config, figment::Error> {
    Figment::new()
        .join(common_env())
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .extract()
}

/// Read in a config from a YAML file, filling in any missing values from the environment
#[allow(clippy::result_large_err)]
pub fn read_config(yaml_path: impl AsRef<Path>) -> Result<Config, figment::Error> {
    Figment::new()
        .join(common_env())
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .join(Yaml::file(yaml_path))
        .extract()
}

/// Figment provider that maps the short, unprefixed environment variables into
/// the nested structure needed by the config
fn common_env() -> Env {
    Env::raw()
        .only(&[
            "graphql_endpoint",
            "graphql_api_key",
            "query_whitelist",
            "mutation_whitelist",
        ])
        .map(|key| match key.to_string().to_lowercase().as_str() {
            "graphql_endpoint" => "ENDPOINT".into(),
            "graphql_api_key" => "API_KEY".into(),
            "query_whitelist" => "WHITELIST:QUERY".into(),
            "mutation_whitelist" => "WHITELIST:MUTATION".into(),

            // Filtered out by `only` above
            other => other.to_string().into(),
        })
        .split(":")
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use graphql_mcp_server::whitelist::Whitelist;
    use secrecy::ExposeSecret;

    use super::{read_config, read_config_from_env};

    #[test]
    fn it_prioritizes_env_vars() {
        let config = r#"
            endpoint: http://from_file:4000/graphql
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";
            let endpoint = "https://from_env:4000/graphql";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MCP_ENDPOINT", endpoint);

            let config = read_config(path)?;

            assert_eq!(config.endpoint.as_str(), endpoint);
            Ok(())
        });
    }

    #[test]
    fn it_extracts_nested_env() {
        let config = r#"
            schema_cache:
                ttl: 5m
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MCP_SCHEMA_CACHE__TTL", "30s");

            let config = read_config(path)?;

            assert_eq!(config.schema_cache.ttl, Duration::from_secs(30));
            Ok(())
        });
    }

    #[test]
    fn it_merges_env_and_file() {
        let config = "
            endpoint: http://from_file:4000/graphql
        ";

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("GRAPHQL_MCP_WHITELIST__QUERY", "continents");

            let config = read_config(path)?;

            assert_eq!(config.endpoint.as_str(), "http://from_file:4000/graphql");
            assert_eq!(config.whitelist.query.as_deref(), Some("continents"));
            Ok(())
        });
    }

    #[test]
    fn it_maps_common_env_vars() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GRAPHQL_ENDPOINT", "https://countries.example/graphql");
            jail.set_env("GRAPHQL_API_KEY", "secret");
            jail.set_env("QUERY_WHITELIST", r#"["continents","countries"]"#);
            jail.set_env("MUTATION_WHITELIST", "addContinent");

            let config = read_config_from_env()?;

            assert_eq!(config.endpoint.as_str(), "https://countries.example/graphql");
            assert_eq!(
                config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
                Some("secret".to_string())
            );
            let whitelists = config.whitelist.whitelists();
            assert_eq!(
                whitelists.query,
                Whitelist::from_fields(["continents", "countries"])
            );
            assert_eq!(whitelists.mutation, Whitelist::from_fields(["addContinent"]));
            Ok(())
        });
    }

    #[test]
    fn it_reads_numeric_api_keys_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GRAPHQL_API_KEY", "12345");

            let config = read_config_from_env()?;

            assert_eq!(
                config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
                Some("12345".to_string())
            );
            Ok(())
        });
    }

    #[test]
    fn it_allows_everything_for_malformed_env_whitelists() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("QUERY_WHITELIST", "[1, 2]");
            jail.set_env("GRAPHQL_MCP_WHITELIST__MUTATION", "[\"addContinent\"");

            let whitelists = read_config_from_env()?.whitelist.whitelists();

            assert!(!whitelists.query.is_restricted());
            assert!(!whitelists.mutation.is_restricted());
            Ok(())
        });
    }

    #[test]
    fn it_uses_defaults_without_config() {
        figment::Jail::expect_with(|_jail| {
            let config = read_config_from_env()?;

            assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:4000/graphql");
            assert!(config.api_key.is_none());
            assert_eq!(config.schema_cache.ttl, Duration::from_secs(300));
            Ok(())
        });
    }
}
