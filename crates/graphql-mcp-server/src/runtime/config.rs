use reqwest::header::HeaderMap;
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use super::{
    SchemaSource, endpoint::Endpoint, logging::Logging, schema_cache::SchemaCache,
    whitelist::WhitelistConfig,
};

/// Configuration for the MCP server
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// The target GraphQL endpoint
    #[schemars(schema_with = "Url::json_schema")]
    pub endpoint: Endpoint,

    /// API key sent as a bearer token, unless an `Authorization` header is configured
    #[serde(deserialize_with = "parsers::optional_secret")]
    #[schemars(with = "Option<String>")]
    pub api_key: Option<SecretString>,

    /// List of hard-coded headers to include in all GraphQL requests
    #[serde(deserialize_with = "parsers::map_from_str")]
    #[schemars(schema_with = "super::schemas::header_map")]
    pub headers: HeaderMap,

    /// Logging configuration
    pub logging: Logging,

    /// The schema to expose as tools
    pub schema: SchemaSource,

    /// Schema caching
    pub schema_cache: SchemaCache,

    /// Restrict which root fields are exposed as tools
    pub whitelist: WhitelistConfig,
}

pub(super) mod parsers {
    use std::str::FromStr;

    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept any scalar or list as its text form.
    ///
    /// Environment values are parsed eagerly, so `["a","b"]` arrives as a list
    /// and `1234` as a number.
    pub(in crate::runtime) fn optional_text<'de, D>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            Option::<Value>::deserialize(deserializer)?.and_then(|value| match value {
                Value::Null => None,
                Value::String(text) => Some(text),
                other => Some(other.to_string()),
            }),
        )
    }

    pub(super) fn optional_secret<'de, D>(
        deserializer: D,
    ) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(optional_text(deserializer)?.map(SecretString::from))
    }

    pub(super) fn map_from_str<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapFromStrVisitor;
        impl<'de> serde::de::Visitor<'de> for MapFromStrVisitor {
            type Value = HeaderMap;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a map of header string keys and values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut parsed = HeaderMap::with_capacity(map.size_hint().unwrap_or(0));

                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    let key = HeaderName::from_str(&key)
                        .map_err(|e| serde::de::Error::custom(e.to_string()))?;
                    let value = HeaderValue::from_str(&value)
                        .map_err(|e| serde::de::Error::custom(e.to_string()))?;

                    parsed.insert(key, value);
                }

                Ok(parsed)
            }
        }

        deserializer.deserialize_map(MapFromStrVisitor)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::time::Duration;

    use rstest::rstest;
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::{Config, SchemaSource};

    #[test]
    fn it_parses_a_minimal_config() {
        serde_json::from_str::<Config>("{}").unwrap();
    }

    #[test]
    fn it_parses_a_full_config() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "endpoint": "https://countries.example/graphql",
            "api_key": "secret",
            "headers": { "x-tenant": "blue" },
            "schema": { "source": "local", "path": "schema.graphql" },
            "schema_cache": { "ttl": "90s" },
            "whitelist": { "query": "continents,countries" },
            "logging": { "level": "debug", "rotation": "daily" },
        }))
        .unwrap();

        assert_eq!(config.endpoint.as_str(), "https://countries.example/graphql");
        assert_eq!(
            config.headers.get("x-tenant").and_then(|v| v.to_str().ok()),
            Some("blue")
        );
        assert!(matches!(
            config.schema,
            SchemaSource::Local { ref path } if path == &PathBuf::from("schema.graphql")
        ));
        assert_eq!(config.schema_cache.ttl, Duration::from_secs(90));
        assert_eq!(config.logging.level, tracing::Level::DEBUG);
        assert!(config.whitelist.whitelists().query.allows("countries"));
        assert!(!config.whitelist.whitelists().query.allows("continent"));
    }

    #[test]
    fn it_rejects_invalid_headers() {
        let result = serde_json::from_value::<Config>(serde_json::json!({
            "headers": { "bad header": "value" },
        }));
        assert!(result.is_err());
    }

    #[test]
    fn it_contains_no_keys_with_double_underscore() {
        // Nested env overrides split on `__`, so no field may contain it
        let schema = schemars::schema_for!(Config).to_value().to_string();

        assert!(!schema.contains("__"))
    }

    #[rstest]
    #[case(json!("continents,countries"))]
    #[case(json!(["continents", "countries"]))]
    fn it_accepts_whitelists_as_text_or_lists(#[case] query: serde_json::Value) {
        let config: Config =
            serde_json::from_value(json!({ "whitelist": { "query": query } })).unwrap();

        let query = config.whitelist.whitelists().query;
        assert!(query.allows("continents"));
        assert!(query.allows("countries"));
        assert!(!query.allows("continent"));
    }

    #[test]
    fn it_accepts_numeric_api_keys() {
        let config: Config = serde_json::from_value(json!({ "api_key": 12345 })).unwrap();
        assert_eq!(
            config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("12345".to_string())
        );
    }
}
