//! Execute GraphQL operations against the upstream endpoint

use apollo_compiler::parser::Parser;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::errors::{SchemaError, ServerError, ToolError};
use crate::schema::IntrospectedSchema;

/// Introspection query describing every type, seven wrapper levels deep
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        description
        args { ...InputValue }
        type { ...TypeRef }
      }
      inputFields { ...InputValue }
      enumValues(includeDeprecated: true) { name description }
    }
  }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}"#;

/// A GraphQL response body
#[derive(Debug, Deserialize)]
struct Response<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

impl<T> Response<T> {
    fn error_message(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| {
            self.errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionData {
    #[serde(rename = "__schema")]
    schema: IntrospectedSchema,
}

/// Client for the upstream GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphQLClient {
    endpoint: Url,
    headers: HeaderMap,
    http: reqwest::Client,
}

impl GraphQLClient {
    /// Create a client sending `headers` with every request.
    ///
    /// The API key becomes a bearer `Authorization` header unless one is
    /// already configured.
    pub fn new(
        endpoint: Url,
        mut headers: HeaderMap,
        api_key: Option<&SecretString>,
    ) -> Result<Self, ServerError> {
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        if let Some(api_key) = api_key
            && !headers.contains_key(AUTHORIZATION)
        {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            endpoint,
            headers,
            http: reqwest::Client::builder().build()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Validate and execute a document, returning the `data` member of the response
    pub async fn execute(
        &self,
        document: &str,
        variables: &Map<String, Value>,
        operation_name: &str,
    ) -> Result<Value, ToolError> {
        Parser::new()
            .parse_ast(document, "operation.graphql")
            .map_err(|errors| ToolError::InvalidQuerySyntax(errors.errors.to_string()))?;

        debug!(operation = operation_name, document, "Executing GraphQL operation");
        let body = json!({
            "query": document,
            "variables": variables,
            "operationName": operation_name,
        });

        let response: Response<Value> = self
            .post(&body)
            .await
            .map_err(|error| ToolError::UpstreamGraphQLError(error.to_string()))?;

        if let Some(message) = response.error_message() {
            return Err(ToolError::UpstreamGraphQLError(message));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// Fetch the schema by introspection
    pub async fn introspect(&self) -> Result<IntrospectedSchema, SchemaError> {
        let body = json!({
            "query": INTROSPECTION_QUERY,
            "operationName": "IntrospectionQuery",
        });
        let response: Response<IntrospectionData> = self.post(&body).await.map_err(|error| match error {
            PostError::Request(error) => SchemaError::Request(error.to_string()),
            PostError::Status { status, body } => SchemaError::Status { status, body },
            PostError::Body(error) => SchemaError::InvalidResponse(error.to_string()),
        })?;

        if let Some(message) = response.error_message() {
            return Err(SchemaError::GraphQL(message));
        }
        response
            .data
            .map(|data| data.schema)
            .ok_or_else(|| SchemaError::InvalidResponse("response has no data".to_string()))
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, body: &Value) -> Result<Response<T>, PostError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body.to_string())
            .send()
            .await
            .map_err(PostError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(PostError::Body)
    }
}

#[derive(Debug, thiserror::Error)]
enum PostError {
    #[error("Failed to send GraphQL request: {0}")]
    Request(reqwest::Error),

    #[error("GraphQL request returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to read GraphQL response body: {0}")]
    Body(reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server, headers: HeaderMap, api_key: Option<&str>) -> GraphQLClient {
        let endpoint = Url::parse(&format!("{}/graphql", server.url())).unwrap();
        let api_key = api_key.map(|key| SecretString::from(key.to_string()));
        GraphQLClient::new(endpoint, headers, api_key.as_ref()).unwrap()
    }

    #[tokio::test]
    async fn returns_data_and_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "Bearer secret")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "query": "query Count { count }",
                "operationName": "Count",
                "variables": {},
            })))
            .with_body(r#"{"data": {"count": 3}}"#)
            .create_async()
            .await;

        let data = client(&server, HeaderMap::new(), Some("secret"))
            .execute("query Count { count }", &Map::new(), "Count")
            .await
            .unwrap();

        assert_eq!(data, json!({"count": 3}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn configured_authorization_wins_over_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "Basic abc")
            .match_header("x-tenant", "blue")
            .with_body(r#"{"data": null}"#)
            .create_async()
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert("x-tenant", HeaderValue::from_static("blue"));
        let data = client(&server, headers, Some("secret"))
            .execute("query Count { count }", &Map::new(), "Count")
            .await
            .unwrap();

        assert_eq!(data, Value::Null);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_documents_are_never_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/graphql").expect(0).create_async().await;

        let result = client(&server, HeaderMap::new(), None)
            .execute("query Broken { count", &Map::new(), "Broken")
            .await;

        assert!(matches!(result, Err(ToolError::InvalidQuerySyntax(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn graphql_errors_are_upstream_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_body(r#"{"errors": [{"message": "first"}, {"message": "second"}]}"#)
            .create_async()
            .await;

        let result = client(&server, HeaderMap::new(), None)
            .execute("query Count { count }", &Map::new(), "Count")
            .await;

        assert_eq!(
            result,
            Err(ToolError::UpstreamGraphQLError("first; second".to_string()))
        );
    }

    #[tokio::test]
    async fn http_failures_are_upstream_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let result = client(&server, HeaderMap::new(), None)
            .execute("query Count { count }", &Map::new(), "Count")
            .await;

        assert!(matches!(
            result,
            Err(ToolError::UpstreamGraphQLError(message)) if message.contains("502") && message.contains("bad gateway")
        ));
    }

    #[tokio::test]
    async fn introspects_the_schema() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({"operationName": "IntrospectionQuery"})))
            .with_body(
                json!({
                    "data": {
                        "__schema": {
                            "queryType": {"name": "Query"},
                            "mutationType": null,
                            "types": [{
                                "kind": "OBJECT",
                                "name": "Query",
                                "description": null,
                                "fields": [{
                                    "name": "count",
                                    "description": null,
                                    "args": [],
                                    "type": {"kind": "SCALAR", "name": "Int", "ofType": null}
                                }],
                                "inputFields": null,
                                "enumValues": null
                            }]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let schema = client(&server, HeaderMap::new(), None).introspect().await.unwrap();

        assert_eq!(schema.query_type.unwrap().name, "Query");
        assert_eq!(schema.types.len(), 1);
    }

    #[tokio::test]
    async fn introspection_errors_are_schema_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_body(r#"{"errors": [{"message": "introspection disabled"}]}"#)
            .create_async()
            .await;

        let result = client(&server, HeaderMap::new(), None).introspect().await;

        assert_eq!(
            result,
            Err(SchemaError::GraphQL("introspection disabled".to_string()))
        );
    }

    #[tokio::test]
    async fn non_json_introspection_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_body("<html></html>")
            .create_async()
            .await;

        let result = client(&server, HeaderMap::new(), None).introspect().await;

        assert!(matches!(result, Err(SchemaError::InvalidResponse(_))));
    }
}
