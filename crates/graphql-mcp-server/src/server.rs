use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bon::bon;
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::cache::{DEFAULT_TTL, SchemaService};
use crate::catalog::{ToolDefinition, Whitelists, build_catalog};
use crate::coerce::{coerce_arguments, missing_required};
use crate::errors::{ServerError, ToolError};
use crate::graphql::GraphQLClient;
use crate::introspection::{IntrospectionFetcher, LocalSchemaFetcher, SchemaFetcher};
use crate::naming::OperationKind;
use crate::operation::assemble;
use crate::selection::plan_selection;

pub mod protocol;
pub mod transport;

/// Where the schema comes from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SchemaSource {
    /// Introspect the GraphQL endpoint
    #[default]
    Introspect,

    /// Read an SDL file, re-read on every refresh
    Local(PathBuf),
}

/// A GraphQL MCP Server
pub struct Server {
    client: GraphQLClient,
    schema: SchemaService,
    whitelists: Whitelists,
}

#[bon]
impl Server {
    #[builder]
    pub fn new(
        endpoint: Url,
        #[builder(default)] headers: HeaderMap,
        api_key: Option<SecretString>,
        #[builder(default)] whitelists: Whitelists,
        #[builder(default)] schema_source: SchemaSource,
        #[builder(default = DEFAULT_TTL)] schema_ttl: Duration,
    ) -> Result<Self, ServerError> {
        let client = GraphQLClient::new(endpoint, headers, api_key.as_ref())?;
        let fetcher: Arc<dyn SchemaFetcher> = match schema_source {
            SchemaSource::Introspect => Arc::new(IntrospectionFetcher::new(client.clone())),
            SchemaSource::Local(path) => Arc::new(LocalSchemaFetcher::new(path)),
        };
        Ok(Self {
            client,
            schema: SchemaService::new(fetcher, schema_ttl),
            whitelists,
        })
    }

    /// Serve requests read from `reader` until end of input or cancellation
    pub async fn serve<R, W>(
        self,
        reader: R,
        writer: W,
        cancellation_token: CancellationToken,
    ) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(endpoint = %self.client.endpoint(), "Starting GraphQL MCP Server");
        transport::serve(Arc::new(self), reader, writer, cancellation_token).await
    }

    /// List the tools for the current schema
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let generation = self.schema.generation().await?;
        let tools = build_catalog(&generation.snapshot, &generation.registry, &self.whitelists);
        debug!(count = tools.len(), "Listing tools");
        Ok(tools)
    }

    /// Execute the operation behind a tool, returning the GraphQL `data`
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let generation = self.schema.generation().await?;
        let schema = &generation.snapshot;
        let target = generation.registry.resolve(name);

        if !self.whitelists.for_kind(target.kind).allows(&target.field) {
            return Err(ToolError::WhitelistRejected(name.to_string()));
        }

        let field = schema
            .root(target.kind)
            .and_then(|root| root.field(&target.field))
            .ok_or_else(|| match target.kind {
                OperationKind::Query => ToolError::UnknownField(target.field.clone()),
                OperationKind::Mutation => ToolError::UnknownMutation(target.field.clone()),
            })?;

        let variables = coerce_arguments(schema, &field.args, arguments);
        let missing = missing_required(&field.args, &variables);
        if !missing.is_empty() {
            return Err(ToolError::MissingArguments(missing));
        }

        let selection = plan_selection(schema, &field.ty);
        let operation = assemble(
            target.kind,
            name,
            &field.name,
            &field.args,
            &variables,
            selection.as_deref(),
        );
        debug!(tool = name, kind = %target.kind, field = %field.name, "Calling tool");
        self.client
            .execute(&operation.document, &variables, &operation.operation_name)
            .await
    }
}
