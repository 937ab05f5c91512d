//! Sources the schema can be fetched from

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::SchemaError;
use crate::graphql::GraphQLClient;
use crate::schema::SchemaSnapshot;

/// Produces a fresh schema on every call
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self) -> Result<SchemaSnapshot, SchemaError>;
}

/// Introspects the upstream GraphQL endpoint
pub struct IntrospectionFetcher {
    client: GraphQLClient,
}

impl IntrospectionFetcher {
    pub fn new(client: GraphQLClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchemaFetcher for IntrospectionFetcher {
    async fn fetch(&self) -> Result<SchemaSnapshot, SchemaError> {
        info!(endpoint = %self.client.endpoint(), "Introspecting GraphQL schema");
        self.client.introspect().await.map(SchemaSnapshot::from)
    }
}

/// Reads a schema from an SDL file
pub struct LocalSchemaFetcher {
    path: PathBuf,
}

impl LocalSchemaFetcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SchemaFetcher for LocalSchemaFetcher {
    async fn fetch(&self) -> Result<SchemaSnapshot, SchemaError> {
        let path = self.path.display().to_string();
        debug!(path, "Reading GraphQL schema");
        let sdl = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|error| SchemaError::ReadFile {
                path: path.clone(),
                message: error.to_string(),
            })?;
        SchemaSnapshot::from_sdl(&sdl, &path)
    }
}
