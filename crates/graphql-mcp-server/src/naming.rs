//! Mapping between external tool names and schema fields

use std::collections::HashMap;
use std::fmt::{self, Display};

use tracing::warn;

use crate::schema::SchemaSnapshot;

/// Tool names longer than this are truncated
pub const MAX_TOOL_NAME_LENGTH: usize = 64;

/// Prefix distinguishing mutation tools from query tools
pub const MUTATION_PREFIX: &str = "mutation_";

/// The kind of operation a tool executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        })
    }
}

/// The schema field a tool executes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolTarget {
    pub kind: OperationKind,
    pub field: String,
}

impl ToolTarget {
    pub fn query(field: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Query,
            field: field.into(),
        }
    }

    pub fn mutation(field: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Mutation,
            field: field.into(),
        }
    }

    /// The untruncated external name, e.g. `mutation_createUser`
    fn full_name(&self) -> String {
        match self.kind {
            OperationKind::Query => self.field.clone(),
            OperationKind::Mutation => format!("{MUTATION_PREFIX}{}", self.field),
        }
    }

    /// The external name, truncated to [`MAX_TOOL_NAME_LENGTH`].
    ///
    /// Only the field portion is shortened, so mutation tools keep their prefix.
    fn external_name(&self) -> String {
        let prefix = match self.kind {
            OperationKind::Query => "",
            OperationKind::Mutation => MUTATION_PREFIX,
        };
        let field: String = self
            .field
            .chars()
            .take(MAX_TOOL_NAME_LENGTH - prefix.len())
            .collect();
        format!("{prefix}{field}")
    }
}

/// Bidirectional mapping between external tool names and schema fields.
///
/// Only names that differ from what [`NameRegistry::resolve`] would infer
/// (i.e. truncated names) are stored. When two fields truncate to the same
/// name, the last one recorded wins and the earlier field loses its tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameRegistry {
    targets: HashMap<String, ToolTarget>,
    names: HashMap<ToolTarget, String>,
}

impl NameRegistry {
    /// Record the external names of every root field in a schema
    pub fn for_schema(schema: &SchemaSnapshot) -> Self {
        let mut registry = Self::default();
        for kind in [OperationKind::Query, OperationKind::Mutation] {
            for field in schema.root_fields(kind) {
                registry.canonicalize(ToolTarget {
                    kind,
                    field: field.name.clone(),
                });
            }
        }
        registry
    }

    /// Compute the external name for a field, recording it if it was truncated
    pub fn canonicalize(&mut self, target: ToolTarget) -> String {
        let external = target.external_name();
        if external != target.full_name() {
            self.record(external.clone(), target);
        }
        external
    }

    fn record(&mut self, external: String, target: ToolTarget) {
        if let Some(previous) = self.targets.insert(external.clone(), target.clone()) {
            if previous != target {
                warn!(
                    tool = %external,
                    replaced = %previous.field,
                    field = %target.field,
                    "Truncated tool names collide"
                );
                self.names.remove(&previous);
            }
        }
        self.names.insert(target, external);
    }

    /// The external name a field is exposed under
    pub fn external_name(&self, target: &ToolTarget) -> String {
        self.names
            .get(target)
            .cloned()
            .unwrap_or_else(|| target.external_name())
    }

    /// Resolve an external name to the field it executes.
    ///
    /// Unregistered names are taken literally, routed by the mutation prefix.
    pub fn resolve(&self, external: &str) -> ToolTarget {
        if let Some(target) = self.targets.get(external) {
            return target.clone();
        }
        match external.strip_prefix(MUTATION_PREFIX) {
            Some(field) => ToolTarget::mutation(field),
            None => ToolTarget::query(external),
        }
    }

    /// Whether an external name is the one currently assigned to a field
    pub fn owns(&self, external: &str, target: &ToolTarget) -> bool {
        self.resolve(external) == *target
    }
}
