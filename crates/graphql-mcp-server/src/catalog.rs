//! Tool definitions generated from the root fields of a schema

use schemars::{Schema, json_schema};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::naming::{NameRegistry, OperationKind, ToolTarget};
use crate::schema::{Field, InputValue, SchemaSnapshot, TypeClass, TypeKind, TypeRef};
use crate::whitelist::Whitelist;

/// A callable tool, as listed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Schema,
}

/// The whitelists for both operation kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Whitelists {
    pub query: Whitelist,
    pub mutation: Whitelist,
}

impl Whitelists {
    pub fn for_kind(&self, kind: OperationKind) -> &Whitelist {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
        }
    }
}

/// Build the tools for every allowed query field followed by every allowed mutation field
pub fn build_catalog(
    schema: &SchemaSnapshot,
    registry: &NameRegistry,
    whitelists: &Whitelists,
) -> Vec<ToolDefinition> {
    [OperationKind::Query, OperationKind::Mutation]
        .into_iter()
        .flat_map(|kind| {
            let whitelist = whitelists.for_kind(kind);
            schema
                .root_fields(kind)
                .filter(|field| whitelist.allows(&field.name))
                .filter_map(move |field| tool_definition(schema, registry, kind, field))
        })
        .collect()
}

fn tool_definition(
    schema: &SchemaSnapshot,
    registry: &NameRegistry,
    kind: OperationKind,
    field: &Field,
) -> Option<ToolDefinition> {
    let target = ToolTarget {
        kind,
        field: field.name.clone(),
    };
    let name = registry.external_name(&target);
    if !registry.owns(&name, &target) {
        // Another field won the truncated name
        debug!(tool = %name, field = %field.name, "Skipping field shadowed by a colliding tool name");
        return None;
    }

    Some(ToolDefinition {
        name,
        description: field
            .description
            .clone()
            .filter(|description| !description.trim().is_empty())
            .unwrap_or_else(|| type_description(&field.ty)),
        input_schema: input_schema(schema, &field.args),
    })
}

fn type_description(ty: &TypeRef) -> String {
    let type_name = ty.base_name().unwrap_or_default();
    let optional = if ty.is_non_null() {
        ""
    } else {
        "is optional and "
    };
    let unwrapped = match (&ty.kind, &ty.of_type) {
        (TypeKind::NonNull, Some(inner)) => inner,
        _ => ty,
    };
    let array = if unwrapped.kind == TypeKind::List {
        "is an array of type"
    } else {
        "has type"
    };
    format!("The returned value {optional}{array} `{type_name}`")
}

fn input_schema(schema: &SchemaSnapshot, args: &[InputValue]) -> Schema {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for arg in args {
        properties.insert(arg.name.clone(), argument_schema(schema, arg).into());
        if arg.ty.is_non_null() {
            required.push(Value::String(arg.name.clone()));
        }
    }

    let mut input_schema = json_schema!({"type": "object", "properties": properties});
    if !required.is_empty() {
        input_schema.insert("required".to_string(), Value::Array(required));
    }
    input_schema
}

fn argument_schema(schema: &SchemaSnapshot, arg: &InputValue) -> Schema {
    let mut argument_schema = match schema.classify_base(&arg.ty) {
        Some(TypeClass::Scalar(scalar)) => match scalar.name.as_str() {
            "Int" => json_schema!({"type": "integer"}),
            "Float" => json_schema!({"type": "number"}),
            "Boolean" => json_schema!({"type": "boolean"}),
            _ => json_schema!({"type": "string"}),
        },
        Some(TypeClass::Enum(r#enum)) => {
            let values: Vec<Value> = r#enum
                .enum_values
                .iter()
                .flatten()
                .map(|value| Value::String(value.name.clone()))
                .collect();
            json_schema!({"type": "string", "enum": values})
        }
        Some(TypeClass::InputObject(_)) => json_schema!({"type": "object"}),
        _ => json_schema!({"type": "string"}),
    };

    let description = match &arg.description {
        Some(description) if !description.trim().is_empty() => {
            format!("{description} (GraphQL type: {})", arg.ty)
        }
        _ => format!("GraphQL type: {}", arg.ty),
    };
    argument_schema.insert("description".to_string(), Value::String(description));
    argument_schema
}
