//! Rendering a GraphQL document for a single root field

use serde_json::{Map, Value};

use crate::naming::OperationKind;
use crate::schema::InputValue;
use crate::selection::{self, Selection};

/// A generated operation, ready to be executed
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledOperation {
    pub document: String,
    pub operation_name: String,
}

/// Derive an operation name from a tool name, e.g. `mutation_createUser` -> `MutationCreateUser`
pub fn operation_name(tool_name: &str) -> String {
    tool_name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

/// Assemble the document selecting `field` with the given variables.
///
/// Only arguments present in `variables` are declared and passed, in the order
/// the schema declares them.
pub fn assemble(
    kind: OperationKind,
    tool_name: &str,
    field: &str,
    declared: &[InputValue],
    variables: &Map<String, Value>,
    selection: Option<&[Selection]>,
) -> AssembledOperation {
    let present: Vec<&InputValue> = declared
        .iter()
        .filter(|argument| variables.contains_key(&argument.name))
        .collect();

    let variable_definitions = parenthesized(
        present
            .iter()
            .map(|argument| format!("${}: {}", argument.name, argument.ty)),
    );
    let field_arguments = parenthesized(
        present
            .iter()
            .map(|argument| format!("{0}: ${0}", argument.name)),
    );
    let selection_set = selection
        .filter(|selections| !selections.is_empty())
        .map(|selections| format!(" {{ {} }}", selection::render(selections)))
        .unwrap_or_default();

    let operation_name = operation_name(tool_name);
    AssembledOperation {
        document: format!(
            "{kind} {operation_name}{variable_definitions} {{ {field}{field_arguments}{selection_set} }}"
        ),
        operation_name,
    }
}

fn parenthesized(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        String::new()
    } else {
        format!("({})", items.join(", "))
    }
}
