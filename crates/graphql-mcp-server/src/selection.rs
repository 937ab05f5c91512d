//! Choosing which result fields a generated operation fetches

use std::collections::HashSet;
use std::fmt::{self, Display};

use crate::schema::{FullType, SchemaSnapshot, TypeClass, TypeRef};

/// How deep below the root field object types are expanded
const MAX_DEPTH: usize = 2;

/// How many sub-fields a nested object keeps
const MAX_NESTED_FIELDS: usize = 3;

/// One entry of a selection set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Field(String),
    Nested {
        name: String,
        children: Vec<Selection>,
    },
}

impl Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Field(name) => f.write_str(name),
            Selection::Nested { name, children } => {
                write!(f, "{name} {{ {} }}", render(children))
            }
        }
    }
}

/// Render a selection set body, without the enclosing braces
pub fn render(selections: &[Selection]) -> String {
    selections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plan the selection set for a root field returning `return_type`.
///
/// Returns `None` when the return type is a leaf and takes no selection.
/// Fields that require arguments are never selected. Object types are only
/// expanded once across the whole traversal.
pub fn plan_selection(schema: &SchemaSnapshot, return_type: &TypeRef) -> Option<Vec<Selection>> {
    let Some(TypeClass::Object(root)) = schema.classify_base(return_type) else {
        return None;
    };

    let mut visited = HashSet::from([root.name.clone()]);
    let selections = plan_fields(schema, root, 1, &mut visited);
    if selections.is_empty() {
        return Some(vec![Selection::Field("__typename".to_string())]);
    }
    Some(selections)
}

fn plan_fields(
    schema: &SchemaSnapshot,
    object: &FullType,
    depth: usize,
    visited: &mut HashSet<String>,
) -> Vec<Selection> {
    let mut selections = Vec::new();
    for field in object.fields.iter().flatten() {
        if field.requires_arguments() {
            continue;
        }
        match schema.classify_base(&field.ty) {
            Some(TypeClass::Scalar(_) | TypeClass::Enum(_)) => {
                selections.push(Selection::Field(field.name.clone()));
            }
            Some(TypeClass::Object(nested)) if depth < MAX_DEPTH => {
                if !visited.insert(nested.name.clone()) {
                    continue;
                }
                let children: Vec<Selection> = plan_fields(schema, nested, depth + 1, visited)
                    .into_iter()
                    .take(MAX_NESTED_FIELDS)
                    .collect();
                if !children.is_empty() {
                    selections.push(Selection::Nested {
                        name: field.name.clone(),
                        children,
                    });
                }
            }
            _ => {}
        }
    }
    selections
}
