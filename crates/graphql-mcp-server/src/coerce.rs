//! Converting caller-supplied JSON into GraphQL variables

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::schema::{InputValue, SchemaSnapshot, TypeClass, TypeRef};

/// Coerce raw tool arguments into variables for the declared arguments.
///
/// Arguments the field does not declare are dropped. A value that coerces to
/// `null` is dropped unless its argument is required.
pub fn coerce_arguments(
    schema: &SchemaSnapshot,
    declared: &[InputValue],
    raw: Map<String, Value>,
) -> Map<String, Value> {
    let mut variables = Map::new();
    for (name, value) in raw {
        let Some(argument) = declared.iter().find(|argument| argument.name == name) else {
            debug!(argument = %name, "Dropping undeclared argument");
            continue;
        };
        let coerced = coerce_value(schema, &argument.ty, value, argument.ty.is_non_null());
        if coerced.is_null() && !argument.ty.is_non_null() {
            continue;
        }
        variables.insert(name, coerced);
    }
    variables
}

/// The required arguments that are absent or `null` after coercion
pub fn missing_required(declared: &[InputValue], variables: &Map<String, Value>) -> Vec<String> {
    declared
        .iter()
        .filter(|argument| argument.is_required())
        .filter(|argument| variables.get(&argument.name).is_none_or(Value::is_null))
        .map(|argument| argument.name.clone())
        .collect()
}

fn coerce_value(schema: &SchemaSnapshot, ty: &TypeRef, value: Value, non_null: bool) -> Value {
    match schema.classify(ty) {
        Some(TypeClass::NonNull(inner)) => coerce_value(schema, inner, value, true),
        Some(TypeClass::List(element)) => coerce_list(schema, element, value),
        Some(TypeClass::InputObject(_)) => coerce_input_object(value, non_null),
        Some(TypeClass::Enum(_)) => match value {
            Value::Null | Value::String(_) => value,
            other => Value::String(other.to_string()),
        },
        Some(TypeClass::Scalar(scalar)) => match scalar.name.as_str() {
            "Int" => coerce_int(value),
            "Float" => coerce_float(value),
            "Boolean" => coerce_boolean(value),
            _ => value,
        },
        Some(TypeClass::Object(_)) | None => value,
    }
}

fn coerce_list(schema: &SchemaSnapshot, element: &TypeRef, value: Value) -> Value {
    let value = match value {
        Value::String(text) if text.trim_start().starts_with('[') => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        other => other,
    };
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| coerce_value(schema, element, item, false))
                .collect(),
        ),
        Value::Null => Value::Null,
        single => coerce_value(schema, element, single, false),
    }
}

fn coerce_input_object(value: Value, non_null: bool) -> Value {
    let empty = || {
        if non_null {
            Value::Object(Map::new())
        } else {
            Value::Null
        }
    };
    match value {
        Value::String(text) if text.is_empty() => empty(),
        Value::String(text) if text.trim_start().starts_with('{') => {
            serde_json::from_str(&text).unwrap_or_else(|_| empty())
        }
        other => other,
    }
}

fn coerce_int(value: Value) -> Value {
    match value {
        Value::Number(number) if number.is_i64() || number.is_u64() => Value::Number(number),
        Value::Number(number) => number
            .as_f64()
            .filter(|float| float.is_finite())
            .map(|float| Value::from(float.trunc() as i64))
            .unwrap_or(Value::Null),
        Value::String(text) => leading_integer(&text).map_or(Value::Null, Value::from),
        _ => Value::Null,
    }
}

/// Parse the integer at the start of a string, ignoring anything after it
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(['-', '+']));
    let digits = text
        .get(digits_start..)?
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    text.get(..digits_start + digits)?.parse().ok()
}

fn coerce_float(value: Value) -> Value {
    match value {
        Value::Number(number) => Value::Number(number),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        _ => Value::Null,
    }
}

fn coerce_boolean(value: Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) => value,
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Bool(!text.is_empty()),
        },
        Value::Number(number) => Value::Bool(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::Array(_) | Value::Object(_) => Value::Bool(true),
    }
}
