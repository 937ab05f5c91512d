use schemars::{Schema, SchemaGenerator, json_schema};

/// Header names are HTTP tokens; values are sent verbatim
pub(super) fn header_map(_generator: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "propertyNames": { "pattern": "^[!#$%&'*+.^_`|~0-9A-Za-z-]+$" },
        "additionalProperties": { "type": "string" },
    })
}

/// Levels accepted by `tracing`, matched case-insensitively
pub(super) fn level(_generator: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "description": "Log level",
        "type": "string",
        "enum": ["trace", "debug", "info", "warn", "error"],
    })
}
