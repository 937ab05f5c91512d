//! Build an introspection-shaped model from SDL text

use apollo_compiler::ast::{self, OperationType};
use apollo_compiler::schema::{Component, ExtendedType, FieldDefinition, InputValueDefinition};
use apollo_compiler::{Node, Schema};

use super::{EnumValue, Field, FullType, InputValue, IntrospectedSchema, RootType, TypeKind, TypeRef};
use crate::errors::SchemaError;

pub(super) fn introspect(sdl: &str, path: &str) -> Result<IntrospectedSchema, SchemaError> {
    let schema = Schema::parse_and_validate(sdl, path)
        .map_err(|errors| SchemaError::Sdl(errors.to_string()))?;

    let root = |operation_type| {
        schema
            .root_operation(operation_type)
            .map(|name| RootType {
                name: name.to_string(),
            })
    };

    Ok(IntrospectedSchema {
        query_type: root(OperationType::Query),
        mutation_type: root(OperationType::Mutation),
        types: schema
            .types
            .values()
            .map(|extended_type| full_type(&schema, extended_type))
            .collect(),
    })
}

fn full_type(schema: &Schema, extended_type: &ExtendedType) -> FullType {
    let describe = |description: &Option<Node<str>>| description.as_ref().map(|d| d.to_string());
    let mut full_type = FullType {
        kind: kind_of(extended_type),
        name: extended_type.name().to_string(),
        description: None,
        fields: None,
        input_fields: None,
        enum_values: None,
    };

    match extended_type {
        ExtendedType::Scalar(scalar) => full_type.description = describe(&scalar.description),
        ExtendedType::Object(object) => {
            full_type.description = describe(&object.description);
            full_type.fields = Some(fields(schema, object.fields.values()));
        }
        ExtendedType::Interface(interface) => {
            full_type.description = describe(&interface.description);
            full_type.fields = Some(fields(schema, interface.fields.values()));
        }
        ExtendedType::Union(union) => full_type.description = describe(&union.description),
        ExtendedType::Enum(r#enum) => {
            full_type.description = describe(&r#enum.description);
            full_type.enum_values = Some(
                r#enum
                    .values
                    .values()
                    .map(|value| EnumValue {
                        name: value.value.to_string(),
                        description: describe(&value.description),
                    })
                    .collect(),
            );
        }
        ExtendedType::InputObject(input) => {
            full_type.description = describe(&input.description);
            full_type.input_fields = Some(
                input
                    .fields
                    .values()
                    .map(|field| input_value(schema, field))
                    .collect(),
            );
        }
    }

    full_type
}

fn fields<'a>(
    schema: &Schema,
    definitions: impl Iterator<Item = &'a Component<FieldDefinition>>,
) -> Vec<Field> {
    definitions
        .map(|field| Field {
            name: field.name.to_string(),
            description: field.description.as_ref().map(|d| d.to_string()),
            args: field
                .arguments
                .iter()
                .map(|argument| input_value(schema, argument))
                .collect(),
            ty: type_ref(schema, &field.ty),
        })
        .collect()
}

fn input_value(schema: &Schema, definition: &InputValueDefinition) -> InputValue {
    InputValue {
        name: definition.name.to_string(),
        description: definition.description.as_ref().map(|d| d.to_string()),
        ty: type_ref(schema, &definition.ty),
        default_value: definition.default_value.as_ref().map(|value| value.to_string()),
    }
}

fn type_ref(schema: &Schema, ty: &ast::Type) -> TypeRef {
    let named = |name: &ast::NamedType| {
        let kind = schema
            .types
            .get(name)
            .map(kind_of)
            .unwrap_or(TypeKind::Scalar);
        TypeRef::named(kind, name.to_string())
    };
    match ty {
        ast::Type::Named(name) => named(name),
        ast::Type::NonNullNamed(name) => TypeRef::non_null(named(name)),
        ast::Type::List(inner) => TypeRef::list(type_ref(schema, inner)),
        ast::Type::NonNullList(inner) => TypeRef::non_null(TypeRef::list(type_ref(schema, inner))),
    }
}

fn kind_of(extended_type: &ExtendedType) -> TypeKind {
    match extended_type {
        ExtendedType::Scalar(_) => TypeKind::Scalar,
        ExtendedType::Object(_) => TypeKind::Object,
        ExtendedType::Interface(_) => TypeKind::Interface,
        ExtendedType::Union(_) => TypeKind::Union,
        ExtendedType::Enum(_) => TypeKind::Enum,
        ExtendedType::InputObject(_) => TypeKind::InputObject,
    }
}
