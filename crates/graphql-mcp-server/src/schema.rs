//! Typed model of a GraphQL type system
//!
//! The model mirrors the shape of a standard introspection response so that a
//! remote schema can be deserialized directly into it. Local SDL files are
//! converted into the same model with `apollo-compiler`.

mod sdl;

use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::naming::OperationKind;

/// The kind of a type, as reported by introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

/// A reference to a type, possibly wrapped in lists and non-null markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    pub fn is_non_null(&self) -> bool {
        self.kind == TypeKind::NonNull
    }

    /// The innermost named type, after removing every list and non-null wrapper
    pub fn base_name(&self) -> Option<&str> {
        match (&self.kind, &self.of_type) {
            (TypeKind::List | TypeKind::NonNull, Some(inner)) => inner.base_name(),
            _ => self.name.as_deref(),
        }
    }
}

/// Renders the type the way it is written in a GraphQL document, e.g. `[ID!]!`
impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.of_type) {
            (TypeKind::NonNull, Some(inner)) => write!(f, "{inner}!"),
            (TypeKind::List, Some(inner)) => write!(f, "[{inner}]"),
            _ => f.write_str(self.name.as_deref().unwrap_or_default()),
        }
    }
}

/// A named type and everything needed to build tools from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullType {
    pub kind: TypeKind,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub input_fields: Option<Vec<InputValue>>,
    #[serde(default)]
    pub enum_values: Option<Vec<EnumValue>>,
}

impl FullType {
    /// Look up an output field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .flatten()
            .find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<InputValue>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl Field {
    /// Whether the field cannot be selected without supplying argument values
    pub fn requires_arguments(&self) -> bool {
        self.args.iter().any(InputValue::is_required)
    }
}

/// An argument or an input object field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl InputValue {
    /// Non-null inputs without a default must be supplied by the caller
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootType {
    pub name: String,
}

/// The `__schema` member of an introspection response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectedSchema {
    #[serde(default)]
    pub query_type: Option<RootType>,
    #[serde(default)]
    pub mutation_type: Option<RootType>,
    pub types: Vec<FullType>,
}

/// The classification of a type reference.
///
/// Interfaces and unions classify as [`TypeClass::Object`] since they are
/// composite output types; a union simply has no fields of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeClass<'a> {
    Scalar(&'a FullType),
    Enum(&'a FullType),
    InputObject(&'a FullType),
    Object(&'a FullType),
    List(&'a TypeRef),
    NonNull(&'a TypeRef),
}

/// An immutable GraphQL type system
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSnapshot {
    query_type: Option<String>,
    mutation_type: Option<String>,
    types: HashMap<String, FullType>,
}

impl SchemaSnapshot {
    /// Parse a schema from SDL text
    pub fn from_sdl(sdl: &str, path: &str) -> Result<Self, crate::errors::SchemaError> {
        sdl::introspect(sdl, path).map(Self::from)
    }

    /// Classify a (possibly wrapped) type reference.
    ///
    /// Returns `None` when a named type does not exist in the schema.
    pub fn classify<'a>(&'a self, ty: &'a TypeRef) -> Option<TypeClass<'a>> {
        match (&ty.kind, &ty.of_type) {
            (TypeKind::NonNull, Some(inner)) => Some(TypeClass::NonNull(inner)),
            (TypeKind::List, Some(inner)) => Some(TypeClass::List(inner)),
            _ => ty.name.as_deref().and_then(|name| self.classify_named(name)),
        }
    }

    /// Classify the innermost named type of a reference
    pub fn classify_base<'a>(&'a self, ty: &'a TypeRef) -> Option<TypeClass<'a>> {
        ty.base_name().and_then(|name| self.classify_named(name))
    }

    fn classify_named(&self, name: &str) -> Option<TypeClass<'_>> {
        let full_type = self.types.get(name)?;
        Some(match full_type.kind {
            TypeKind::Scalar => TypeClass::Scalar(full_type),
            TypeKind::Enum => TypeClass::Enum(full_type),
            TypeKind::InputObject => TypeClass::InputObject(full_type),
            TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
                TypeClass::Object(full_type)
            }
            // Wrappers never carry a name, so a named entry of this kind is malformed
            TypeKind::List | TypeKind::NonNull => return None,
        })
    }

    /// The root type for an operation kind, if the schema defines one
    pub fn root(&self, kind: OperationKind) -> Option<&FullType> {
        let name = match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
        }?;
        self.types.get(name)
    }

    /// The fields of the root type for an operation kind, in schema order
    pub fn root_fields(&self, kind: OperationKind) -> impl Iterator<Item = &Field> {
        self.root(kind)
            .into_iter()
            .flat_map(|root| root.fields.iter().flatten())
    }

    /// Convert back into introspection form
    pub fn to_introspection(&self) -> IntrospectedSchema {
        let mut types: Vec<FullType> = self.types.values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        IntrospectedSchema {
            query_type: self.query_type.clone().map(|name| RootType { name }),
            mutation_type: self.mutation_type.clone().map(|name| RootType { name }),
            types,
        }
    }
}

impl From<IntrospectedSchema> for SchemaSnapshot {
    fn from(schema: IntrospectedSchema) -> Self {
        Self {
            query_type: schema.query_type.map(|root| root.name),
            mutation_type: schema.mutation_type.map(|root| root.name),
            types: schema
                .types
                .into_iter()
                .map(|full_type| (full_type.name.clone(), full_type))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn schema() -> SchemaSnapshot {
        SchemaSnapshot::from_sdl(
            r#"
            type Query {
                continent(code: ID!): Continent
                continents(filter: ContinentFilter): [Continent!]!
                node: Node
                search: SearchResult
            }
            type Continent implements Node { id: ID! code: String name: String }
            interface Node { id: ID! }
            union SearchResult = Continent
            input ContinentFilter { code: String }
            enum Hemisphere { NORTH SOUTH }
            scalar Date
            "#,
            "schema.graphql",
        )
        .unwrap()
    }

    #[rstest]
    #[case(TypeRef::named(TypeKind::Scalar, "Int"), "Int")]
    #[case(TypeRef::non_null(TypeRef::named(TypeKind::Scalar, "ID")), "ID!")]
    #[case(
        TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named(TypeKind::Object, "Continent")))),
        "[Continent!]!"
    )]
    #[case(TypeRef::list(TypeRef::list(TypeRef::named(TypeKind::Scalar, "Int"))), "[[Int]]")]
    fn renders_wrapped_types(#[case] ty: TypeRef, #[case] expected: &str) {
        assert_eq!(ty.to_string(), expected);
    }

    #[test]
    fn base_name_unwraps_every_wrapper() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named(
            TypeKind::Object,
            "Continent",
        ))));
        assert_eq!(ty.base_name(), Some("Continent"));
    }

    #[test]
    fn classifies_every_kind() {
        let schema = schema();
        let query = schema.root(OperationKind::Query).unwrap();

        let continents = query.field("continents").unwrap();
        assert!(matches!(
            schema.classify(&continents.ty),
            Some(TypeClass::NonNull(_))
        ));
        assert!(matches!(
            schema.classify_base(&continents.ty),
            Some(TypeClass::Object(t)) if t.name == "Continent"
        ));
        assert!(matches!(
            schema.classify_base(&continents.args.first().unwrap().ty),
            Some(TypeClass::InputObject(t)) if t.name == "ContinentFilter"
        ));
        assert!(matches!(
            schema.classify(&TypeRef::named(TypeKind::Enum, "Hemisphere")),
            Some(TypeClass::Enum(_))
        ));
        assert!(matches!(
            schema.classify(&TypeRef::named(TypeKind::Scalar, "Date")),
            Some(TypeClass::Scalar(t)) if t.name == "Date"
        ));
        assert!(matches!(
            schema.classify(&TypeRef::list(TypeRef::named(TypeKind::Scalar, "Int"))),
            Some(TypeClass::List(_))
        ));
    }

    #[test]
    fn interfaces_and_unions_classify_as_objects() {
        let schema = schema();
        let query = schema.root(OperationKind::Query).unwrap();
        for name in ["node", "search"] {
            let field = query.field(name).unwrap();
            assert!(matches!(
                schema.classify_base(&field.ty),
                Some(TypeClass::Object(_))
            ));
        }
    }

    #[test]
    fn unknown_types_are_unclassified() {
        let schema = schema();
        assert_eq!(
            schema.classify(&TypeRef::named(TypeKind::Object, "Missing")),
            None
        );
    }

    #[test]
    fn required_arguments() {
        let schema = schema();
        let query = schema.root(OperationKind::Query).unwrap();
        assert!(query.field("continent").unwrap().requires_arguments());
        assert!(!query.field("continents").unwrap().requires_arguments());
    }

    #[test]
    fn round_trips_through_introspection_json() {
        let schema = schema();
        let json = serde_json::to_value(schema.to_introspection()).unwrap();
        let parsed: IntrospectedSchema = serde_json::from_value(json).unwrap();
        assert_eq!(SchemaSnapshot::from(parsed), schema);
    }

    #[test]
    fn deserializes_introspection_kinds() {
        let ty: TypeRef = serde_json::from_value(serde_json::json!({
            "kind": "NON_NULL",
            "name": null,
            "ofType": { "kind": "INPUT_OBJECT", "name": "ContinentFilter", "ofType": null }
        }))
        .unwrap();
        assert_eq!(ty.to_string(), "ContinentFilter!");
        assert_eq!(ty.of_type.unwrap().kind, TypeKind::InputObject);
    }
}
