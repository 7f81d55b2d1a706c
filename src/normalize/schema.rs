// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Property schema classification.
//!
//! Inline schemas are plain JSON trees and cannot loop, but a string schema may name an
//! interface-level `schemas` entry, and those named entries can reference each other. Named
//! references are tracked on a stack and a repeat is reported as [`SchemaError::Cycle`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::model::{EnumEntry, FieldDescriptor, MapSlot, PropertyDescriptor};

/// Maximum nesting of inline object/array/map schemas.
pub const MAX_SCHEMA_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema is missing")]
    Missing,
    #[error("unsupported schema value {0}")]
    Unsupported(String),
    #[error("{kind} schema is missing '{field}'")]
    MissingField { kind: &'static str, field: &'static str },
    #[error("cyclic schema reference '{0}'")]
    Cycle(String),
    #[error("schema nesting exceeds {} levels", MAX_SCHEMA_DEPTH)]
    TooDeep,
}

/// Resolves raw schema values, optionally against the named schemas of one interface.
#[derive(Debug, Default)]
pub struct SchemaResolver<'a> {
    named: HashMap<&'a str, &'a Value>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every entry of an interface `schemas` array that carries an `@id`.
    pub fn with_named(schemas: &'a [Value]) -> Self {
        let named = schemas
            .iter()
            .filter_map(|schema| Some((schema.get("@id")?.as_str()?, schema)))
            .collect();
        Self { named }
    }

    pub fn resolve(&self, raw: &Value) -> Result<PropertyDescriptor, SchemaError> {
        let mut visiting = Vec::new();
        self.resolve_at(raw, &mut visiting, 0)
    }

    fn resolve_at(
        &self,
        raw: &Value,
        visiting: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<PropertyDescriptor, SchemaError> {
        if depth > MAX_SCHEMA_DEPTH {
            return Err(SchemaError::TooDeep);
        }

        match raw {
            Value::Null => Err(SchemaError::Missing),
            Value::String(name) => self.resolve_name(name, visiting, depth),
            Value::Object(object) => self.resolve_object(object, visiting, depth),
            other => Err(SchemaError::Unsupported(other.to_string())),
        }
    }

    fn resolve_name(
        &self,
        name: &str,
        visiting: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<PropertyDescriptor, SchemaError> {
        let Some((&id, &definition)) = self.named.get_key_value(name) else {
            return Ok(PropertyDescriptor::scalar(name));
        };
        if visiting.contains(&id) {
            return Err(SchemaError::Cycle(id.to_owned()));
        }

        visiting.push(id);
        let resolved = self.resolve_at(definition, visiting, depth + 1);
        visiting.pop();
        resolved
    }

    fn resolve_object(
        &self,
        object: &Map<String, Value>,
        visiting: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<PropertyDescriptor, SchemaError> {
        // A Property carries both `@type` and `schema`, so complex markers are checked first and
        // the `{ schema: .. }` wrapper last.
        if let Some(fields) = object.get("fields") {
            let fields = fields
                .as_array()
                .ok_or(SchemaError::MissingField { kind: "object", field: "fields" })?;
            let fields = fields
                .iter()
                .map(|field| -> Result<FieldDescriptor, SchemaError> {
                    let name = field
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or(SchemaError::MissingField { kind: "object field", field: "name" })?;
                    let schema = field.get("schema").unwrap_or(&Value::Null);
                    Ok(FieldDescriptor {
                        name: name.to_owned(),
                        schema: self.resolve_at(schema, visiting, depth + 1)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            return Ok(PropertyDescriptor::Object { fields });
        }

        if let Some(element) = object.get("elementSchema") {
            let element = self.resolve_at(element, visiting, depth + 1)?;
            return Ok(PropertyDescriptor::Array { element: Box::new(element) });
        }

        if let Some(values) = object.get("enumValues") {
            let values = values
                .as_array()
                .ok_or(SchemaError::MissingField { kind: "enum", field: "enumValues" })?;
            let entries = values.iter().map(enum_entry).collect::<Result<Vec<_>, _>>()?;
            return Ok(PropertyDescriptor::Enum { entries });
        }

        if object.contains_key("mapKey") || object.contains_key("mapValue") {
            let key = self.map_slot(object.get("mapKey"), "mapKey", visiting, depth)?;
            let value = self.map_slot(object.get("mapValue"), "mapValue", visiting, depth)?;
            return Ok(PropertyDescriptor::Map { key, value });
        }

        if let Some(inner) = object.get("schema") {
            return self.resolve_at(inner, visiting, depth + 1);
        }

        Err(SchemaError::Unsupported(Value::Object(object.clone()).to_string()))
    }

    fn map_slot(
        &self,
        slot: Option<&Value>,
        field: &'static str,
        visiting: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<MapSlot, SchemaError> {
        let slot = slot.ok_or(SchemaError::MissingField { kind: "map", field })?;
        let name = slot
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SchemaError::MissingField { kind: "map", field })?;
        let schema = slot.get("schema").unwrap_or(&Value::Null);
        let resolved = self.resolve_at(schema, visiting, depth + 1)?;
        Ok(MapSlot { name: name.to_owned(), schema_kind: resolved.schema_kind().into() })
    }
}

fn enum_entry(value: &Value) -> Result<EnumEntry, SchemaError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or(SchemaError::MissingField { kind: "enum value", field: "name" })?;
    let raw = value
        .get("enumValue")
        .ok_or(SchemaError::MissingField { kind: "enum value", field: "enumValue" })?;
    let value = match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Ok(EnumEntry { name: name.to_owned(), value })
}

/// Resolves a schema that does not reference any named schemas.
pub fn resolve_schema(raw: &Value) -> Result<PropertyDescriptor, SchemaError> {
    SchemaResolver::new().resolve(raw)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{json, Value};

    use super::{resolve_schema, SchemaError, SchemaResolver, MAX_SCHEMA_DEPTH};
    use crate::model::PropertyDescriptor;

    #[rstest]
    #[case(json!("string"), "string")]
    #[case(json!("dateTime"), "dateTime")]
    #[case(json!({"schema": "double"}), "double")]
    #[case(json!({"@type": "Property", "schema": {"@type": "Array", "elementSchema": "integer"}}), "array")]
    #[case(json!({"@type": "Object", "fields": []}), "object")]
    #[case(json!({"@type": "Enum", "enumValues": []}), "enum")]
    fn classifies_schema_kind(#[case] raw: Value, #[case] expected: &str) {
        let descriptor = resolve_schema(&raw).expect("resolve");
        assert_eq!(descriptor.schema_kind(), expected);
    }

    #[test]
    fn map_schema_resolves_key_and_value_slots() {
        let raw = json!({
            "@type": "Map",
            "mapKey": {"name": "k", "schema": "string"},
            "mapValue": {"name": "v", "schema": "double"}
        });
        let descriptor = resolve_schema(&raw).expect("resolve");

        let (key, value) = descriptor.map_slots().expect("map slots");
        assert_eq!(descriptor.schema_kind(), "map");
        assert_eq!((key.name.as_str(), key.schema_kind.as_str()), ("k", "string"));
        assert_eq!((value.name.as_str(), value.schema_kind.as_str()), ("v", "double"));
        assert!(descriptor.nested().is_empty());
        assert!(descriptor.enum_entries().is_empty());
        assert_eq!(descriptor.element_type(), None);
    }

    #[test]
    fn object_fields_recurse_into_nested_objects() {
        let raw = json!({
            "@type": "Object",
            "fields": [
                {"name": "start", "schema": "time"},
                {"name": "window", "schema": {
                    "@type": "Object",
                    "fields": [{"name": "days", "schema": {"@type": "Array", "elementSchema": "string"}}]
                }}
            ]
        });
        let descriptor = resolve_schema(&raw).expect("resolve");

        let fields = descriptor.nested();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].schema, PropertyDescriptor::scalar("time"));
        let inner = fields[1].schema.nested();
        assert_eq!(inner[0].name, "days");
        assert_eq!(inner[0].schema.element_type(), Some("string"));
    }

    #[test]
    fn enum_values_keep_declaration_order_and_stringify_numbers() {
        let raw = json!({
            "@type": "Enum",
            "enumValues": [{"name": "off", "enumValue": 0}, {"name": "on", "enumValue": "1"}]
        });
        let descriptor = resolve_schema(&raw).expect("resolve");
        let entries = descriptor.enum_entries();
        assert_eq!(entries[0].name, "off");
        assert_eq!(entries[0].value, "0");
        assert_eq!(entries[1].value, "1");
    }

    #[test]
    fn named_schema_reference_resolves_through_interface_schemas() {
        let schemas = vec![json!({
            "@id": "dtmi:example:Mode;1",
            "@type": "Enum",
            "enumValues": [{"name": "auto", "enumValue": 0}]
        })];
        let resolver = SchemaResolver::with_named(&schemas);
        let descriptor = resolver.resolve(&json!("dtmi:example:Mode;1")).expect("resolve");
        assert_eq!(descriptor.schema_kind(), "enum");
    }

    #[test]
    fn cyclic_named_schema_is_an_error() {
        let schemas = vec![
            json!({"@id": "dtmi:x:A;1", "@type": "Array", "elementSchema": "dtmi:x:B;1"}),
            json!({"@id": "dtmi:x:B;1", "@type": "Object", "fields": [{"name": "a", "schema": "dtmi:x:A;1"}]}),
        ];
        let resolver = SchemaResolver::with_named(&schemas);
        let err = resolver.resolve(&json!("dtmi:x:A;1")).unwrap_err();
        assert_eq!(err, SchemaError::Cycle("dtmi:x:A;1".to_owned()));
    }

    #[test]
    fn deep_inline_nesting_is_bounded() {
        let mut raw = json!("double");
        for _ in 0..=MAX_SCHEMA_DEPTH + 1 {
            raw = json!({"@type": "Array", "elementSchema": raw});
        }
        assert_eq!(resolve_schema(&raw).unwrap_err(), SchemaError::TooDeep);
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(42))]
    #[case(json!({"@type": "Object"}))]
    #[case(json!({"@type": "Map", "mapKey": {"name": "k", "schema": "string"}}))]
    fn malformed_schemas_are_rejected(#[case] raw: Value) {
        assert!(resolve_schema(&raw).is_err());
    }
}
