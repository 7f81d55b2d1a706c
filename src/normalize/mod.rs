// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Normalizers that turn raw model, twin and OPC-UA JSON into flat, pre-ordered row lists.

pub mod models;
pub mod opcua;
pub mod schema;
pub mod twins;

use serde_json::Value;

pub use models::{
    incoming_relationships, normalize_models, ModelDiagnostic, ModelIndex, NormalizedModels,
    RelationshipDecl,
};
pub use opcua::{normalize_opcua, NormalizedOpcua};
pub use schema::{resolve_schema, SchemaError, SchemaResolver, MAX_SCHEMA_DEPTH};
pub use twins::{filter_by_model, normalize_twins, NormalizedTwins, TwinGroups, NEW_TWIN_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Invalid input file ({reason})")]
    InvalidInput { reason: String },
    #[error("Invalid input file (property '{property}': {source})")]
    Schema {
        property: String,
        #[source]
        source: SchemaError,
    },
}

impl NormalizeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput { reason: reason.into() }
    }
}

/// Unwraps the accepted document shapes into a list of entries: a bare array, a
/// `{ "value": [...] }` query page, or a single object.
pub(crate) fn entries(input: &Value, what: &str) -> Result<Vec<Value>, NormalizeError> {
    match input {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(object) => match object.get("value") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(NormalizeError::invalid(format!("'value' of the {what} page is not an array"))),
            None => Ok(vec![input.clone()]),
        },
        _ => Err(NormalizeError::invalid(format!("expected an array of {what}"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{entries, NormalizeError};

    #[test]
    fn entries_accept_array_envelope_and_single_object() {
        assert_eq!(entries(&json!([{"a": 1}, {"a": 2}]), "twins").expect("array").len(), 2);
        assert_eq!(entries(&json!({"value": [{"a": 1}]}), "twins").expect("page").len(), 1);
        assert_eq!(entries(&json!({"a": 1}), "twins").expect("single").len(), 1);
    }

    #[test]
    fn scalar_documents_are_invalid_input() {
        let err = entries(&json!("nope"), "interfaces").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input file (expected an array of interfaces)");
        assert!(matches!(err, NormalizeError::InvalidInput { .. }));
    }
}
