// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Input shapes for DTDL interface definitions, twin query results, OPC-UA tags and staged
//! draft twins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::ParentRelationship;

/// `@type` is either a single type name or a list (`["Property", "Temperature"]`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    One(String),
    Many(Vec<String>),
}

impl TypeTag {
    pub fn is(&self, name: &str) -> bool {
        match self {
            Self::One(tag) => tag.eq_ignore_ascii_case(name),
            Self::Many(tags) => tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInterface {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<Value>,
    #[serde(default)]
    pub contents: Vec<RawContent>,
    /// Interface-level named schemas that properties may reference by `@id`.
    #[serde(default)]
    pub schemas: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContent {
    #[serde(rename = "@type")]
    pub kind: TypeTag,
    pub name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<Value>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTwin {
    #[serde(rename = "$dtId")]
    pub id: String,
    #[serde(rename = "$metadata")]
    pub metadata: RawTwinMetadata,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, alias = "incomingRelationships")]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTwinMetadata {
    #[serde(rename = "$model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationship {
    #[serde(rename = "$relationshipName", alias = "name")]
    pub name: String,
    #[serde(rename = "$sourceId", alias = "sourceId")]
    pub source_id: String,
}

impl From<&RawRelationship> for ParentRelationship {
    fn from(raw: &RawRelationship) -> Self {
        Self { name: raw.name.clone(), display_name: None, source: raw.source_id.clone() }
    }
}

/// One entry of an OPC-UA `tags` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTag {
    pub node_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    /// Members of a `complex` tag.
    #[serde(default)]
    pub properties: Vec<RawTagProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTagProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub properties: Vec<RawTagProperty>,
}

/// A twin the operator is staging that does not exist in the backing store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftTwin {
    pub model_id: String,
    pub twin_id: String,
    #[serde(default, alias = "parentRelationships", skip_serializing_if = "Vec::is_empty")]
    pub parent_rels: Vec<ParentRelationship>,
}

impl DraftTwin {
    pub fn new(model_id: impl Into<String>, twin_id: impl Into<String>) -> Self {
        Self { model_id: model_id.into(), twin_id: twin_id.into(), parent_rels: Vec::new() }
    }
}

/// Text of a DTDL display name, which is either a plain string or a language map.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("en")
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}
