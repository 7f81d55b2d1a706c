// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! OPC-UA node to twin property mappings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{MappingKey, NodeKind, ParentRelationship, RowKey};
use crate::tree::TreeState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub opcua_node_id: String,
    pub dt_twin_id: String,
    /// Property path below the twin, component-qualified as `component/property`.
    pub dt_property_path: String,
    pub dt_model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_parent_relationships: Option<Vec<ParentRelationship>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("OPC-UA node id must not be empty")]
    EmptyNodeId,
    #[error("row {0} is not in the models tree")]
    UnknownProperty(RowKey),
    #[error("row {key} is a {kind}, expected a Property")]
    NotAProperty { key: RowKey, kind: NodeKind },
    #[error("row {key} is a {kind}, expected a Twin")]
    NotATwin { key: RowKey, kind: NodeKind },
    #[error("twin row {0} has no twin id or model id")]
    IncompleteTwin(RowKey),
    #[error("property belongs to '{property_model}' but the twin is a '{twin_model}'")]
    ModelMismatch { property_model: String, twin_model: String },
    #[error("no mapping with key {0}")]
    NotFound(MappingKey),
}

impl MappingEntry {
    /// Builds an entry from a property row of the models tree and a twin row.
    pub fn from_selection(
        opcua_node_id: &str,
        models: &TreeState,
        property_key: &RowKey,
        twin: &crate::model::Node,
    ) -> Result<Self, MappingError> {
        let opcua_node_id = opcua_node_id.trim();
        if opcua_node_id.is_empty() {
            return Err(MappingError::EmptyNodeId);
        }

        let property = models
            .node(property_key)
            .ok_or_else(|| MappingError::UnknownProperty(property_key.clone()))?;
        if property.kind != NodeKind::Property {
            return Err(MappingError::NotAProperty { key: property.key.clone(), kind: property.kind });
        }
        if twin.kind != NodeKind::TwinInstance {
            return Err(MappingError::NotATwin { key: twin.key.clone(), kind: twin.kind });
        }
        let (Some(twin_id), Some(model_id)) = (twin.source_id.as_deref(), twin.model_id.as_deref())
        else {
            return Err(MappingError::IncompleteTwin(twin.key.clone()));
        };

        if let Some(property_model) = models.owning_interface(property_key) {
            if property_model != model_id {
                return Err(MappingError::ModelMismatch {
                    property_model: property_model.to_owned(),
                    twin_model: model_id.to_owned(),
                });
            }
        }

        let dt_property_path = models
            .property_path(property_key)
            .ok_or_else(|| MappingError::UnknownProperty(property_key.clone()))?;
        let dt_parent_relationships =
            (!twin.parent_relationships.is_empty()).then(|| twin.parent_relationships.clone());

        Ok(Self {
            opcua_node_id: opcua_node_id.to_owned(),
            dt_twin_id: twin_id.to_owned(),
            dt_property_path,
            dt_model_id: model_id.to_owned(),
            dt_parent_relationships,
        })
    }
    /// Case-insensitive substring match on the node id and the three twin-side fields.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.opcua_node_id, &self.dt_twin_id, &self.dt_property_path, &self.dt_model_id]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Mappings keyed by a sequential [`MappingKey`], kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: BTreeMap<u64, (MappingKey, MappingEntry)>,
    next: u64,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: MappingEntry) -> MappingKey {
        self.next += 1;
        let key = MappingKey::sequential(self.next);
        self.entries.insert(self.next, (key.clone(), entry));
        key
    }

    pub fn get(&self, key: &MappingKey) -> Option<&MappingEntry> {
        self.slot(key).and_then(|slot| self.entries.get(&slot)).map(|(_, entry)| entry)
    }

    pub fn update(&mut self, key: &MappingKey, entry: MappingEntry) -> Result<(), MappingError> {
        let slot = self.slot(key).ok_or_else(|| MappingError::NotFound(key.clone()))?;
        match self.entries.get_mut(&slot) {
            Some((_, current)) => {
                *current = entry;
                Ok(())
            }
            None => Err(MappingError::NotFound(key.clone())),
        }
    }

    pub fn remove(&mut self, key: &MappingKey) -> Option<MappingEntry> {
        let slot = self.slot(key)?;
        self.entries.remove(&slot).map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MappingKey, &MappingEntry)> {
        self.entries.values().map(|(key, entry)| (key, entry))
    }

    /// Entries matching `needle`, in table order. An empty needle keeps every entry.
    pub fn filtered(&self, needle: &str) -> Vec<(&MappingKey, &MappingEntry)> {
        self.iter().filter(|(_, entry)| needle.is_empty() || entry.matches(needle)).collect()
    }

    pub fn entries(&self) -> Vec<&MappingEntry> {
        self.entries.values().map(|(_, entry)| entry).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }

    fn slot(&self, key: &MappingKey) -> Option<u64> {
        key.as_str().strip_prefix('m')?.parse().ok()
    }
}
