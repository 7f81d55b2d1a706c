// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::ids::RowKey;
use super::schema::PropertyDescriptor;

/// Ancestor names of a row, outermost first.
pub type Namespace = SmallVec<[SmolStr; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Interface,
    Property,
    Component,
    Relationship,
    Model,
    TwinInstance,
    Separator,
    /// An OPC-UA namespace object.
    Folder,
    /// An OPC-UA variable; its `source_id` is the node id that mappings point at.
    Tag,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interface => "Interface",
            Self::Property => "Property",
            Self::Component => "Component",
            Self::Relationship => "Relationship",
            Self::Model => "Model",
            Self::TwinInstance => "Twin",
            Self::Separator => "Separator",
            Self::Folder => "Folder",
            Self::Tag => "Tag",
        }
    }

    /// Component and Relationship rows stand in for another interface's subtree.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Component | Self::Relationship)
    }

    pub fn is_opcua(self) -> bool {
        matches!(self, Self::Folder | Self::Tag)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming relationship of a twin: `source` is the parent twin id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRelationship {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub source: String,
}

impl ParentRelationship {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// One renderable row produced by the model or twin normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub key: RowKey,
    /// Interface, model or twin id this row stands for. For inlined components and
    /// relationships this is the referenced interface id.
    pub source_id: Option<String>,
    pub kind: NodeKind,
    pub name: String,
    pub display_name: Option<String>,
    pub model_id: Option<String>,
    pub parent_key: Option<RowKey>,
    pub child_keys: Vec<RowKey>,
    pub depth: usize,
    pub namespace: Namespace,
    pub collapsed: bool,
    pub hidden: bool,
    pub is_synthetic: bool,
    pub schema: Option<PropertyDescriptor>,
    pub target: Option<String>,
    pub parent_relationships: Vec<ParentRelationship>,
}

impl Node {
    pub fn new(key: RowKey, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            key,
            source_id: None,
            kind,
            name: name.into(),
            display_name: None,
            model_id: None,
            parent_key: None,
            child_keys: Vec::new(),
            depth: 0,
            namespace: Namespace::new(),
            collapsed: false,
            hidden: false,
            is_synthetic: false,
            schema: None,
            target: None,
            parent_relationships: Vec::new(),
        }
    }

    /// Places `self` under `parent`: parent key, depth and namespace follow from the parent.
    pub fn under(mut self, parent: &Node) -> Self {
        self.parent_key = Some(parent.key.clone());
        self.depth = parent.depth + 1;
        self.namespace = parent.namespace.clone();
        self.namespace.push(SmolStr::from(parent.name.as_str()));
        self
    }

    pub fn has_children(&self) -> bool {
        !self.child_keys.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent_key.is_none()
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
