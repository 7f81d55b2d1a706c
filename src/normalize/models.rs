// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model-definition normalizer.
//!
//! Interfaces are parsed first and keyed by `@id`, so declaration order does not matter. The
//! second pass walks every top-level interface depth-first and inlines the interface referenced
//! by each Component (`schema`) and Relationship (`target`) under the referencing row.
//!
//! An interface that is already being inlined further up the same path is not expanded again:
//! the reference row is kept without children and a [`ModelDiagnostic::CyclicReference`] is
//! recorded.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde_json::Value;

use super::schema::SchemaResolver;
use super::{entries, NormalizeError};
use crate::model::{display_text, Node, NodeKind, RawContent, RawInterface, RowKey, TypeTag};
use crate::tree::visibility::mark_hidden;

/// Interface id to the key of its top-level row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelIndex {
    roots: BTreeMap<String, RowKey>,
}

impl ModelIndex {
    pub fn get(&self, interface_id: &str) -> Option<&RowKey> {
        self.roots.get(interface_id)
    }

    pub fn contains(&self, interface_id: &str) -> bool {
        self.roots.contains_key(interface_id)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowKey)> {
        self.roots.iter().map(|(id, key)| (id.as_str(), key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelDiagnostic {
    UnresolvedReference { row: RowKey, target: String },
    CyclicReference { row: RowKey, target: String },
}

impl fmt::Display for ModelDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { row, target } => {
                write!(f, "{row}: referenced interface '{target}' is not loaded")
            }
            Self::CyclicReference { row, target } => {
                write!(f, "{row}: '{target}' references itself, subtree truncated")
            }
        }
    }
}

/// A Relationship content as declared on its interface, before any inlining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDecl {
    pub source_model: String,
    pub name: String,
    pub display_name: Option<String>,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedModels {
    /// Pre-order rows: every parent precedes its contiguous subtree.
    pub rows: Vec<Node>,
    pub index: ModelIndex,
    pub diagnostics: Vec<ModelDiagnostic>,
    /// Every targeted Relationship of every loaded interface, in declaration order.
    pub relationships: Vec<RelationshipDecl>,
}

impl NormalizedModels {
    pub fn incoming_relationships<'a>(
        &'a self,
        model_id: &'a str,
    ) -> impl Iterator<Item = &'a RelationshipDecl> + 'a {
        incoming_relationships(&self.relationships, model_id)
    }
}

/// Relationships that point at `model_id`: the ways a twin of that model can have a parent.
pub fn incoming_relationships<'a>(
    relationships: &'a [RelationshipDecl],
    model_id: &'a str,
) -> impl Iterator<Item = &'a RelationshipDecl> + 'a {
    relationships.iter().filter(move |decl| decl.target == model_id)
}

pub fn normalize_models(input: &Value) -> Result<NormalizedModels, NormalizeError> {
    let interfaces = parse_interfaces(input)?;
    let by_id: HashMap<&str, &RawInterface> =
        interfaces.iter().map(|interface| (interface.id.as_str(), interface)).collect();

    let referenced: HashSet<&str> = interfaces
        .iter()
        .flat_map(|interface| interface.contents.iter())
        .filter_map(|content| reference_target(content).ok().flatten())
        .collect();

    let mut top_level: Vec<&RawInterface> = interfaces
        .iter()
        .filter(|interface| !referenced.contains(interface.id.as_str()))
        .collect();
    if top_level.is_empty() {
        // Every interface is referenced by another one; start from the first declared.
        top_level.extend(interfaces.first());
    }

    let relationships: Vec<RelationshipDecl> = interfaces
        .iter()
        .flat_map(|interface| {
            interface.contents.iter().filter(|content| content.kind.is("Relationship")).filter_map(
                |content| {
                    Some(RelationshipDecl {
                        source_model: interface.id.clone(),
                        name: content.name.clone(),
                        display_name: content.display_name.as_ref().and_then(display_text),
                        target: content.target.clone()?,
                    })
                },
            )
        })
        .collect();

    let mut expander = Expander {
        by_id,
        rows: Vec::new(),
        inlining: Vec::new(),
        diagnostics: Vec::new(),
        keys: HashSet::new(),
        collapse_roots: top_level.len() > 1,
        collapse_references: interfaces.len() > 1,
    };
    let mut index = ModelIndex::default();
    for interface in top_level {
        let key = expander.expand_root(interface)?;
        index.roots.insert(interface.id.clone(), key);
    }

    let Expander { mut rows, diagnostics, .. } = expander;
    mark_hidden(&mut rows);
    tracing::debug!(
        interfaces = interfaces.len(),
        roots = index.len(),
        rows = rows.len(),
        diagnostics = diagnostics.len(),
        relationships = relationships.len(),
        "normalized models"
    );

    Ok(NormalizedModels { rows, index, diagnostics, relationships })
}

fn parse_interfaces(input: &Value) -> Result<Vec<RawInterface>, NormalizeError> {
    let mut seen = BTreeSet::new();
    let mut interfaces = Vec::new();
    let entries = entries(input, "interfaces")?;
    let had_entries = !entries.is_empty();

    for entry in entries {
        // The model API wraps each definition as `{ "id": .., "model": { .. } }`.
        let entry = match entry.get("model") {
            Some(model @ Value::Object(_)) => model.clone(),
            _ => entry,
        };
        let Value::Object(object) = &entry else {
            return Err(NormalizeError::invalid("interface entry is not an object"));
        };
        let is_interface = object
            .get("@type")
            .and_then(|tag| serde_json::from_value::<TypeTag>(tag.clone()).ok())
            .is_some_and(|tag| tag.is("Interface"));
        if !is_interface {
            continue;
        }

        let id = object
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| NormalizeError::invalid("interface is missing '@id'"))?
            .to_owned();
        if let Some(contents) = object.get("contents") {
            if !contents.is_array() {
                return Err(NormalizeError::invalid(format!("contents of '{id}' is not an array")));
            }
        }
        if !seen.insert(id.clone()) {
            tracing::warn!(interface = %id, "duplicate interface definition ignored");
            continue;
        }

        let interface: RawInterface = serde_json::from_value(entry.clone())
            .map_err(|err| NormalizeError::invalid(format!("interface '{id}': {err}")))?;
        interfaces.push(interface);
    }

    // An array may legitimately hold only non-interface entries; a lone object must be one.
    if !input.is_array() && had_entries && interfaces.is_empty() {
        return Err(NormalizeError::invalid("no Interface definitions found"));
    }
    Ok(interfaces)
}

/// Interface id referenced by a Component or Relationship content, if any.
fn reference_target(content: &RawContent) -> Result<Option<&str>, NormalizeError> {
    if content.kind.is("Component") {
        return match content.schema.as_ref() {
            Some(Value::String(target)) => Ok(Some(target)),
            _ => Err(NormalizeError::invalid(format!(
                "component '{}' must name an interface in 'schema'",
                content.name
            ))),
        };
    }
    if content.kind.is("Relationship") {
        return Ok(content.target.as_deref());
    }
    Ok(None)
}

fn content_kind(content: &RawContent) -> Option<NodeKind> {
    [NodeKind::Property, NodeKind::Component, NodeKind::Relationship]
        .into_iter()
        .find(|kind| content.kind.is(kind.as_str()))
}

struct Expander<'a> {
    by_id: HashMap<&'a str, &'a RawInterface>,
    rows: Vec<Node>,
    /// Interfaces on the current root-to-row path.
    inlining: Vec<&'a str>,
    diagnostics: Vec<ModelDiagnostic>,
    keys: HashSet<RowKey>,
    collapse_roots: bool,
    collapse_references: bool,
}

impl<'a> Expander<'a> {
    fn expand_root(&mut self, interface: &'a RawInterface) -> Result<RowKey, NormalizeError> {
        let key = RowKey::interface(&interface.id);
        let mut root = Node::new(key.clone(), NodeKind::Interface, interface.id.clone());
        root.source_id = Some(interface.id.clone());
        root.display_name = interface.display_name.as_ref().and_then(display_text);
        root.model_id = Some(interface.id.clone());
        root.collapsed = self.collapse_roots;

        let slot = self.push(root)?;
        self.inlining.push(&interface.id);
        let expanded = self.expand_contents(slot, interface, &interface.id);
        self.inlining.pop();
        expanded?;
        Ok(key)
    }

    fn expand_contents(
        &mut self,
        parent: usize,
        interface: &'a RawInterface,
        model_id: &str,
    ) -> Result<(), NormalizeError> {
        let resolver = SchemaResolver::with_named(&interface.schemas);
        let mut child_keys = Vec::new();

        for content in &interface.contents {
            let Some(kind) = content_kind(content) else {
                continue;
            };
            let parent_node = &self.rows[parent];
            let mut node =
                Node::new(parent_node.key.child(&content.name), kind, content.name.clone())
                    .under(parent_node);
            node.display_name = content.display_name.as_ref().and_then(display_text);
            node.model_id = Some(model_id.to_owned());
            child_keys.push(node.key.clone());

            if kind == NodeKind::Property {
                let raw = content.schema.as_ref().unwrap_or(&Value::Null);
                node.schema = Some(resolver.resolve(raw).map_err(|source| NormalizeError::Schema {
                    property: content.name.clone(),
                    source,
                })?);
                self.push(node)?;
                continue;
            }

            match reference_target(content)? {
                Some(target) => self.expand_reference(node, target, model_id)?,
                None => {
                    self.push(node)?;
                }
            }
        }

        self.rows[parent].child_keys = child_keys;
        Ok(())
    }

    fn expand_reference(
        &mut self,
        mut node: Node,
        target: &str,
        model_id: &str,
    ) -> Result<(), NormalizeError> {
        node.source_id = Some(target.to_owned());
        node.target = Some(target.to_owned());

        let Some(&definition) = self.by_id.get(target) else {
            tracing::warn!(row = %node.key, target, "unresolved interface reference");
            self.diagnostics.push(ModelDiagnostic::UnresolvedReference {
                row: node.key.clone(),
                target: target.to_owned(),
            });
            self.push(node)?;
            return Ok(());
        };

        if node.display_name.is_none() {
            node.display_name = definition.display_name.as_ref().and_then(display_text);
        }

        if self.inlining.contains(&definition.id.as_str()) {
            tracing::warn!(row = %node.key, target, "cyclic interface reference truncated");
            self.diagnostics.push(ModelDiagnostic::CyclicReference {
                row: node.key.clone(),
                target: target.to_owned(),
            });
            self.push(node)?;
            return Ok(());
        }

        let slot = self.push(node)?;
        self.inlining.push(&definition.id);
        let expanded = self.expand_contents(slot, definition, model_id);
        self.inlining.pop();
        expanded?;

        let row = &mut self.rows[slot];
        row.collapsed = self.collapse_references && row.has_children();
        Ok(())
    }

    fn push(&mut self, node: Node) -> Result<usize, NormalizeError> {
        if !self.keys.insert(node.key.clone()) {
            return Err(NormalizeError::invalid(format!("duplicate content name at '{}'", node.key)));
        }
        self.rows.push(node);
        Ok(self.rows.len() - 1)
    }
}
