// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! OPC-UA node-tree normalizer.
//!
//! The document has exactly one root key. Every nested object becomes a Folder row and each
//! entry of a `tags` array becomes a Tag row under its folder. A folder with more than one key
//! starts collapsed, and so does everything below it. The first folder that branches is opened
//! again so the pane does not start out as one closed row.

use std::collections::HashSet;

use serde_json::Value;

use super::{NormalizeError, MAX_SCHEMA_DEPTH};
use crate::model::{FieldDescriptor, Node, NodeKind, PropertyDescriptor, RawTag, RawTagProperty, RowKey};
use crate::tree::visibility::mark_hidden;

const TAGS_KEY: &str = "tags";
const COMPLEX_TYPE: &str = "complex";

#[derive(Debug, Clone, Default)]
pub struct NormalizedOpcua {
    /// Pre-order rows: every folder precedes its contiguous subtree.
    pub rows: Vec<Node>,
    pub tags: usize,
}

impl NormalizedOpcua {
    pub fn tag(&self, node_id: &str) -> Option<&Node> {
        self.rows
            .iter()
            .find(|row| row.kind == NodeKind::Tag && row.source_id.as_deref() == Some(node_id))
    }
}

pub fn normalize_opcua(input: &Value) -> Result<NormalizedOpcua, NormalizeError> {
    let document = match input {
        Value::Array(items) => {
            items.first().ok_or_else(|| NormalizeError::invalid("OPC-UA document is empty"))?
        }
        other => other,
    };
    let Value::Object(document) = document else {
        return Err(NormalizeError::invalid("OPC-UA document is not an object"));
    };
    let mut keys = document.iter();
    let (Some((root_name, body)), None) = (keys.next(), keys.next()) else {
        return Err(NormalizeError::invalid("OPC-UA document needs exactly one root key"));
    };

    let mut root = Node::new(RowKey::opcua(root_name), NodeKind::Folder, root_name.clone());
    root.source_id = Some(root_name.clone());

    let mut walker = Walker { rows: Vec::new(), keys: HashSet::new(), tags: 0 };
    let slot = walker.push(root)?;
    walker.folder(slot, body, false)?;

    let Walker { mut rows, tags, .. } = walker;
    open_first_branch(&mut rows);
    mark_hidden(&mut rows);

    tracing::debug!(root = %root_name, rows = rows.len(), tags, "normalized opcua nodes");
    Ok(NormalizedOpcua { rows, tags })
}

/// Walks down single-folder chains from the root and opens the first row that branches.
fn open_first_branch(rows: &mut [Node]) {
    let mut idx = 0;
    // In pre-order the only child of `idx` sits right after it.
    while rows[idx].child_keys.len() == 1
        && rows.get(idx + 1).is_some_and(|child| child.kind == NodeKind::Folder)
    {
        idx += 1;
    }
    rows[idx].collapsed = false;
}

struct Walker {
    rows: Vec<Node>,
    keys: HashSet<RowKey>,
    tags: usize,
}

impl Walker {
    fn folder(&mut self, slot: usize, body: &Value, inherited: bool) -> Result<(), NormalizeError> {
        let Value::Object(object) = body else {
            return Err(NormalizeError::invalid(format!(
                "OPC-UA node '{}' is not an object",
                self.rows[slot].key
            )));
        };
        let collapsed = inherited || object.len() > 1;
        self.rows[slot].collapsed = collapsed;

        let mut child_keys = Vec::new();
        for (name, value) in object {
            if name.eq_ignore_ascii_case(TAGS_KEY) {
                self.tag_rows(slot, value, &mut child_keys)?;
                continue;
            }
            let parent = &self.rows[slot];
            let mut row = Node::new(parent.key.child(name), NodeKind::Folder, name.clone()).under(parent);
            row.source_id = Some(name.clone());
            child_keys.push(row.key.clone());
            let child = self.push(row)?;
            self.folder(child, value, collapsed)?;
        }

        self.rows[slot].child_keys = child_keys;
        Ok(())
    }

    fn tag_rows(
        &mut self,
        slot: usize,
        value: &Value,
        child_keys: &mut Vec<RowKey>,
    ) -> Result<(), NormalizeError> {
        let Value::Array(items) = value else {
            return Err(NormalizeError::invalid(format!(
                "tags of '{}' is not an array",
                self.rows[slot].key
            )));
        };

        for item in items {
            let tag: RawTag = serde_json::from_value(item.clone()).map_err(|err| {
                NormalizeError::invalid(format!("tag under '{}': {err}", self.rows[slot].key))
            })?;
            let parent = &self.rows[slot];
            let key = parent.key.child(&tag.node_id);
            if self.keys.contains(&key) {
                tracing::warn!(node_id = %tag.node_id, "duplicate OPC-UA tag ignored");
                continue;
            }

            let mut row = Node::new(key, NodeKind::Tag, tag.name.clone()).under(parent);
            row.source_id = Some(tag.node_id.clone());
            row.schema = describe(tag.data_type.as_deref(), &tag.properties, 0)?;
            child_keys.push(row.key.clone());
            self.push(row)?;
            self.tags += 1;
        }
        Ok(())
    }

    fn push(&mut self, node: Node) -> Result<usize, NormalizeError> {
        if !self.keys.insert(node.key.clone()) {
            return Err(NormalizeError::invalid(format!("duplicate OPC-UA node at '{}'", node.key)));
        }
        self.rows.push(node);
        Ok(self.rows.len() - 1)
    }
}

/// Scalar descriptor for a plain data type; `complex` tags become an object of their members.
fn describe(
    data_type: Option<&str>,
    properties: &[RawTagProperty],
    depth: usize,
) -> Result<Option<PropertyDescriptor>, NormalizeError> {
    let Some(data_type) = data_type.filter(|data_type| !data_type.is_empty()) else {
        return Ok(None);
    };
    if !data_type.eq_ignore_ascii_case(COMPLEX_TYPE) {
        return Ok(Some(PropertyDescriptor::scalar(data_type)));
    }
    if depth >= MAX_SCHEMA_DEPTH {
        return Err(NormalizeError::invalid(format!(
            "complex tag nesting exceeds {MAX_SCHEMA_DEPTH} levels"
        )));
    }

    let fields = properties
        .iter()
        .map(|member| {
            let schema = describe(member.data_type.as_deref(), &member.properties, depth + 1)?
                .unwrap_or_else(|| PropertyDescriptor::scalar("unknown"));
            Ok(FieldDescriptor { name: member.name.clone(), schema })
        })
        .collect::<Result<Vec<_>, NormalizeError>>()?;
    Ok(Some(PropertyDescriptor::Object { fields }))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{json, Map, Value};

    use super::normalize_opcua;
    use crate::model::fixtures::opcua_nodes;
    use crate::model::{NodeKind, PropertyDescriptor, RowKey};
    use crate::normalize::NormalizeError;

    /// Builds `{ a: { b: { .. leaf } } }` from a folder path.
    fn nested(path: &[&str], leaf: Value) -> Value {
        path.iter().rev().fold(leaf, |inner, name| {
            let mut object = Map::new();
            object.insert((*name).to_owned(), inner);
            Value::Object(object)
        })
    }

    fn visible(rows: &[crate::model::Node]) -> Vec<&str> {
        rows.iter().filter(|row| !row.hidden).map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn namespace_objects_become_folders_and_tags_become_leaves() {
        let normalized = normalize_opcua(&opcua_nodes()).expect("normalize");

        let shape: Vec<_> = normalized.rows.iter().map(|row| (row.depth, row.kind, row.name.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (0, NodeKind::Folder, "Objects"),
                (1, NodeKind::Folder, "Building"),
                (2, NodeKind::Folder, "Room1"),
                (3, NodeKind::Tag, "SetPoint"),
                (3, NodeKind::Tag, "Temperature"),
                (2, NodeKind::Folder, "Room2"),
                (3, NodeKind::Tag, "Status"),
            ]
        );
        assert_eq!(normalized.tags, 3);

        let set_point = normalized.tag("ns=2;s=Room1.SetPoint").expect("tag");
        assert_eq!(
            set_point.key,
            RowKey::opcua("Objects").child("Building").child("Room1").child("ns=2;s=Room1.SetPoint")
        );
        assert_eq!(set_point.schema, Some(PropertyDescriptor::scalar("Double")));
        let namespace: Vec<_> = set_point.namespace.iter().map(|segment| segment.as_str()).collect();
        assert_eq!(namespace, vec!["Objects", "Building", "Room1"]);
    }

    #[test]
    fn first_branching_folder_is_opened() {
        let normalized = normalize_opcua(&opcua_nodes()).expect("normalize");

        let collapsed: Vec<_> =
            normalized.rows.iter().filter(|row| row.collapsed).map(|row| row.name.as_str()).collect();
        assert_eq!(collapsed, vec!["Room1", "Room2"]);
        assert_eq!(visible(&normalized.rows), vec!["Objects", "Building", "Room1", "Room2"]);
    }

    #[test]
    fn root_holding_only_tags_shows_them() {
        let input = json!({"Server": {"tags": [
            {"nodeId": "i=2258", "name": "CurrentTime", "type": "DateTime"},
            {"nodeId": "i=2259", "name": "State", "type": "Int32"}
        ]}});
        let normalized = normalize_opcua(&input).expect("normalize");

        assert_eq!(visible(&normalized.rows), vec!["Server", "CurrentTime", "State"]);
    }

    #[test]
    fn complex_tags_carry_their_members_as_object_fields() {
        let normalized = normalize_opcua(&opcua_nodes()).expect("normalize");
        let status = normalized.tag("ns=2;s=Room2.Status").expect("tag");

        let Some(PropertyDescriptor::Object { fields }) = &status.schema else {
            panic!("expected an object schema, got {:?}", status.schema);
        };
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, vec!["code", "detail"]);
        assert_eq!(fields[0].schema, PropertyDescriptor::scalar("Int32"));
        assert_eq!(fields[1].schema.to_string(), "object (1 fields)");
    }

    #[test]
    fn array_documents_use_their_first_element() {
        let normalized = normalize_opcua(&json!([opcua_nodes()])).expect("normalize");
        assert_eq!(normalized.tags, 3);
    }

    #[test]
    fn deep_single_chain_opens_down_to_the_tags() {
        let input = nested(
            &["Objects", "Plant", "Line"],
            json!({"tags": [{"nodeId": "ns=3;i=7", "name": "Speed", "type": "Float"}]}),
        );
        let normalized = normalize_opcua(&input).expect("normalize");
        assert_eq!(visible(&normalized.rows), vec!["Objects", "Plant", "Line", "Speed"]);
    }

    #[test]
    fn repeated_tag_ids_under_one_folder_keep_the_first() {
        let input = json!({"Objects": {"tags": [
            {"nodeId": "ns=2;i=1", "name": "A", "type": "Int16"},
            {"nodeId": "ns=2;i=1", "name": "B", "type": "Int16"}
        ]}});
        let normalized = normalize_opcua(&input).expect("normalize");
        assert_eq!(normalized.tags, 1);
        assert_eq!(normalized.rows[1].name, "A");
    }

    #[rstest]
    #[case(json!({"A": {}, "B": {}}), "OPC-UA document needs exactly one root key")]
    #[case(json!({}), "OPC-UA document needs exactly one root key")]
    #[case(json!([]), "OPC-UA document is empty")]
    #[case(json!("Objects"), "OPC-UA document is not an object")]
    #[case(json!({"Objects": 3}), "OPC-UA node 'opcua:Objects' is not an object")]
    #[case(json!({"Objects": {"tags": {}}}), "tags of 'opcua:Objects' is not an array")]
    fn malformed_documents_are_invalid_input(#[case] input: Value, #[case] reason: &str) {
        let err = normalize_opcua(&input).unwrap_err();
        assert_eq!(err, NormalizeError::InvalidInput { reason: reason.to_owned() });
    }

    #[test]
    fn tag_without_node_id_names_its_folder() {
        let err = normalize_opcua(&json!({"Objects": {"tags": [{"name": "x"}]}})).unwrap_err();
        assert!(err.to_string().contains("tag under 'opcua:Objects'"), "{err}");
    }
}
