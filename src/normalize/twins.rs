// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Twin-instance normalizer: groups twins under one Model row per model id and splices staged
//! draft twins in below a per-model separator.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::{entries, NormalizeError};
use crate::model::{display_text, DraftTwin, Node, NodeKind, ParentRelationship, RawTwin, RowKey};
use crate::tree::visibility::mark_hidden;

/// Source id prefix of the separator that heads a model's staged twins.
pub const NEW_TWIN_PREFIX: &str = "newtwins-";

/// Model id to ordered twin row keys, real twins first and staged twins after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwinGroups {
    order: Vec<String>,
    members: HashMap<String, Vec<RowKey>>,
}

impl TwinGroups {
    /// Model ids in first-appearance order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn get(&self, model_id: &str) -> &[RowKey] {
        self.members.get(model_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    fn push(&mut self, model_id: &str, key: RowKey) {
        self.ensure(model_id);
        self.members.entry(model_id.to_owned()).or_default().push(key);
    }

    fn ensure(&mut self, model_id: &str) {
        if !self.members.contains_key(model_id) {
            self.order.push(model_id.to_owned());
            self.members.insert(model_id.to_owned(), Vec::new());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedTwins {
    pub rows: Vec<Node>,
    pub groups: TwinGroups,
}

pub fn normalize_twins(input: &Value, drafts: &[DraftTwin]) -> Result<NormalizedTwins, NormalizeError> {
    let mut order: Vec<String> = Vec::new();
    let mut by_model: HashMap<String, Vec<RawTwin>> = HashMap::new();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for entry in entries(input, "twins")? {
        let Some(id) = entry.get("$dtId").and_then(Value::as_str) else {
            skipped += 1;
            continue;
        };
        let Some(model) = entry.pointer("/$metadata/$model").and_then(Value::as_str) else {
            return Err(NormalizeError::invalid(format!("twin '{id}' is missing '$metadata.$model'")));
        };
        // Row keys are per model, so the same id under two models yields two distinct rows.
        if !seen.insert((model.to_owned(), id.to_owned())) {
            return Err(NormalizeError::invalid(format!("twin '{id}' appears twice for model '{model}'")));
        }

        let twin: RawTwin = serde_json::from_value(entry.clone())
            .map_err(|err| NormalizeError::invalid(format!("twin '{id}': {err}")))?;
        let model = twin.metadata.model.clone();
        if !by_model.contains_key(&model) {
            order.push(model.clone());
        }
        by_model.entry(model).or_default().push(twin);
    }

    let collapse_models = order.len() > 1;
    let mut normalized = NormalizedTwins::default();
    for model_id in &order {
        let mut model = model_row(model_id, collapse_models);
        let mut twin_rows = Vec::new();
        for twin in by_model.remove(model_id).unwrap_or_default() {
            let mut row = Node::new(RowKey::twin(model_id, &twin.id), NodeKind::TwinInstance, twin.id.clone())
                .under(&model);
            row.source_id = Some(twin.id.clone());
            row.display_name = twin.name.as_ref().and_then(display_text);
            row.model_id = Some(model_id.clone());
            row.parent_relationships = twin.relationships.iter().map(ParentRelationship::from).collect();
            normalized.groups.push(model_id, row.key.clone());
            twin_rows.push(row);
        }

        model.child_keys = twin_rows.iter().map(|row| row.key.clone()).collect();
        normalized.groups.ensure(model_id);
        normalized.rows.push(model);
        normalized.rows.extend(twin_rows);
    }

    for draft in drafts {
        normalized.splice_draft(draft)?;
    }
    mark_hidden(&mut normalized.rows);

    tracing::debug!(
        models = normalized.groups.len(),
        twins = normalized.groups.total(),
        skipped,
        drafts = drafts.len(),
        "normalized twins"
    );
    Ok(normalized)
}

fn model_row(model_id: &str, collapsed: bool) -> Node {
    let mut row = Node::new(RowKey::model(model_id), NodeKind::Model, model_id);
    row.source_id = Some(model_id.to_owned());
    row.model_id = Some(model_id.to_owned());
    row.collapsed = collapsed;
    row
}

impl NormalizedTwins {
    /// Adds a staged twin below its model's separator and returns the twin row key.
    ///
    /// The model row is synthesized when no twin of that model is loaded yet. Splicing the same
    /// draft again leaves the rows untouched.
    pub fn splice_draft(&mut self, draft: &DraftTwin) -> Result<RowKey, NormalizeError> {
        if draft.model_id.is_empty() || draft.twin_id.is_empty() {
            return Err(NormalizeError::invalid("draft twin needs both 'modelId' and 'twinId'"));
        }
        let model_id = draft.model_id.as_str();
        let twin_key = RowKey::future_twin(model_id, &draft.twin_id);
        if self.position(&twin_key).is_some() {
            return Ok(twin_key);
        }

        let model_key = RowKey::model(model_id);
        let model_idx = match self.position(&model_key) {
            Some(idx) => idx,
            None => {
                let mut row = model_row(model_id, false);
                row.is_synthetic = true;
                self.rows.push(row);
                self.groups.ensure(model_id);
                self.rows.len() - 1
            }
        };

        let separator_key = RowKey::separator(model_id);
        let separator_idx = match self.position(&separator_key) {
            Some(idx) => idx,
            None => {
                let end = self.block_end(model_idx);
                let model = &self.rows[model_idx];
                let mut separator = Node::new(separator_key.clone(), NodeKind::Separator, "New twins")
                    .under(model);
                separator.source_id = Some(format!("{NEW_TWIN_PREFIX}{model_id}"));
                separator.model_id = Some(model_id.to_owned());
                separator.is_synthetic = true;
                self.rows[model_idx].child_keys.push(separator_key);
                self.rows.insert(end, separator);
                end
            }
        };

        let separator = &self.rows[separator_idx];
        let mut twin = Node::new(twin_key.clone(), NodeKind::TwinInstance, draft.twin_id.clone())
            .under(separator);
        twin.source_id = Some(draft.twin_id.clone());
        twin.model_id = Some(model_id.to_owned());
        twin.is_synthetic = true;
        twin.parent_relationships = draft.parent_rels.clone();

        let end = self.block_end(separator_idx);
        self.rows[separator_idx].child_keys.push(twin_key.clone());
        self.rows.insert(end, twin);
        self.groups.push(model_id, twin_key.clone());
        mark_hidden(&mut self.rows);

        tracing::debug!(model = model_id, twin = %draft.twin_id, "spliced draft twin");
        Ok(twin_key)
    }

    fn position(&self, key: &RowKey) -> Option<usize> {
        self.rows.iter().position(|row| &row.key == key)
    }

    /// Index one past the subtree rooted at `idx`.
    fn block_end(&self, idx: usize) -> usize {
        let depth = self.rows[idx].depth;
        self.rows[idx + 1..]
            .iter()
            .position(|row| row.depth <= depth)
            .map_or(self.rows.len(), |offset| idx + 1 + offset)
    }
}

/// The contiguous block of rows belonging to `model_id`: its Model row and everything below.
pub fn filter_by_model<'a>(rows: &'a [Node], model_id: &str) -> &'a [Node] {
    let key = RowKey::model(model_id);
    let Some(start) = rows.iter().position(|row| row.key == key) else {
        return &[];
    };
    let end = rows[start + 1..]
        .iter()
        .position(|row| row.depth == 0)
        .map_or(rows.len(), |offset| start + 1 + offset);
    &rows[start..end]
}
