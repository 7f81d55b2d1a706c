// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Collapsible, selectable tree-row controller.
//!
//! [`reduce`] is the only way to change a [`TreeState`]: it consumes the state and an
//! [`Action`] and returns the next state plus any [`Effect`]s the caller has to perform. Nodes
//! live in an `Arc` arena, and every transition publishes a fresh `Arc<[TreeRow]>` snapshot, so
//! a snapshot handed to the renderer never changes underneath it.
//!
//! Collapse and selection are keyed by [`RowKey`] and survive `Initialize` for keys that still
//! exist after a rebuild.

pub mod paging;
pub mod selection;
pub mod visibility;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeKind, RowKey};

pub use paging::{PageRequest, PagingState};
pub use selection::SelectionState;
pub use visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Selecting a parent selects its whole subtree and keeps it selected.
    pub select_descendants_with_parent: bool,
    /// Overrides the normalizer's initial collapse state for every parent row.
    pub start_collapsed: Option<bool>,
    /// Placeholder rows shown below the last row while another page can be fetched.
    pub shimmer_rows: usize,
    /// Kinds that react to selection; empty means every kind.
    pub selectable_kinds: Vec<NodeKind>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            select_descendants_with_parent: false,
            start_collapsed: None,
            shimmer_rows: 5,
            selectable_kinds: Vec::new(),
        }
    }
}

impl TreeOptions {
    pub fn is_selectable(&self, kind: NodeKind) -> bool {
        self.selectable_kinds.is_empty() || self.selectable_kinds.contains(&kind)
    }
}

/// One row of a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub node: Arc<Node>,
    pub index: usize,
    pub collapsed: bool,
    pub hidden: bool,
    pub selected: bool,
}

impl TreeRow {
    pub fn key(&self) -> &RowKey {
        &self.node.key
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from(self.hidden)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replaces all rows after a rebuild. `next_page` is the page to fetch when more rows exist.
    Initialize { rows: Vec<Node>, next_page: Option<usize> },
    ToggleCollapse(RowKey),
    CollapseAll,
    ExpandAll,
    /// Plain click on the row at this snapshot index.
    Select(usize),
    /// Shift-click: adds everything from the anchor to this index.
    SelectRange { to: usize },
    /// Selects the row only while nothing else is selected.
    SetDefaultSelection(RowKey),
    ClearSelection,
    RequestNextPage,
    /// Answer to [`Effect::FetchPage`] carrying the complete rebuilt row list.
    PageLoaded { generation: u64, rows: Vec<Node>, next_page: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPage(PageRequest),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: TreeState,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone)]
pub struct TreeState {
    options: TreeOptions,
    nodes: Vec<Arc<Node>>,
    index: HashMap<RowKey, usize>,
    parents: Vec<Option<usize>>,
    parent_collapse: HashMap<RowKey, bool>,
    selection: SelectionState,
    paging: PagingState,
    rows: Arc<[TreeRow]>,
}

impl Default for TreeState {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl TreeState {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            index: HashMap::new(),
            parents: Vec::new(),
            parent_collapse: HashMap::new(),
            selection: SelectionState::default(),
            paging: PagingState::default(),
            rows: Arc::from(Vec::new()),
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// The current snapshot. Cloning the `Arc` is cheap and the rows never change afterwards.
    pub fn rows(&self) -> &Arc<[TreeRow]> {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn paging(&self) -> &PagingState {
        &self.paging
    }

    pub fn position(&self, key: &RowKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn node(&self, key: &RowKey) -> Option<&Arc<Node>> {
        self.position(key).map(|idx| &self.nodes[idx])
    }

    pub fn is_collapsed(&self, key: &RowKey) -> bool {
        self.parent_collapse.get(key).copied().unwrap_or(false)
    }

    /// Selected nodes in row order.
    pub fn selected_nodes(&self) -> Vec<&Arc<Node>> {
        self.nodes.iter().filter(|node| self.selection.contains(&node.key)).collect()
    }

    /// Placeholder rows to draw after the snapshot.
    pub fn shimmer_rows(&self) -> usize {
        if self.paging.has_next_page() || self.paging.is_loading() {
            self.options.shimmer_rows
        } else {
            0
        }
    }

    /// Path of a property below the interface that owns it, e.g. `thermostat/setPoint`.
    ///
    /// Components belong to the owning interface; the walk stops at the nearest Relationship or
    /// Interface row, since each of those starts a different twin.
    pub fn property_path(&self, key: &RowKey) -> Option<String> {
        let mut idx = self.position(key)?;
        let mut segments = vec![self.nodes[idx].name.as_str()];
        while let Some(parent) = self.parents[idx] {
            if is_twin_boundary(self.nodes[parent].kind) {
                break;
            }
            segments.push(self.nodes[parent].name.as_str());
            idx = parent;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Interface id whose twin owns the row at `key`.
    pub fn owning_interface(&self, key: &RowKey) -> Option<&str> {
        let mut idx = self.parents[self.position(key)?]?;
        loop {
            let node = &self.nodes[idx];
            if is_twin_boundary(node.kind) {
                return node.source_id.as_deref();
            }
            idx = self.parents[idx]?;
        }
    }

    /// Applies one action in place.
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        let Transition { state, effects } = reduce(std::mem::take(self), action);
        *self = state;
        effects
    }

    fn load(&mut self, rows: Vec<Node>) {
        let nodes: Vec<Arc<Node>> = rows.into_iter().map(Arc::new).collect();
        let index: HashMap<RowKey, usize> =
            nodes.iter().enumerate().map(|(idx, node)| (node.key.clone(), idx)).collect();
        let parents = nodes
            .iter()
            .map(|node| node.parent_key.as_ref().and_then(|key| index.get(key).copied()))
            .collect();

        let previous = std::mem::take(&mut self.parent_collapse);
        self.parent_collapse = nodes
            .iter()
            .filter(|node| node.has_children())
            .map(|node| {
                let collapsed = previous
                    .get(&node.key)
                    .copied()
                    .unwrap_or_else(|| self.options.start_collapsed.unwrap_or(node.collapsed));
                (node.key.clone(), collapsed)
            })
            .collect();
        self.selection.retain(|key| index.contains_key(key));

        self.nodes = nodes;
        self.index = index;
        self.parents = parents;
        if self.options.select_descendants_with_parent {
            self.select_children();
        }
    }

    fn set_all_collapsed(&mut self, collapsed: bool) {
        for value in self.parent_collapse.values_mut() {
            *value = collapsed;
        }
    }

    fn publish(&mut self) {
        let visibility = visibility::compute(
            self.nodes.len(),
            |idx| self.parents[idx],
            |idx| self.is_collapsed(&self.nodes[idx].key),
        );
        let rows: Vec<TreeRow> = self
            .nodes
            .iter()
            .zip(visibility)
            .enumerate()
            .map(|(index, (node, visibility))| TreeRow {
                node: Arc::clone(node),
                index,
                collapsed: self.is_collapsed(&node.key),
                hidden: visibility.is_hidden(),
                selected: self.selection.contains(&node.key),
            })
            .collect();
        self.rows = Arc::from(rows);
    }
}

fn is_twin_boundary(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Interface | NodeKind::Relationship)
}

/// The pure transition function.
pub fn reduce(mut state: TreeState, action: Action) -> Transition {
    let mut effects = Vec::new();

    match action {
        Action::Initialize { rows, next_page } => {
            state.load(rows);
            state.paging.reset(next_page);
            tracing::debug!(
                rows = state.nodes.len(),
                selected = state.selection.len(),
                generation = state.paging.generation(),
                "tree initialized"
            );
        }
        Action::ToggleCollapse(key) => match state.parent_collapse.get_mut(&key) {
            Some(collapsed) => *collapsed = !*collapsed,
            None => tracing::trace!(key = %key, "toggle on a row without children ignored"),
        },
        Action::CollapseAll => state.set_all_collapsed(true),
        Action::ExpandAll => state.set_all_collapsed(false),
        Action::Select(idx) => state.select_index(idx),
        Action::SelectRange { to } => state.select_range(to),
        Action::SetDefaultSelection(key) => {
            if state.selection.is_empty() {
                if let Some(idx) = state.position(&key) {
                    state.select_index(idx);
                }
            }
        }
        Action::ClearSelection => state.selection.clear(),
        Action::RequestNextPage => {
            if let Some(request) = state.paging.request() {
                tracing::debug!(page = request.page, generation = request.generation, "requesting page");
                effects.push(Effect::FetchPage(request));
            }
        }
        Action::PageLoaded { generation, rows, next_page } => {
            if state.paging.accept(generation, next_page) {
                state.load(rows);
            } else {
                tracing::warn!(
                    generation,
                    current = state.paging.generation(),
                    "discarding stale page response"
                );
                return Transition { state, effects };
            }
        }
    }

    state.publish();
    Transition { state, effects }
}

#[cfg(test)]
mod tests;
