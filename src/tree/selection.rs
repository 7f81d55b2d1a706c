// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Descendant-aware row selection.
//!
//! Rows are pre-ordered, so a parent's subtree is the contiguous range right after it. The range
//! length comes from a stack walk over parent links rather than from depths alone, which keeps it
//! correct for spliced rows.

use std::collections::BTreeSet;

use crate::model::RowKey;

use super::TreeState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<RowKey>,
    anchor: Option<RowKey>,
}

impl SelectionState {
    pub fn contains(&self, key: &RowKey) -> bool {
        self.selected.contains(key)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowKey> {
        self.selected.iter()
    }

    /// Row of the last plain click, the fixed end of a range selection.
    pub fn anchor(&self) -> Option<&RowKey> {
        self.anchor.as_ref()
    }

    pub(super) fn retain(&mut self, keep: impl Fn(&RowKey) -> bool) {
        self.selected.retain(|key| keep(key));
        if self.anchor.as_ref().is_some_and(|anchor| !keep(anchor)) {
            self.anchor = None;
        }
    }

    pub(super) fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }
}

impl TreeState {
    /// Number of rows in the subtree below `idx`.
    pub(super) fn descendant_count(&self, idx: usize) -> usize {
        let mut stack = vec![idx];
        let mut count = 0;
        for (offset, parent) in self.parents[idx + 1..].iter().enumerate() {
            while let Some(&top) = stack.last() {
                if Some(top) == *parent {
                    break;
                }
                stack.pop();
            }
            if stack.is_empty() {
                break;
            }
            count += 1;
            stack.push(idx + 1 + offset);
        }
        count
    }

    fn is_selectable(&self, idx: usize) -> bool {
        self.options.is_selectable(self.nodes[idx].kind)
    }

    fn is_selected(&self, idx: usize) -> bool {
        self.selection.contains(&self.nodes[idx].key)
    }

    pub(super) fn select_index(&mut self, idx: usize) {
        if idx >= self.nodes.len() || !self.is_selectable(idx) {
            return;
        }
        let key = self.nodes[idx].key.clone();

        if self.options.select_descendants_with_parent {
            let count = self.descendant_count(idx);
            if count > 0 {
                self.toggle_range(idx, idx + count);
            } else if self.parents[idx].is_some_and(|parent| self.is_selected(parent)) {
                return;
            } else {
                self.toggle(&key);
            }
        } else {
            self.toggle(&key);
        }

        self.selection.anchor = Some(key);
        if self.options.select_descendants_with_parent {
            self.select_children();
        }
    }

    /// Adds every selectable row between the anchor and `to`, both inclusive.
    pub(super) fn select_range(&mut self, to: usize) {
        if to >= self.nodes.len() {
            return;
        }
        let from = self
            .selection
            .anchor
            .as_ref()
            .and_then(|anchor| self.index.get(anchor).copied())
            .unwrap_or(to);
        let (start, end) = if from <= to { (from, to) } else { (to, from) };

        for idx in start..=end {
            if self.is_selectable(idx) {
                self.selection.selected.insert(self.nodes[idx].key.clone());
            }
        }
        if self.selection.anchor.is_none() {
            self.selection.anchor = Some(self.nodes[to].key.clone());
        }
        if self.options.select_descendants_with_parent {
            self.select_children();
        }
    }

    fn toggle(&mut self, key: &RowKey) {
        if !self.selection.selected.remove(key) {
            self.selection.selected.insert(key.clone());
        }
    }

    /// Selects the whole range unless all of it is selected already, then deselects it.
    fn toggle_range(&mut self, start: usize, end: usize) {
        let all_selected =
            (start..=end).filter(|&idx| self.is_selectable(idx)).all(|idx| self.is_selected(idx));
        for idx in start..=end {
            if !self.is_selectable(idx) {
                continue;
            }
            let key = self.nodes[idx].key.clone();
            if all_selected {
                self.selection.selected.remove(&key);
            } else {
                self.selection.selected.insert(key);
            }
        }
    }

    /// Extends the selection to every descendant of a selected row.
    pub(super) fn select_children(&mut self) {
        let mut idx = 0;
        while idx < self.nodes.len() {
            if !self.is_selected(idx) {
                idx += 1;
                continue;
            }
            let count = self.descendant_count(idx);
            for child in idx + 1..=idx + count {
                if self.is_selectable(child) {
                    self.selection.selected.insert(self.nodes[child].key.clone());
                }
            }
            idx += count + 1;
        }
    }
}
