// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Stateless row search.
//!
//! Matching is a case-sensitive substring test on source id, name and model id. OPC-UA rows also
//! match on a whole namespace segment, so searching a folder name lists everything below it. A
//! filtered list is shown regardless of collapse state, so the operator can find rows below
//! collapsed parents.

use crate::tree::TreeRow;

pub fn matches(row: &TreeRow, needle: &str) -> bool {
    let node = &row.node;
    node.name.contains(needle)
        || node.source_id.as_deref().is_some_and(|id| id.contains(needle))
        || node.model_id.as_deref().is_some_and(|id| id.contains(needle))
        || (node.kind.is_opcua() && node.namespace.iter().any(|segment| segment.as_str() == needle))
}

/// Rows matching `needle`, in row order. An empty needle keeps every row.
pub fn filter<'a>(rows: &'a [TreeRow], needle: &str) -> Vec<&'a TreeRow> {
    if needle.is_empty() {
        return rows.iter().collect();
    }
    rows.iter().filter(|row| matches(row, needle)).collect()
}

/// Rows a renderer should draw: visible rows without a needle, every match with one.
pub fn rows_to_render<'a>(rows: &'a [TreeRow], needle: &str) -> Vec<&'a TreeRow> {
    if needle.is_empty() {
        return rows.iter().filter(|row| !row.hidden).collect();
    }
    filter(rows, needle)
}

/// Narrows rendered rows to one model block, as the twins pane does for the selected model.
pub fn restrict_to_model<'a>(rows: Vec<&'a TreeRow>, model_id: Option<&str>) -> Vec<&'a TreeRow> {
    match model_id {
        Some(model_id) => {
            rows.into_iter().filter(|row| row.node.model_id.as_deref() == Some(model_id)).collect()
        }
        None => rows,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::{filter, restrict_to_model, rows_to_render};
    use crate::model::fixtures::{building_models, building_twins, opcua_nodes, FLOOR_MODEL, ROOM_MODEL};
    use crate::normalize::{normalize_models, normalize_opcua, normalize_twins};
    use crate::tree::{Action, TreeOptions, TreeRow, TreeState};

    fn twin_rows() -> Arc<[TreeRow]> {
        let rows = normalize_twins(&building_twins(), &[]).expect("normalize").rows;
        let mut state = TreeState::new(TreeOptions::default());
        state.dispatch(Action::Initialize { rows, next_page: None });
        Arc::clone(state.rows())
    }

    #[rstest]
    #[case("room-", 2)]
    #[case("Room", 3)]
    #[case("room", 2)]
    #[case("floor-1", 1)]
    #[case("nothing", 0)]
    fn matches_id_name_and_model(#[case] needle: &str, #[case] expected: usize) {
        let rows = twin_rows();
        assert_eq!(filter(&rows, needle).len(), expected);
    }

    fn opcua_rows() -> Arc<[TreeRow]> {
        let rows = normalize_opcua(&opcua_nodes()).expect("normalize").rows;
        let mut state = TreeState::new(TreeOptions::default());
        state.dispatch(Action::Initialize { rows, next_page: None });
        Arc::clone(state.rows())
    }

    #[rstest]
    #[case("Building", 6)]
    #[case("Room1", 3)]
    #[case("ns=2;s=Room2", 1)]
    #[case("Temperature", 1)]
    #[case("Build", 1)]
    fn opcua_rows_match_node_id_namespace_and_name(#[case] needle: &str, #[case] expected: usize) {
        let rows = opcua_rows();
        assert_eq!(filter(&rows, needle).len(), expected);
    }

    #[test]
    fn empty_needle_returns_every_row() {
        let rows = twin_rows();
        assert_eq!(filter(&rows, "").len(), rows.len());
    }

    #[test]
    fn filtered_rows_include_rows_below_collapsed_parents() {
        let rows = twin_rows();
        assert!(rows.iter().filter(|row| row.node.name.starts_with("room-")).all(|row| row.hidden));

        let rendered = rows_to_render(&rows, "room-");
        assert_eq!(rendered.len(), 2);
        assert_eq!(rows_to_render(&rows, "").len(), 3);
    }

    #[test]
    fn filtering_never_touches_collapse_or_visibility() {
        let normalized = normalize_models(&building_models()).expect("normalize");
        let mut state = TreeState::new(TreeOptions::default());
        state.dispatch(Action::Initialize { rows: normalized.rows, next_page: None });
        let before: Vec<(bool, bool)> = state.rows().iter().map(|row| (row.collapsed, row.hidden)).collect();

        for needle in ["", "set", "dtmi", "thermostat"] {
            let _ = filter(state.rows(), needle);
            let _ = rows_to_render(state.rows(), needle);
        }

        let after: Vec<(bool, bool)> = state.rows().iter().map(|row| (row.collapsed, row.hidden)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn restrict_to_model_keeps_one_block() {
        let rows = twin_rows();
        let all = filter(&rows, "");
        let floors = restrict_to_model(all.clone(), Some(FLOOR_MODEL));
        assert_eq!(floors.len(), 2);
        assert_eq!(restrict_to_model(all, Some(ROOM_MODEL)).len(), 3);
    }
}
