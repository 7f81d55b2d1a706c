// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use crate::model::fixtures::{
    building_models, thermostat_twins, BUILDING_MODEL, ROOM_MODEL, THERMOSTAT_MODEL,
};
use crate::model::{Node, NodeKind, RowKey};
use crate::normalize::{normalize_models, normalize_twins};

use super::{reduce, Action, Effect, PageRequest, Transition, TreeOptions, TreeState};

#[fixture]
fn building_rows() -> Vec<Node> {
    normalize_models(&building_models()).expect("normalize").rows
}

fn descendant_mode() -> TreeOptions {
    TreeOptions { select_descendants_with_parent: true, ..TreeOptions::default() }
}

fn initialized(options: TreeOptions, rows: Vec<Node>) -> TreeState {
    let mut state = TreeState::new(options);
    state.dispatch(Action::Initialize { rows, next_page: None });
    state
}

fn key_of(state: &TreeState, name: &str) -> RowKey {
    state
        .rows()
        .iter()
        .find(|row| row.node.name == name)
        .map(|row| row.key().clone())
        .expect("row by name")
}

fn index_of(state: &TreeState, name: &str) -> usize {
    state.position(&key_of(state, name)).expect("row index")
}

/// Deterministic pseudo-random indexes for property-style checks.
fn lcg(seed: &mut u64, bound: usize) -> usize {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((*seed >> 33) as usize) % bound
}

fn assert_visibility_invariant(state: &TreeState) {
    let rows = state.rows();
    for row in rows.iter() {
        let mut expected = false;
        let mut parent = row.node.parent_key.clone();
        while let Some(key) = parent {
            let ancestor = &rows[state.position(&key).expect("ancestor")];
            expected |= ancestor.collapsed;
            parent = ancestor.node.parent_key.clone();
        }
        assert_eq!(row.hidden, expected, "{}", row.key());
    }
}

fn assert_selection_invariant(state: &TreeState) {
    for row in state.rows().iter().filter(|row| row.selected) {
        let count = state.descendant_count(row.index);
        for child in &state.rows()[row.index + 1..=row.index + count] {
            assert!(child.selected, "{} selected but {} is not", row.key(), child.key());
        }
    }
}

#[rstest]
fn initialize_takes_collapse_state_from_rows(building_rows: Vec<Node>) {
    let state = initialized(TreeOptions::default(), building_rows);

    assert_eq!(state.len(), 11);
    assert!(!state.is_collapsed(&key_of(&state, BUILDING_MODEL)));
    assert!(state.is_collapsed(&key_of(&state, "floors")));
    let visible: Vec<_> =
        state.rows().iter().filter(|row| !row.hidden).map(|row| row.node.name.clone()).collect();
    assert_eq!(visible, vec![BUILDING_MODEL, "address", "floors"]);
    assert_visibility_invariant(&state);
}

#[rstest]
fn start_collapsed_overrides_every_parent(building_rows: Vec<Node>) {
    let options = TreeOptions { start_collapsed: Some(false), ..TreeOptions::default() };
    let state = initialized(options, building_rows);
    assert!(state.rows().iter().all(|row| !row.hidden && !row.collapsed));
}

#[test]
fn toggling_one_root_leaves_the_other_root_alone() {
    let input = json!([
        {"@type": "Interface", "@id": "dtmi:x:A;1", "contents": [{"@type": "Property", "name": "a", "schema": "string"}]},
        {"@type": "Interface", "@id": "dtmi:x:B;1", "contents": [{"@type": "Property", "name": "b", "schema": "string"}]}
    ]);
    let rows = normalize_models(&input).expect("normalize").rows;
    let mut state = initialized(TreeOptions::default(), rows);
    assert!(state.rows().iter().filter(|row| row.node.depth == 1).all(|row| row.hidden));

    state.dispatch(Action::ToggleCollapse(RowKey::interface("dtmi:x:A;1")));

    let hidden = |name: &str| state.rows().iter().find(|row| row.node.name == name).map(|row| row.hidden);
    assert_eq!(hidden("a"), Some(false));
    assert_eq!(hidden("b"), Some(true));
}

#[rstest]
fn visibility_holds_after_random_toggles(building_rows: Vec<Node>) {
    let parents: Vec<RowKey> =
        building_rows.iter().filter(|row| row.has_children()).map(|row| row.key.clone()).collect();
    let mut state = initialized(TreeOptions::default(), building_rows);
    let mut seed = 7;

    for _ in 0..200 {
        let key = parents[lcg(&mut seed, parents.len())].clone();
        state.dispatch(Action::ToggleCollapse(key));
        assert_visibility_invariant(&state);
    }
}

#[rstest]
fn toggle_on_unknown_or_leaf_key_is_a_no_op(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows);
    let before = Arc::clone(state.rows());

    state.dispatch(Action::ToggleCollapse(RowKey::interface("dtmi:x:Gone;1")));
    state.dispatch(Action::ToggleCollapse(key_of(&state, "address")));

    assert_eq!(&before[..], &state.rows()[..]);
}

#[rstest]
fn collapse_all_and_expand_all(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows);

    state.dispatch(Action::ExpandAll);
    assert!(state.rows().iter().all(|row| !row.hidden));

    state.dispatch(Action::CollapseAll);
    assert_eq!(state.rows().iter().filter(|row| !row.hidden).count(), 1);
    assert_visibility_invariant(&state);
}

#[rstest]
fn published_snapshots_are_never_mutated(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows);
    let snapshot = Arc::clone(state.rows());
    let floors = key_of(&state, "floors");

    state.dispatch(Action::ToggleCollapse(floors.clone()));
    state.dispatch(Action::Select(index_of(&state, "floors")));

    let old = snapshot.iter().find(|row| row.key() == &floors).expect("floors");
    let new = state.rows().iter().find(|row| row.key() == &floors).expect("floors");
    assert!(old.collapsed && !old.selected);
    assert!(!new.collapsed && new.selected);
    assert!(Arc::ptr_eq(&old.node, &new.node));
}

#[rstest]
fn selecting_a_parent_selects_its_whole_subtree(building_rows: Vec<Node>) {
    let mut state = initialized(descendant_mode(), building_rows);
    let floors = index_of(&state, "floors");

    state.dispatch(Action::Select(floors));

    let selected: Vec<_> = state.rows().iter().filter(|row| row.selected).map(|row| row.index).collect();
    assert_eq!(selected, (floors..state.len()).collect::<Vec<_>>());
    assert_eq!(state.selection().anchor(), Some(&key_of(&state, "floors")));
    assert_selection_invariant(&state);

    state.dispatch(Action::Select(floors));
    assert!(state.selection().is_empty());
}

#[rstest]
fn leaf_click_under_selected_parent_is_a_no_op(building_rows: Vec<Node>) {
    let mut state = initialized(descendant_mode(), building_rows);
    state.dispatch(Action::Select(index_of(&state, "thermostat")));
    let before = state.selection().clone();

    state.dispatch(Action::Select(index_of(&state, "setPoint")));

    assert_eq!(state.selection(), &before);
    assert_selection_invariant(&state);
}

#[rstest]
fn plain_mode_toggles_single_rows(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows);
    state.dispatch(Action::Select(index_of(&state, "floors")));
    assert_eq!(state.selection().len(), 1);
    state.dispatch(Action::Select(index_of(&state, "floors")));
    assert!(state.selection().is_empty());
}

#[rstest]
fn range_over_a_partial_subtree_is_completed(building_rows: Vec<Node>) {
    let mut state = initialized(descendant_mode(), building_rows);
    state.dispatch(Action::Select(index_of(&state, "address")));

    // address..=rooms covers `rooms` but none of its descendants.
    state.dispatch(Action::SelectRange { to: index_of(&state, "rooms") });

    for name in ["address", "floors", "level", "rooms", "temperature", "thermostat", "schedule"] {
        assert!(state.selection().contains(&key_of(&state, name)), "{name}");
    }
    assert_selection_invariant(&state);
}

#[rstest]
fn selection_holds_after_random_clicks(building_rows: Vec<Node>) {
    let mut state = initialized(descendant_mode(), building_rows);
    let mut seed = 42;

    for step in 0..300 {
        let idx = lcg(&mut seed, state.len());
        if step % 5 == 0 {
            state.dispatch(Action::SelectRange { to: idx });
        } else {
            state.dispatch(Action::Select(idx));
        }
        assert_selection_invariant(&state);
    }
}

#[rstest]
fn non_selectable_kinds_ignore_clicks(building_rows: Vec<Node>) {
    let options = TreeOptions { selectable_kinds: vec![NodeKind::Property], ..TreeOptions::default() };
    let mut state = initialized(options, building_rows);

    state.dispatch(Action::Select(index_of(&state, "floors")));
    assert!(state.selection().is_empty());

    state.dispatch(Action::Select(index_of(&state, "address")));
    assert_eq!(state.selection().len(), 1);
}

#[rstest]
fn out_of_range_select_is_a_no_op(building_rows: Vec<Node>) {
    let mut state = initialized(descendant_mode(), building_rows);
    state.dispatch(Action::Select(999));
    state.dispatch(Action::SelectRange { to: 999 });
    assert!(state.selection().is_empty());
}

#[rstest]
fn default_selection_applies_only_when_nothing_is_selected(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows);
    let address = key_of(&state, "address");
    let level = key_of(&state, "level");

    state.dispatch(Action::SetDefaultSelection(address.clone()));
    state.dispatch(Action::SetDefaultSelection(level.clone()));

    assert!(state.selection().contains(&address));
    assert!(!state.selection().contains(&level));

    state.dispatch(Action::ClearSelection);
    assert!(state.selection().is_empty());
    assert_eq!(state.selection().anchor(), None);
}

#[rstest]
fn initialize_keeps_state_for_surviving_keys(building_rows: Vec<Node>) {
    let mut state = initialized(TreeOptions::default(), building_rows.clone());
    let floors = key_of(&state, "floors");
    let address = key_of(&state, "address");
    state.dispatch(Action::ToggleCollapse(floors.clone()));
    state.dispatch(Action::Select(index_of(&state, "address")));
    state.dispatch(Action::Select(index_of(&state, "level")));

    let mut survivors: Vec<Node> = building_rows.into_iter().filter(|row| row.name != "level").collect();
    for row in &mut survivors {
        row.child_keys.retain(|key| !key.as_str().ends_with("/level"));
    }
    state.dispatch(Action::Initialize { rows: survivors, next_page: None });

    assert!(!state.is_collapsed(&floors));
    assert!(state.selection().contains(&address));
    assert_eq!(state.selection().len(), 1);
    assert_eq!(state.selection().anchor(), None);
}

#[test]
fn property_path_is_relative_to_the_owning_twin() {
    let rows = normalize_models(&building_models()).expect("normalize").rows;
    let state = initialized(TreeOptions::default(), rows);

    let set_point = key_of(&state, "setPoint");
    assert_eq!(state.property_path(&set_point).as_deref(), Some("thermostat/setPoint"));
    assert_eq!(state.owning_interface(&set_point), Some(ROOM_MODEL));

    let address = key_of(&state, "address");
    assert_eq!(state.property_path(&address).as_deref(), Some("address"));
    assert_eq!(state.owning_interface(&address), Some(BUILDING_MODEL));
}

fn twin_state(next_page: Option<usize>) -> TreeState {
    let rows = normalize_twins(&thermostat_twins(), &[]).expect("normalize").rows;
    let mut state = TreeState::new(TreeOptions::default());
    state.dispatch(Action::Initialize { rows, next_page });
    state
}

#[test]
fn next_page_request_is_single_flight() {
    let mut state = twin_state(Some(1));
    assert_eq!(state.shimmer_rows(), 5);

    let effects = state.dispatch(Action::RequestNextPage);
    let [Effect::FetchPage(request)] = effects.as_slice() else {
        panic!("expected one fetch, got {effects:?}");
    };
    assert_eq!(request.page, 1);
    assert!(state.dispatch(Action::RequestNextPage).is_empty());
    assert_eq!(state.shimmer_rows(), 5);

    let rows = normalize_twins(&thermostat_twins(), &[]).expect("normalize").rows;
    state.dispatch(Action::PageLoaded { generation: request.generation, rows, next_page: None });
    assert!(!state.paging().is_loading());
    assert_eq!(state.shimmer_rows(), 0);
    assert!(state.dispatch(Action::RequestNextPage).is_empty());
}

#[test]
fn page_from_before_a_reinitialize_is_discarded() {
    let mut state = twin_state(Some(1));
    let effects = state.dispatch(Action::RequestNextPage);
    let Some(Effect::FetchPage(PageRequest { generation, .. })) = effects.first().cloned() else {
        panic!("expected fetch");
    };

    let fresh = normalize_twins(&json!([]), &[]).expect("normalize").rows;
    state.dispatch(Action::Initialize { rows: fresh, next_page: None });
    let stale_rows = normalize_twins(&thermostat_twins(), &[]).expect("normalize").rows;
    let Transition { state, effects } =
        reduce(state, Action::PageLoaded { generation, rows: stale_rows, next_page: Some(2) });

    assert!(effects.is_empty());
    assert!(state.is_empty());
    assert_eq!(state.paging().next_page(), None);
}

#[test]
fn twin_rows_are_selectable_by_kind() {
    let options = TreeOptions { selectable_kinds: vec![NodeKind::TwinInstance], ..TreeOptions::default() };
    let rows = normalize_twins(&thermostat_twins(), &[]).expect("normalize").rows;
    let mut state = initialized(options, rows);

    state.dispatch(Action::Select(0));
    state.dispatch(Action::Select(1));

    let selected: Vec<_> = state.selected_nodes().iter().map(|node| node.name.clone()).collect();
    assert_eq!(selected, vec!["thermostat-1"]);
    assert_eq!(state.node(&RowKey::model(THERMOSTAT_MODEL)).map(|node| node.kind), Some(NodeKind::Model));
}
