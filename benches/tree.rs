// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use twinmapper::model::fixtures::generated_twins;
use twinmapper::model::RowKey;
use twinmapper::normalize::normalize_twins;
use twinmapper::search::rows_to_render;
use twinmapper::tree::{Action, TreeOptions, TreeState};

mod profiler;

// Benchmark identity (keep stable):
// - Group name in this file: `tree.reduce`
// - Case IDs must remain stable across refactors so results stay comparable over time.
fn initialized(models: usize, per_model: usize) -> TreeState {
    let rows = normalize_twins(&generated_twins(models, per_model), &[]).expect("normalize").rows;
    let options = TreeOptions { select_descendants_with_parent: true, ..TreeOptions::default() };
    let mut state = TreeState::new(options);
    state.dispatch(Action::Initialize { rows, next_page: Some(1) });
    state
}

fn benches_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree.reduce");

    let rows = normalize_twins(&generated_twins(20, 500), &[]).expect("normalize").rows;
    group.throughput(Throughput::Elements(rows.len() as u64));
    group.bench_function("initialize_10k", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| {
                let mut state = TreeState::default();
                state.dispatch(Action::Initialize { rows, next_page: None });
                state.rows().len()
            },
            BatchSize::LargeInput,
        )
    });

    let template = initialized(20, 500);
    let model = RowKey::model("dtmi:gen:M7;1");
    group.bench_function("toggle_collapse_10k", |b| {
        b.iter_batched(
            || template.clone(),
            |mut state| {
                state.dispatch(Action::ToggleCollapse(black_box(model.clone())));
                state.rows().len()
            },
            BatchSize::LargeInput,
        )
    });

    let model_idx = template.position(&model).expect("model row");
    group.bench_function("select_subtree_10k", |b| {
        b.iter_batched(
            || template.clone(),
            |mut state| {
                state.dispatch(Action::Select(black_box(model_idx)));
                state.selection().len()
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("search_10k", |b| {
        b.iter(|| rows_to_render(template.rows(), black_box("twin-7-4")).len())
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_tree
}
criterion_main!(benches);
