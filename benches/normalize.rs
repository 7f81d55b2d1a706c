// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use twinmapper::model::fixtures::{generated_models, generated_twins};
use twinmapper::model::DraftTwin;
use twinmapper::normalize::{normalize_models, normalize_twins};

mod profiler;

// Benchmark identity (keep stable):
// - Group names in this file: `normalize.models`, `normalize.twins`
// - Case IDs must remain stable across refactors so results stay comparable over time.
fn benches_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize.models");
    for (case, interfaces, properties) in [("chain_8", 8, 10), ("chain_24", 24, 40)] {
        let models = generated_models(interfaces, properties);
        let rows = normalize_models(&models).expect("normalize").rows.len();
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_function(case, |b| {
            b.iter(|| normalize_models(black_box(&models)).expect("normalize").rows.len())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("normalize.twins");
    for (case, models, per_model) in [("small", 4, 25), ("large", 20, 500)] {
        let twins = generated_twins(models, per_model);
        group.throughput(Throughput::Elements((models * per_model) as u64));
        group.bench_function(case, |b| {
            b.iter(|| normalize_twins(black_box(&twins), &[]).expect("normalize").rows.len())
        });
    }

    let twins = generated_twins(20, 500);
    let drafts: Vec<DraftTwin> = (0..50)
        .map(|idx| DraftTwin::new(format!("dtmi:gen:M{};1", idx % 25), format!("draft-{idx}")))
        .collect();
    group.throughput(Throughput::Elements(drafts.len() as u64));
    group.bench_function("large_with_drafts", |b| {
        b.iter_batched(
            || drafts.clone(),
            |drafts| normalize_twins(black_box(&twins), &drafts).expect("normalize").rows.len(),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_normalize
}
criterion_main!(benches);
