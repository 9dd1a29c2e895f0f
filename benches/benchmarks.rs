use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use itertools::Itertools;
use serde::Deserialize;
use status_filter::{compile_predicate, compile_storage_fragment, parse, EngineConfig, Status};

const A_QUERY: &str = r#"from local where !retweet && (text contains "rust" || via startswith "web") && created_at - 1704067200 < 86400 && user != 40"#;

const STATUSES_FILE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/benches/data/statuses.json"
));

#[derive(Deserialize)]
struct FilterContent {
    queries: Vec<String>,
    statuses: Vec<Status>,
}

pub fn parse_query(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| {
            let _ = std::hint::black_box(parse(A_QUERY));
        })
    });
}

pub fn compile_query(c: &mut Criterion) {
    c.bench_function("compile", |b| {
        b.iter_batched(
            || parse(A_QUERY).unwrap(),
            |query| {
                let _ = std::hint::black_box(compile_predicate(&query.root));
                let _ = std::hint::black_box(compile_storage_fragment(
                    &query.root,
                    &EngineConfig::default(),
                ));
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn match_status(c: &mut Criterion) {
    let query = parse(A_QUERY).unwrap();
    let predicate = compile_predicate(&query.root).unwrap();
    let status = Status::builder(1, 42, "alice")
        .with_text("Learning Rust today")
        .with_via("web")
        .build();
    c.bench_function("match", |b| {
        b.iter(|| {
            let _ = std::hint::black_box(predicate(&status));
        })
    });
}

pub fn match_with_files(c: &mut Criterion) {
    let content: FilterContent = serde_json::from_str(STATUSES_FILE).unwrap();
    let predicates = content
        .queries
        .iter()
        .map(|query| compile_predicate(&parse(query).unwrap().root).unwrap())
        .collect_vec();
    c.bench_function("match_with_files", |b| {
        b.iter(|| {
            for status in &content.statuses {
                for predicate in &predicates {
                    let _ = std::hint::black_box(predicate(status));
                }
            }
        })
    });
}

criterion_group!(benches, parse_query, compile_query, match_status, match_with_files);
criterion_main!(benches);
