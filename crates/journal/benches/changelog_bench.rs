//! Changelog query benchmarks

use cowork_journal::{ChangelogDocument, ChangelogStore, CommitRecord};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Root with `snapshots` snapshot changelogs and a live log, `commits` records each
fn populated_root(snapshots: usize, commits: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut document = ChangelogDocument::fresh(root);
    document.log = (0..commits)
        .map(|i| CommitRecord::at(format!("user{}", i % 7), i as u64, [format!("cfg/file{}.yaml", i % 50)]))
        .collect();

    for s in 0..snapshots {
        let dir = root.join(format!(".snapshots/{}-user{s}", 1_000 + s));
        fs::create_dir_all(&dir).unwrap();
        document.write(&dir.join(".changelog")).unwrap();
    }
    document.write(&root.join(".changelog")).unwrap();
    temp_dir
}

fn bench_queries(c: &mut Criterion) {
    let temp_dir = populated_root(20, 500);
    let store = ChangelogStore::open(temp_dir.path()).unwrap();

    c.bench_function("all_changes_20x500", |b| {
        b.iter(|| black_box(store.all_changes()));
    });

    c.bench_function("changes_for_file_20x500", |b| {
        b.iter(|| black_box(store.changes_for_file(Path::new("cfg/file7.yaml"))));
    });
}

fn bench_refresh(c: &mut Criterion) {
    let temp_dir = populated_root(20, 500);
    let store = ChangelogStore::open(temp_dir.path()).unwrap();

    c.bench_function("refresh_20x500", |b| {
        b.iter(|| store.refresh().unwrap());
    });
}

fn bench_append(c: &mut Criterion) {
    let temp_dir = populated_root(0, 500);
    let store = ChangelogStore::open(temp_dir.path()).unwrap();

    c.bench_function("append_commit_500", |b| {
        b.iter(|| black_box(store.append_commit(CommitRecord::new("bench", ["cfg/file1.yaml"]))));
    });
}

criterion_group!(benches, bench_queries, bench_refresh, bench_append);
criterion_main!(benches);
