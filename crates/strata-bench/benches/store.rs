//! Store operation benchmarks.

use criterion::{criterion_group, criterion_main, Criterion};

use strata_bench::{bench_row, bench_store};
use strata_common::types::{Datum, ReadView, Timestamp, Tuple, TxnId};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn bench_insert_commit(c: &mut Criterion) {
    let rt = runtime();
    let store = bench_store();
    let mut next = 0i64;

    c.bench_function("insert_commit", |b| {
        b.iter(|| {
            next += 1;
            let txn = TxnId::new(next as u128);
            rt.block_on(async {
                store.insert(bench_row(next), txn).await.unwrap();
            });
            store.commit(txn, Timestamp::new(next as u64)).unwrap();
        });
    });
}

fn bench_snapshot_get(c: &mut Criterion) {
    let rt = runtime();
    let store = bench_store();

    let row_id = rt.block_on(async {
        let txn = TxnId::new(1);
        let row_id = store.insert(bench_row(1), txn).await.unwrap();
        store.commit(txn, Timestamp::new(1)).unwrap();
        row_id
    });
    let view = ReadView::Snapshot(Timestamp::new(1));

    c.bench_function("snapshot_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get(row_id, view, None).await.unwrap();
            });
        });
    });
}

fn bench_index_lookup(c: &mut Criterion) {
    let rt = runtime();
    let store = bench_store();

    rt.block_on(async {
        let txn = TxnId::new(1);
        for id in 1..=1000i64 {
            store.insert(bench_row(id), txn).await.unwrap();
        }
        store.commit(txn, Timestamp::new(1)).unwrap();
    });
    let key = Tuple::new(vec![Datum::int(500)]);
    let view = ReadView::Snapshot(Timestamp::new(1));

    c.bench_function("index_lookup", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.lookup("by_id", &key, view).await.unwrap();
            });
        });
    });
}

fn bench_range_scan(c: &mut Criterion) {
    let rt = runtime();
    let store = bench_store();

    rt.block_on(async {
        let txn = TxnId::new(1);
        for id in 1..=100i64 {
            store.insert(bench_row(id), txn).await.unwrap();
        }
        store.commit(txn, Timestamp::new(1)).unwrap();
    });
    let view = ReadView::Snapshot(Timestamp::new(1));

    c.bench_function("range_scan_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut cursor = store.range("by_name", None, None, view).unwrap();
                while cursor.next().await.unwrap().is_some() {}
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert_commit,
    bench_snapshot_get,
    bench_index_lookup,
    bench_range_scan
);
criterion_main!(benches);
