use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use stockroom_assets::{ActivityFilter, NewConsumable, NewUnit, NewUser, StockRequest};
use stockroom_core::{Quantity, SystemClock};
use stockroom_infra::{AuditLedger, InMemoryInventoryStore, LifecycleManager, LifecyclePolicy};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn manager() -> LifecycleManager<InMemoryInventoryStore> {
    LifecycleManager::new(
        InMemoryInventoryStore::new(),
        Arc::new(SystemClock),
        LifecyclePolicy::default(),
    )
}

fn bench_custody_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("custody");
    let rt = runtime();

    // Each iteration: checkout + checkin, two ledger rows.
    group.bench_function("checkout_checkin", |b| {
        let manager = manager();
        let (user, unit) = rt.block_on(async {
            let user = manager
                .create_user(NewUser::new("bench", "Bench", "User", "bench@example.com"), None)
                .await
                .unwrap();
            let unit = manager
                .create_unit(NewUnit::new("B-1", "Bench laptop"), None)
                .await
                .unwrap();
            (user, unit)
        });

        b.iter(|| {
            rt.block_on(async {
                manager.checkout(unit.id, user.id, None, None).await.unwrap();
                black_box(manager.checkin(unit.id).await.unwrap());
            })
        });
    });

    group.finish();
}

fn bench_stock_grant(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock");
    let rt = runtime();

    group.bench_function("assign_then_return", |b| {
        let manager = manager();
        let draft = NewConsumable::new("Cables", Quantity::new(100));
        let item = rt.block_on(manager.create_consumable(draft, None)).unwrap();

        b.iter(|| {
            rt.block_on(async {
                let request = StockRequest::to("bench", black_box(Quantity::new(3)));
                let grant = manager.assign_stock(item.id, request, None).await.unwrap();
                manager.return_stock(grant.id, None).await.unwrap();
            })
        });
    });

    group.finish();
}

fn bench_ledger_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_query");
    let rt = runtime();

    // The in-memory store copies its tables per transaction, so this tracks
    // how query cost grows with ledger size.
    for units in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(units as u64));
        group.bench_with_input(BenchmarkId::new("all_rows", units), &units, |b, &units| {
            let manager = manager();
            rt.block_on(async {
                for i in 0..units {
                    manager
                        .create_unit(NewUnit::new(format!("B-{i}"), "Bench laptop"), None)
                        .await
                        .unwrap();
                }
            });
            let ledger = AuditLedger::new(manager.store().clone());

            b.iter(|| black_box(rt.block_on(ledger.query(ActivityFilter::All)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_custody_round_trip, bench_stock_grant, bench_ledger_query);
criterion_main!(benches);
