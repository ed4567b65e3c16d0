use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use medcamp_core::{Aggregate, MedicineId, OrderId, SupplierId, WarehouseId};
use medcamp_replenishment::{
    apply_diff, diff, InitialStatus, Order, OrderCommand, OrderItemSet, OrderLineItem, OrderPlaced,
    ReceiptSubmission, ReceiveGoods,
};

/// Catalog-sized editor state: half the medicines on the original order, a
/// tenth of the lines edited.
fn editor_sets(size: usize) -> (OrderItemSet, OrderItemSet) {
    let mut original = Vec::with_capacity(size / 2);
    let mut edited = Vec::with_capacity(size);
    for i in 0..size {
        let id = MedicineId::new();
        let name = format!("Medicine {i}");
        let before = if i % 2 == 0 { 10 } else { 0 };
        let after = if i % 10 == 0 { before + 5 } else { before };
        if before > 0 {
            original.push(OrderLineItem::new(id, name.clone(), before));
        }
        edited.push(OrderLineItem::new(id, name, after));
    }
    (
        OrderItemSet::from_items(original).unwrap(),
        OrderItemSet::from_items(edited).unwrap(),
    )
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("draft_diff");

    for size in [10usize, 100, 500, 2000].iter() {
        let (original, edited) = editor_sets(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("diff", size), size, |b, _| {
            b.iter(|| black_box(diff(black_box(&original), black_box(&edited))));
        });

        let d = diff(&original, &edited);
        group.bench_with_input(BenchmarkId::new("apply_diff", size), size, |b, _| {
            b.iter(|| black_box(apply_diff(black_box(&original), black_box(&d)).unwrap()));
        });
    }

    group.finish();
}

fn bench_receive(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_decision");

    for size in [10usize, 100, 500].iter() {
        let (original, _) = editor_sets(*size * 2);
        let order = Order::placed(
            OrderId::new(),
            Utc::now(),
            &OrderPlaced {
                warehouse_id: WarehouseId::new(),
                supplier_id: SupplierId::new(),
                status: InitialStatus::Pending,
                items: original,
                occurred_at: Utc::now(),
            },
        );
        let submission = ReceiptSubmission::outstanding_of(order.items());

        group.bench_with_input(BenchmarkId::new("receive_all_outstanding", size), size, |b, _| {
            b.iter(|| {
                let cmd = OrderCommand::Receive(ReceiveGoods {
                    order_id: order.id_typed(),
                    submission: submission.clone(),
                    occurred_at: Utc::now(),
                });
                black_box(order.handle(&cmd).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_receive);
criterion_main!(benches);
