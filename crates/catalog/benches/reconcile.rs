use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use kilim_catalog::ReconcilePlan;

/// Two-pass diff: compute deletes, then recompute every match for inserts.
fn two_pass_plan(existing: &[(i64, String)], desired: &[String]) -> (Vec<i64>, Vec<String>) {
    let delete: Vec<i64> = existing
        .iter()
        .filter(|(_, value)| !desired.iter().any(|d| d == value))
        .map(|(id, _)| *id)
        .collect();
    let insert: Vec<String> = desired
        .iter()
        .filter(|d| !existing.iter().any(|(_, value)| value == *d))
        .cloned()
        .collect();
    (delete, insert)
}

/// Existing rows 1..=n, desired list overlapping the upper half and adding
/// as many fresh values.
fn attribute_rows(n: usize) -> (Vec<(i64, String)>, Vec<String>) {
    let existing: Vec<(i64, String)> = (0..n).map(|i| (i as i64 + 1, i.to_string())).collect();
    let desired: Vec<String> = (n / 2..n + n / 2).map(|i| i.to_string()).collect();
    (existing, desired)
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_plan");
    for size in [8usize, 32, 128] {
        let (existing, desired) = attribute_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("single_pass", size), &size, |b, _| {
            b.iter(|| {
                ReconcilePlan::between(
                    existing.iter().map(|(id, v)| (*id, v.as_str())),
                    black_box(&desired),
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("two_pass", size), &size, |b, _| {
            b.iter(|| two_pass_plan(black_box(&existing), black_box(&desired)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
