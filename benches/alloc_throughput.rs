use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use cresco::Allocator;

const OPS: u64 = 100_000;

static HEAP: Allocator = Allocator::new();

/// cresco allocate/release throughput. Each pair reuses the block the
/// previous iteration parked, so this times the free-list fast path.
fn cresco_alloc_release(size: usize) {
  for _ in 0..OPS {
    let payload = HEAP.allocate(size).unwrap();
    black_box(payload);
    unsafe { HEAP.release(payload) };
  }
}

/// libc alloc/free throughput.
fn libc_malloc_free(size: usize) {
  for _ in 0..OPS {
    unsafe {
      let ptr = libc::malloc(size);
      black_box(ptr);
      libc::free(ptr);
    }
  }
}

fn benchmark_alloc_throughput(c: &mut Criterion) {
  let mut group = c.benchmark_group("alloc_throughput");

  for size in [16, 64, 256, 1024, 4096] {
    group.throughput(Throughput::Elements(OPS));

    group.bench_with_input(BenchmarkId::new("cresco", size), &size, |b, &size| {
      b.iter(|| cresco_alloc_release(size))
    });

    group.bench_with_input(BenchmarkId::new("libc", size), &size, |b, &size| {
      b.iter(|| libc_malloc_free(size))
    });
  }

  group.finish();
}

criterion_group!(benches, benchmark_alloc_throughput);
criterion_main!(benches);
