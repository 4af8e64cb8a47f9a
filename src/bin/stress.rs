//! Randomized two-thread allocate/release storm against the sbrk allocator.
//!
//! Each worker runs a fixed number of iterations. Per iteration it flips a
//! coin: release a randomly chosen tracked allocation (forced once 100 are
//! tracked), or allocate a random payload of up to 8192 bytes and scribble
//! over every byte of it. Whatever is still tracked when a worker finishes
//! is deliberately leaked; the process is about to exit anyway.

use std::process;
use std::ptr::NonNull;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use cresco::Allocator;

static HEAP: Allocator = Allocator::new();

const WORKERS: u64 = 2;
const ITERATIONS: usize = 10_000_000;
const MAX_PAYLOAD_BYTES: usize = 8192;
const MAX_TRACKED: usize = 100;
const FILL: u8 = 0x2a;

/// xorshift64*. Plenty for shuffling a workload.
struct Rng(u64);

impl Rng {
  fn seeded(salt: u64) -> Self {
    let nanos = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|elapsed| elapsed.as_nanos() as u64)
      .unwrap_or(0x9e37_79b9_7f4a_7c15);
    Rng((nanos ^ (salt << 32)) | 1)
  }

  fn next(&mut self) -> u64 {
    let mut x = self.0;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    self.0 = x;
    x.wrapping_mul(0x2545_f491_4f6c_dd1d)
  }

  /// Uniform-ish in `0..=bound`.
  fn up_to(&mut self, bound: usize) -> usize {
    (self.next() % (bound as u64 + 1)) as usize
  }
}

fn worker(salt: u64) {
  let mut rng = Rng::seeded(salt);
  let mut tracked: Vec<NonNull<u8>> = Vec::with_capacity(MAX_TRACKED);

  for _ in 0..ITERATIONS {
    let flip = rng.next() & 1 == 1;

    if (flip && !tracked.is_empty()) || tracked.len() == MAX_TRACKED {
      let victim = rng.up_to(tracked.len() - 1);
      let payload = tracked.swap_remove(victim);
      unsafe { HEAP.release(payload) };
    } else {
      let size = rng.up_to(MAX_PAYLOAD_BYTES);
      let payload = match HEAP.allocate(size) {
        Ok(payload) => payload,
        Err(err) => {
          eprintln!("stress: {err}");
          process::exit(1);
        }
      };
      unsafe { payload.as_ptr().write_bytes(FILL, size) };
      tracked.push(payload);
    }
  }
}

fn main() {
  let workers: Vec<_> = (1..=WORKERS)
    .map(|salt| thread::spawn(move || worker(salt)))
    .collect();

  println!("Start");
  for handle in workers {
    if handle.join().is_err() {
      eprintln!("stress: worker panicked");
      process::exit(1);
    }
  }
  println!("Finish");
}
