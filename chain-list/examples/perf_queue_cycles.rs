//! Cycle-accurate push/pop latency comparison using rdtscp.
//!
//! Compares the pooled queue against `VecDeque` and `LinkedList` with
//! per-operation cycle counts, plus the backend time recorded by `Counting`.
//!
//! Run with:
//!   cargo build --release --example perf_queue_cycles
//!   taskset -c 0 ./target/release/examples/perf_queue_cycles

use std::collections::{LinkedList, VecDeque};
use std::hint::black_box;

use chain_list::{Counting, PoolBuilder, Queue};
use hdrhistogram::Histogram;

const DEPTH: usize = 1_000;
const OPS: usize = 1_000_000;

#[inline(always)]
fn rdtscp() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        let mut aux: u32 = 0;
        std::arch::x86_64::__rdtscp(&mut aux)
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        panic!("rdtscp only supported on x86_64");
    }
}

fn print_stats(name: &str, hist: &Histogram<u64>) {
    println!("{}", name);
    println!("  min:  {:>6} cycles", hist.min());
    println!("  p50:  {:>6} cycles", hist.value_at_quantile(0.50));
    println!("  p99:  {:>6} cycles", hist.value_at_quantile(0.99));
    println!("  p999: {:>6} cycles", hist.value_at_quantile(0.999));
    println!("  max:  {:>6} cycles", hist.max());
    println!("  avg:  {:>6.0} cycles", hist.mean());
}

fn bench_chain_queue() -> Histogram<u64> {
    let backend = Counting::default();
    let stats = backend.stats();
    let pool = PoolBuilder::default()
        .backend(backend)
        .capacity(DEPTH + 1)
        .build()
        .unwrap();
    let mut queue = Queue::with_pool(pool);
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for i in 0..DEPTH as u32 {
        queue.push(i).unwrap();
    }

    // Measured: push one, pop one at constant depth
    for i in 0..OPS as u32 {
        let start = rdtscp();
        queue.push(i).unwrap();
        black_box(queue.pop());
        let end = rdtscp();
        let _ = hist.record(end.wrapping_sub(start));
    }

    println!(
        "chain-list backend: {} allocations, {:?} inside allocate",
        stats.allocations(),
        stats.allocate_time()
    );

    hist
}

fn bench_vec_deque() -> Histogram<u64> {
    let mut queue = VecDeque::with_capacity(DEPTH + 1);
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for i in 0..DEPTH as u32 {
        queue.push_back(i);
    }

    for i in 0..OPS as u32 {
        let start = rdtscp();
        queue.push_back(i);
        black_box(queue.pop_front());
        let end = rdtscp();
        let _ = hist.record(end.wrapping_sub(start));
    }

    hist
}

fn bench_linked_list() -> Histogram<u64> {
    let mut queue = LinkedList::new();
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for i in 0..DEPTH as u32 {
        queue.push_back(i);
    }

    for i in 0..OPS as u32 {
        let start = rdtscp();
        queue.push_back(i);
        black_box(queue.pop_front());
        let end = rdtscp();
        let _ = hist.record(end.wrapping_sub(start));
    }

    hist
}

fn main() {
    println!("QUEUE latency comparison ({} push+pop pairs at depth {})", OPS, DEPTH);
    println!("========================================");
    println!();

    let chain_hist = bench_chain_queue();
    let deque_hist = bench_vec_deque();
    let linked_hist = bench_linked_list();
    println!();

    print_stats("chain-list Queue:", &chain_hist);
    println!();
    print_stats("VecDeque:", &deque_hist);
    println!();
    print_stats("LinkedList:", &linked_hist);
    println!();

    let chain_p50 = chain_hist.value_at_quantile(0.50);
    let linked_p50 = linked_hist.value_at_quantile(0.50);

    println!("----------------------------------------");
    if chain_p50 < linked_p50 {
        println!(
            "chain-list p50 is {:.1}% FASTER than LinkedList",
            (1.0 - chain_p50 as f64 / linked_p50 as f64) * 100.0
        );
    } else if chain_p50 > linked_p50 {
        println!(
            "chain-list p50 is {:.1}% SLOWER than LinkedList",
            (chain_p50 as f64 / linked_p50 as f64 - 1.0) * 100.0
        );
    } else {
        println!("chain-list p50 is EQUAL to LinkedList");
    }
}
