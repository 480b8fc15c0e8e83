//! Benchmarks planning throughput for a batch of single-file compiles: many
//! independent inputs through the same planning pipeline.

use moddriver::{options, planner::plan};
use std::time::Instant;

fn bench_plan_many(count: usize) -> std::time::Duration {
    let args: Vec<String> = (0..count).map(|i| format!("module_{i}.swift")).collect();
    let options = options::parse(&args).unwrap();

    let start = Instant::now();
    let graph = plan(options::DriverKind::Batch, &options, None).unwrap();
    std::hint::black_box(&graph);
    start.elapsed()
}

fn main() {
    for count in [10, 100, 1000] {
        let elapsed = bench_plan_many(count);
        println!("plan {count} inputs: {elapsed:?}");
    }
}
