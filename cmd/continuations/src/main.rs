//! Continuations example
//!
//! Submits a batch of jobs, attaches a continuation to each and lets the
//! run loop wait until every continuation has fired. Finishes with the
//! overflow case: a capacity-4 queue with no workers rejects the fifth job.
//!
//! # Environment Variables
//!
//! - `TP_NUM_WORKERS=N` - Worker threads (default: host parallelism)
//! - `TP_RUN_LOOP_DISPATCH=1` - Fire continuations on the run loop thread
//! - `TP_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `TP_FLUSH_EPRINT=1` - Flush debug output immediately

use taskpool::{current_worker_id, Executor, ExecError, PoolConfig};
use taskpool::{kinfo, kwarn};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

const JOBS: i32 = 50;

fn times_42(n: i32) -> i32 {
    n * 42
}

// TP_LOG_LEVEL=debug cargo run -p taskpool-continuations
fn main() {
    println!("=== taskpool Continuations Example ===\n");

    let config = PoolConfig::from_env();
    config.print();

    let exec = match Executor::new(config) {
        Ok(exec) => exec,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = exec.start() {
        eprintln!("failed to start workers: {}", e);
        std::process::exit(1);
    }

    let sum = Arc::new(AtomicU64::new(0));
    let fired = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    for n in 0..JOBS {
        let (s, f) = (Arc::clone(&sum), Arc::clone(&fired));
        let submitted = exec.submit_then(times_42, &n, move |v| {
            let where_ = match current_worker_id() {
                Some(id) => format!("worker {}", id),
                None => "run loop".to_string(),
            };
            kinfo!("job {} -> {} (on {})", n, v, where_);
            s.fetch_add(*v as u64, Ordering::SeqCst);
            f.fetch_add(1, Ordering::SeqCst);
        });
        if let Err(e) = submitted {
            kwarn!("job {} not submitted: {}", n, e);
        }
    }

    let stats = exec.run_loop();
    let elapsed = start.elapsed();

    println!(
        "\n{} continuations fired, sum = {} ({:?}, {} run loop passes)",
        fired.load(Ordering::SeqCst),
        sum.load(Ordering::SeqCst),
        elapsed,
        stats.passes
    );

    exec.shutdown();
    if let Err(e) = exec.join() {
        eprintln!("join failed: {}", e);
    }
    println!("stats: {:?}", exec.stats());

    println!("\n--- Overflow ---");
    let small = match Executor::new(PoolConfig::new().num_workers(1).queue_capacity(4)) {
        Ok(exec) => exec,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    for n in 1..=5 {
        match small.submit(times_42, &n) {
            Ok(fut) => println!("job {} accepted as {}", n, fut.id()),
            Err(ExecError::QueueFull) => println!("job {} rejected: queue full", n),
            Err(e) => println!("job {} failed: {}", n, e),
        }
    }

    println!("\n=== Example Complete ===");
}
