//! Polling example
//!
//! Drives several step-polled tasks from a single loop on the main thread,
//! never blocking on a result. Each task reports when it starts, how often
//! it was found waiting, and its result.
//!
//! # Environment Variables
//!
//! - `TP_NUM_WORKERS=N` - Worker threads
//! - `TP_LOG_LEVEL=debug` - Set log level

use taskpool::{block_on, PolledTask, PoolConfig, Progress};
use taskpool::kdebug;
use std::thread;
use std::time::Duration;

fn slow_square(n: u64) -> u64 {
    thread::sleep(Duration::from_millis(10 * n));
    n * n
}

// TP_LOG_LEVEL=trace cargo run -p taskpool-polling
fn main() {
    println!("=== taskpool Polling Example ===\n");

    let outcome = block_on(PoolConfig::from_env(), |exec| {
        let mut tasks: Vec<_> = (1..=6).map(|n| (n, PolledTask::new(slow_square, n), 0u32)).collect();

        while tasks.iter().any(|(_, task, _)| !task.is_done()) {
            for (n, task, waits) in tasks.iter_mut() {
                match task.poll(exec) {
                    Some(Progress::Started) => println!("task {} started", n),
                    Some(Progress::Waiting) => *waits += 1,
                    Some(Progress::Finished(v)) => {
                        println!("task {} finished: {} (polled {} times waiting)", n, v, waits)
                    }
                    Some(Progress::Failed(e)) => println!("task {} failed: {}", n, e),
                    None => {}
                }
            }
            kdebug!("poll round done");
            thread::sleep(Duration::from_millis(2));
        }

        tasks.iter().filter_map(|(_, task, _)| task.result()).map(|v| *v).sum::<u64>()
    });

    match outcome {
        Ok(total) => println!("\nsum of squares = {}", total),
        Err(e) => eprintln!("executor error: {}", e),
    }

    println!("\n=== Example Complete ===");
}
