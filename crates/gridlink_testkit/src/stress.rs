//! Stress tests for gridlink dialects.
//!
//! These helpers drive one dialect from several threads at once.

use crate::fixtures::tuple_of;
use gridlink_core::{
    EntityKey, GridDialect, IdSourceKey, IdSourceKeyMetadata, NextValueRequest, Tuple, TupleContext, Value,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct records the threads write to.
    pub record_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
            record_count: 8,
        }
    }
}

fn run_threads<F>(config: &StressConfig, work: F) -> (usize, usize, Duration)
where
    F: Fn(usize, usize) -> bool + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let start = Instant::now();
    let workers: Vec<_> = (0..config.threads)
        .map(|thread_index| {
            let work = Arc::clone(&work);
            let operations = config.operations;
            thread::spawn(move || {
                let successful = (0..operations).filter(|&op| work(thread_index, op)).count();
                (successful, operations - successful)
            })
        })
        .collect();

    let (mut successful, mut failed) = (0, 0);
    for worker in workers {
        match worker.join() {
            Ok((ok, err)) => {
                successful += ok;
                failed += err;
            }
            Err(_) => failed += config.operations,
        }
    }
    (successful, failed, start.elapsed())
}

/// Concurrent updates spread over `record_count` records of one table.
///
/// Each thread writes its own column, so a dialect that loses updates leaves
/// records missing columns. Lost columns are counted as failures.
pub fn stress_concurrent_updates(dialect: Arc<dyn GridDialect>, config: &StressConfig) -> StressTestResult {
    let context = TupleContext::default();
    let records = config.record_count.max(1);
    for id in 0..records {
        let key = EntityKey::single("stress_records", "id", id as i64);
        if dialect.insert_or_update_tuple(&key, &Tuple::new(), &context).is_err() {
            return StressTestResult::new(0, config.threads * config.operations, Duration::ZERO);
        }
    }

    let writer = Arc::clone(&dialect);
    let (successful, mut failed, duration) = run_threads(config, move |thread_index, op| {
        let key = EntityKey::single("stress_records", "id", (op % records) as i64);
        let mut update = Tuple::loaded(Default::default());
        update.put(format!("t{thread_index}"), op as i64);
        writer.insert_or_update_tuple(&key, &update, &TupleContext::default()).is_ok()
    });

    let touched = config.operations.min(records);
    for id in 0..touched {
        let key = EntityKey::single("stress_records", "id", id as i64);
        let stored = dialect.get_tuple(&key, &context).ok().flatten();
        let columns = stored.map(|t| t.column_names().len()).unwrap_or(0);
        // The key column plus one column per thread.
        if columns < config.threads + 1 {
            failed += 1;
        }
    }
    StressTestResult::new(successful, failed, duration)
}

/// Concurrent id generation from one source. Errors and duplicate ids are
/// counted as failures.
pub fn stress_next_value(dialect: Arc<dyn GridDialect>, config: &StressConfig) -> StressTestResult {
    let metadata = Arc::new(IdSourceKeyMetadata::for_sequence("stress_seq"));
    let issued = Arc::new(Mutex::new(Vec::with_capacity(config.threads * config.operations)));
    let log = Arc::clone(&issued);
    let (successful, mut failed, duration) = run_threads(config, move |_, _| {
        let key = IdSourceKey::for_sequence(Arc::clone(&metadata));
        match dialect.next_value(&NextValueRequest::new(key, 1, 1)) {
            Ok(id) => {
                log.lock().push(id);
                true
            }
            Err(_) => false,
        }
    });

    let ids = std::mem::take(&mut *issued.lock());
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    let duplicates = ids.len() - distinct.len();
    failed += duplicates;
    StressTestResult::new(successful - duplicates, failed, duration)
}

/// Writes `count` records shaped like `template` into `table`.
pub fn populate(dialect: &dyn GridDialect, table: &str, count: usize, template: &[(&str, Value)]) -> usize {
    let context = TupleContext::default();
    (0..count)
        .filter(|&id| {
            let key = EntityKey::single(table, "id", id as i64);
            dialect.insert_or_update_tuple(&key, &tuple_of(template), &context).is_ok()
        })
        .count()
}
