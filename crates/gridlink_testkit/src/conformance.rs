//! Behavioural conformance suite for dialects.
//!
//! Every check uses its own tables, so the whole suite can run against one
//! dialect instance. Checks that need an optional facet pass with a note
//! when the dialect lacks it.

use crate::fixtures::{order_line, order_line_row, order_lines_key, order_lines_metadata, tuple_of};
use gridlink_core::{
    Association, DialectError, DialectHandle, EntityKey, GridDialect, IdSourceKey, IdSourceKeyMetadata,
    NextValueRequest, Tuple, Value,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

/// Outcome of one conformance check.
#[derive(Debug, Clone)]
pub struct ConformanceResult {
    /// Name of the check.
    pub check: &'static str,
    /// Whether the dialect behaved as required.
    pub passed: bool,
    /// What went wrong, or why the check was skipped.
    pub detail: String,
}

impl ConformanceResult {
    /// Creates a passing result.
    pub fn pass(check: &'static str) -> Self {
        Self {
            check,
            passed: true,
            detail: String::new(),
        }
    }

    /// Creates a failing result.
    pub fn fail(check: &'static str, detail: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            detail: detail.into(),
        }
    }

    fn from_outcome(check: &'static str, outcome: Result<(), String>) -> Self {
        match outcome {
            Ok(()) => Self::pass(check),
            Err(detail) => Self::fail(check, detail),
        }
    }
}

type Outcome = Result<(), String>;

fn ensure(condition: bool, detail: impl FnOnce() -> String) -> Outcome {
    if condition {
        Ok(())
    } else {
        Err(detail())
    }
}

fn describe(error: DialectError) -> String {
    error.to_string()
}

/// Runs the conformance checks against one dialect.
pub struct ConformanceSuite {
    dialect: Arc<dyn GridDialect>,
    handle: DialectHandle,
    threads: usize,
    ids_per_thread: usize,
    results: Vec<ConformanceResult>,
}

impl ConformanceSuite {
    /// Creates a suite for `dialect`.
    pub fn new(dialect: Arc<dyn GridDialect>) -> Self {
        Self {
            handle: DialectHandle::new(Arc::clone(&dialect)),
            dialect,
            threads: 4,
            ids_per_thread: 25,
            results: Vec::new(),
        }
    }

    /// Sets the load of the concurrent id generation check.
    pub fn with_id_load(mut self, threads: usize, ids_per_thread: usize) -> Self {
        self.threads = threads;
        self.ids_per_thread = ids_per_thread;
        self
    }

    fn record(&mut self, check: &'static str, outcome: Outcome) -> ConformanceResult {
        let result = ConformanceResult::from_outcome(check, outcome);
        self.results.push(result.clone());
        result
    }

    /// Inserted columns read back, updates change them and removal deletes
    /// the record.
    pub fn check_tuple_crud(&mut self) -> ConformanceResult {
        let outcome = self.tuple_crud();
        self.record("tuple_crud", outcome)
    }

    fn tuple_crud(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_users");
        let key = EntityKey::single("tck_users", "id", 1);

        ensure(dialect.get_tuple(&key, &context).map_err(describe)?.is_none(), || {
            "record present before insert".into()
        })?;
        let tuple = tuple_of(&[("name", Value::from("ada")), ("age", Value::Integer(36))]);
        dialect.insert_or_update_tuple(&key, &tuple, &context).map_err(describe)?;

        let mut stored = dialect
            .get_tuple(&key, &context)
            .map_err(describe)?
            .ok_or_else(|| "inserted record not found".to_owned())?;
        ensure(stored.get("name") == Some(&Value::from("ada")), || {
            format!("name read back as {:?}", stored.get("name"))
        })?;
        ensure(stored.get("id") == Some(&Value::Integer(1)), || {
            "key column missing from stored record".into()
        })?;

        stored.put("age", 37);
        dialect.insert_or_update_tuple(&key, &stored, &context).map_err(describe)?;
        let updated = dialect
            .get_tuple(&key, &context)
            .map_err(describe)?
            .ok_or_else(|| "updated record not found".to_owned())?;
        ensure(updated.get("age") == Some(&Value::Integer(37)), || {
            format!("age read back as {:?}", updated.get("age"))
        })?;
        ensure(updated.get("name") == Some(&Value::from("ada")), || {
            "untouched column lost by update".into()
        })?;

        dialect.remove_tuple(&key, &context).map_err(describe)?;
        ensure(dialect.get_tuple(&key, &context).map_err(describe)?.is_none(), || {
            "record present after removal".into()
        })
    }

    /// An explicit null stays a present null while a removed column is absent.
    pub fn check_null_versus_remove(&mut self) -> ConformanceResult {
        let outcome = self.null_versus_remove();
        self.record("null_versus_remove", outcome)
    }

    fn null_versus_remove(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_profiles");
        let key = EntityKey::single("tck_profiles", "id", 1);
        let tuple = tuple_of(&[("nickname", Value::from("ada")), ("motto", Value::from("onward"))]);
        dialect.insert_or_update_tuple(&key, &tuple, &context).map_err(describe)?;

        let mut stored = dialect
            .get_tuple(&key, &context)
            .map_err(describe)?
            .ok_or_else(|| "inserted record not found".to_owned())?;
        stored.put_null("nickname");
        stored.remove("motto");
        dialect.insert_or_update_tuple(&key, &stored, &context).map_err(describe)?;

        let reread = dialect
            .get_tuple(&key, &context)
            .map_err(describe)?
            .ok_or_else(|| "updated record not found".to_owned())?;
        ensure(reread.get("nickname") == Some(&Value::Null), || {
            format!("explicit null read back as {:?}", reread.get("nickname"))
        })?;
        ensure(reread.get("motto").is_none(), || {
            format!("removed column read back as {:?}", reread.get("motto"))
        })
    }

    /// Removing a record that does not exist succeeds and changes nothing.
    pub fn check_remove_absent_is_noop(&mut self) -> ConformanceResult {
        let outcome = self.remove_absent_is_noop();
        self.record("remove_absent_is_noop", outcome)
    }

    fn remove_absent_is_noop(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_ghosts");
        let present = EntityKey::single("tck_ghosts", "id", 1);
        dialect
            .insert_or_update_tuple(&present, &tuple_of(&[("seen", Value::Bool(true))]), &context)
            .map_err(describe)?;

        dialect
            .remove_tuple(&EntityKey::single("tck_ghosts", "id", 2), &context)
            .map_err(describe)?;
        ensure(dialect.get_tuple(&present, &context).map_err(describe)?.is_some(), || {
            "removing an absent record affected another".into()
        })
    }

    /// Inserting a fresh tuple over an existing record fails.
    pub fn check_double_insert_fails(&mut self) -> ConformanceResult {
        let outcome = self.double_insert_fails();
        self.record("double_insert_fails", outcome)
    }

    fn double_insert_fails(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_accounts");
        let key = EntityKey::single("tck_accounts", "id", 1);
        dialect
            .insert_or_update_tuple(&key, &tuple_of(&[("owner", Value::from("ada"))]), &context)
            .map_err(describe)?;
        match dialect.insert_or_update_tuple(&key, &tuple_of(&[("owner", Value::from("alan"))]), &context) {
            Err(DialectError::TupleAlreadyExists { .. }) => Ok(()),
            Err(other) => Err(format!("expected a duplicate error, got {other}")),
            Ok(()) => Err("second insert of the same key succeeded".into()),
        }
    }

    /// Putting one row and removing another give the same rows in either
    /// order.
    pub fn check_association_operations_commute(&mut self) -> ConformanceResult {
        let outcome = self.association_operations_commute();
        self.record("association_operations_commute", outcome)
    }

    fn association_operations_commute(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let metadata = order_lines_metadata("tck_order_lines");
        let context = self.handle.association_context("tck_orders", &metadata);

        let mut lines = Vec::new();
        for (order, put_first) in [(1, true), (2, false)] {
            let key = order_lines_key(&metadata, order);
            let mut seed = Association::new();
            seed.put(order_line_row(&metadata, order, 1), order_line(order, 1, 5));
            seed.put(order_line_row(&metadata, order, 2), order_line(order, 2, 7));
            dialect.insert_or_update_association(&key, &seed, &context).map_err(describe)?;

            let mut change = dialect
                .get_association(&key, &context)
                .map_err(describe)?
                .ok_or_else(|| format!("order {order} lines not found"))?;
            let put = |a: &mut Association| a.put(order_line_row(&metadata, order, 3), order_line(order, 3, 9));
            let remove = |a: &mut Association| a.remove(order_line_row(&metadata, order, 2));
            if put_first {
                put(&mut change);
                remove(&mut change);
            } else {
                remove(&mut change);
                put(&mut change);
            }
            dialect.insert_or_update_association(&key, &change, &context).map_err(describe)?;

            let stored = dialect
                .get_association(&key, &context)
                .map_err(describe)?
                .ok_or_else(|| format!("order {order} lines vanished"))?;
            let visible: BTreeSet<i64> = stored
                .rows()
                .into_iter()
                .filter_map(|(_, row)| row.get("line").and_then(Value::as_integer))
                .collect();
            lines.push(visible);
        }

        ensure(lines[0] == lines[1], || format!("orders diverged: {:?} vs {:?}", lines[0], lines[1]))?;
        ensure(lines[0] == BTreeSet::from([1, 3]), || format!("unexpected lines {:?}", lines[0]))
    }

    /// Concurrent callers of one id source receive distinct values with no
    /// gaps.
    pub fn check_concurrent_next_value(&mut self) -> ConformanceResult {
        let outcome = self.concurrent_next_value();
        self.record("concurrent_next_value", outcome)
    }

    fn concurrent_next_value(&self) -> Outcome {
        let metadata = Arc::new(IdSourceKeyMetadata::for_table("tck_sequences", "sequence_name", "next_val"));
        let workers: Vec<_> = (0..self.threads)
            .map(|_| {
                let dialect = Arc::clone(&self.dialect);
                let metadata = Arc::clone(&metadata);
                let count = self.ids_per_thread;
                thread::spawn(move || {
                    (0..count)
                        .map(|_| {
                            let key = IdSourceKey::for_table(Arc::clone(&metadata), "tck_orders");
                            dialect.next_value(&NextValueRequest::new(key, 1, 1))
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut values = Vec::new();
        for worker in workers {
            let ids = worker
                .join()
                .map_err(|_| "id generation thread panicked".to_owned())?
                .map_err(describe)?;
            values.extend(ids);
        }
        values.sort_unstable();

        let total = i64::try_from(self.threads * self.ids_per_thread).map_err(|e| e.to_string())?;
        let expected: Vec<i64> = (1..=total).collect();
        ensure(values == expected, || {
            format!("expected 1..={total}, got {} values", values.len())
        })
    }

    /// A write carrying a stale lock state is refused and leaves the record
    /// unchanged.
    pub fn check_stale_optimistic_lock(&mut self) -> ConformanceResult {
        if !self.handle.capabilities().optimistic_locking {
            let mut result = ConformanceResult::pass("stale_optimistic_lock");
            result.detail = "skipped: no optimistic locking facet".into();
            self.results.push(result.clone());
            return result;
        }
        let outcome = self.stale_optimistic_lock();
        self.record("stale_optimistic_lock", outcome)
    }

    fn stale_optimistic_lock(&self) -> Outcome {
        let locking = self.handle.optimistic_locking().map_err(describe)?;
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_documents");
        let key = EntityKey::single("tck_documents", "id", 1);
        dialect
            .insert_or_update_tuple(
                &key,
                &tuple_of(&[("version", Value::Integer(1)), ("body", Value::from("draft"))]),
                &context,
            )
            .map_err(describe)?;

        let old = tuple_of(&[("version", Value::Integer(1))]);
        let mut first = Tuple::loaded(Default::default());
        first.put("version", 2);
        first.put("body", "final");
        ensure(
            locking
                .update_tuple_with_optimistic_lock(&key, &old, &first, &context)
                .map_err(describe)?,
            || "matching lock state was refused".into(),
        )?;

        let mut second = Tuple::loaded(Default::default());
        second.put("version", 2);
        second.put("body", "overwritten");
        ensure(
            !locking
                .update_tuple_with_optimistic_lock(&key, &old, &second, &context)
                .map_err(describe)?,
            || "stale lock state was accepted".into(),
        )?;

        let stored = dialect
            .get_tuple(&key, &context)
            .map_err(describe)?
            .ok_or_else(|| "locked record vanished".to_owned())?;
        ensure(stored.get("body") == Some(&Value::from("final")), || {
            format!("stale write changed the record to {:?}", stored.get("body"))
        })
    }

    /// Scanning a table visits exactly its records.
    pub fn check_for_each_tuple(&mut self) -> ConformanceResult {
        let outcome = self.for_each_tuple();
        self.record("for_each_tuple", outcome)
    }

    fn for_each_tuple(&self) -> Outcome {
        let dialect = self.handle.dialect();
        let context = self.handle.tuple_context("tck_cities");
        for id in 1..=3 {
            dialect
                .insert_or_update_tuple(
                    &EntityKey::single("tck_cities", "id", id),
                    &tuple_of(&[("rank", Value::Integer(id))]),
                    &context,
                )
                .map_err(describe)?;
        }
        dialect
            .insert_or_update_tuple(&EntityKey::single("tck_towns", "id", 1), &Tuple::new(), &context)
            .map_err(describe)?;

        let metadata = EntityKey::single("tck_cities", "id", 0).metadata().clone();
        let mut ranks = BTreeSet::new();
        dialect
            .for_each_tuple(&metadata, &context, &mut |tuple| {
                if let Some(rank) = tuple.get("rank").and_then(Value::as_integer) {
                    ranks.insert(rank);
                }
            })
            .map_err(describe)?;
        ensure(ranks == BTreeSet::from([1, 2, 3]), || format!("scan visited {ranks:?}"))
    }

    /// Runs every check.
    pub fn run_all(&mut self) -> Vec<ConformanceResult> {
        vec![
            self.check_tuple_crud(),
            self.check_null_versus_remove(),
            self.check_remove_absent_is_noop(),
            self.check_double_insert_fails(),
            self.check_association_operations_commute(),
            self.check_concurrent_next_value(),
            self.check_stale_optimistic_lock(),
            self.check_for_each_tuple(),
        ]
    }

    /// Returns the results recorded so far.
    pub fn results(&self) -> &[ConformanceResult] {
        &self.results
    }

    /// Formats the recorded results, one line per check.
    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed).count();
        let mut out = format!("{passed}/{} checks passed\n", self.results.len());
        for result in &self.results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            if result.detail.is_empty() {
                out.push_str(&format!("  [{status}] {}\n", result.check));
            } else {
                out.push_str(&format!("  [{status}] {}: {}\n", result.check, result.detail));
            }
        }
        out
    }

    /// Whether every recorded check passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}
