//! Budget governor - the per-process engine object

use chrono::{Days, TimeDelta};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::budget::admission::{AdmissionController, AdmissionRequest};
use crate::budget::ledger::UsageLedger;
use crate::budget::period::{daily_key, BudgetPeriod, Clock, SystemClock};
use crate::budget::policy::BudgetPolicy;
use crate::budget::report::{BudgetReport, DailyHistory, ReportGenerator, StatusSnapshot};
use crate::budget::snapshot::SnapshotStore;
use crate::budget::types::{AdmissionVerdict, UsageRecord};
use crate::config::GovernorConfig;
use crate::error::BudgetResult;

/// Runtime budget engine shared by every call site of a process.
///
/// Construct one per process and pass it around by reference (or `Arc`).
/// Ledger appends, flushes, pruning and the aggregate reads of `check` are
/// serialized by one mutex. Checks are advisory: two concurrent callers can
/// both pass `check` against the same remaining budget before either records.
#[derive(Debug)]
pub struct BudgetGovernor {
    policy: BudgetPolicy,
    store: SnapshotStore,
    ledger: Mutex<UsageLedger>,
    clock: Arc<dyn Clock>,
    retention_days: u32,
}

impl BudgetGovernor {
    pub fn new(config: GovernorConfig) -> BudgetResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a governor and load today's snapshot, if any.
    pub fn with_clock(config: GovernorConfig, clock: Arc<dyn Clock>) -> BudgetResult<Self> {
        let policy = BudgetPolicy::from_config(&config)?;
        let store = SnapshotStore::open(&config.storage_dir);

        let today = daily_key(&clock.now());
        let records = store.load_day(&today);
        if !records.is_empty() {
            log::info!("Loaded {} budget records for {}", records.len(), today);
        }

        log::info!(
            "Budget governor initialized: daily budget=${:.2}, auto-fallback={}",
            policy.daily().total,
            policy.auto_fallback_enabled()
        );

        Ok(Self {
            policy,
            store,
            ledger: Mutex::new(UsageLedger::with_snapshot(config.batch_size, &today, records)),
            clock,
            retention_days: config.retention_days,
        })
    }

    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    pub fn storage_dir(&self) -> &Path {
        self.store.dir()
    }

    // The ledger is append-only, so a panic mid-operation leaves it usable.
    fn ledger(&self) -> MutexGuard<'_, UsageLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn estimate_cost(&self, input_units: u64, output_units: u64, model: &str) -> f64 {
        self.policy.estimate_cost(input_units, output_units, model)
    }

    pub fn estimate_cost_from_text(&self, input_text: &str, output_text: &str, model: &str) -> f64 {
        self.policy
            .estimate_cost_from_text(input_text, output_text, model)
    }

    /// Decide whether `agent_type` may run `operation` at `estimated_cost`
    /// with `model`. Never fails; rejection is `allowed == false`.
    pub fn check(
        &self,
        agent_type: &str,
        operation: &str,
        estimated_cost: f64,
        model: &str,
    ) -> AdmissionVerdict {
        let today = daily_key(&self.clock.now());
        let ledger = self.ledger();
        AdmissionController::new(&self.policy).check(
            &ledger,
            &today,
            AdmissionRequest {
                agent_type,
                operation,
                estimated_cost,
                model,
            },
        )
    }

    /// Record the actual cost of a completed operation.
    ///
    /// Every `batch_size`-th record writes a snapshot. Write failures are
    /// logged and retried at the next batch boundary; they never reach the
    /// caller.
    pub fn record(
        &self,
        agent_type: &str,
        operation: &str,
        actual_cost: f64,
        model: Option<&str>,
        fallback_applied: bool,
    ) {
        let cost = if actual_cost.is_finite() && actual_cost >= 0.0 {
            actual_cost
        } else {
            log::warn!(
                "Ignoring invalid cost {} for {}.{}, recording 0",
                actual_cost,
                agent_type,
                operation
            );
            0.0
        };

        let record = UsageRecord::new(
            self.clock.now(),
            agent_type,
            operation,
            cost,
            model.map(str::to_string),
            fallback_applied,
        );
        log::debug!("Recorded usage: {}.{} = ${:.4}", agent_type, operation, cost);

        let mut ledger = self.ledger();
        // First record of a day not loaded yet (midnight rollover): read its
        // file so the next snapshot of that day rewrites it whole
        if !ledger.has_snapshot(&record.period_key) {
            let existing = self.store.load_day(&record.period_key);
            ledger.adopt_snapshot(&record.period_key, existing);
        }
        if ledger.append(record) {
            if let Err(e) = self.flush_locked(&mut ledger) {
                log::error!("Failed to save budget data, retrying at next batch: {}", e);
            }
        }
    }

    /// Write snapshots for every day appended to since the last flush. Each
    /// file is rewritten with every record it held plus the new appends.
    pub fn flush(&self) -> BudgetResult<()> {
        let mut ledger = self.ledger();
        self.flush_locked(&mut ledger)
    }

    fn flush_locked(&self, ledger: &mut UsageLedger) -> BudgetResult<()> {
        for day in ledger.dirty_days() {
            let records: Vec<UsageRecord> = ledger.snapshot_records(&day).cloned().collect();
            self.store.write_day(&day, records)?;
            ledger.mark_clean(&day);
        }
        Ok(())
    }

    pub fn generate_report(&self, period: BudgetPeriod) -> BudgetReport {
        let now = self.clock.now();
        let ledger = self.ledger();
        ReportGenerator::new(&self.policy).generate(&ledger, period, &now)
    }

    pub fn get_status(&self) -> StatusSnapshot {
        let now = self.clock.now();
        let ledger = self.ledger();
        ReportGenerator::new(&self.policy).status(&ledger, &now)
    }

    /// Prune in-memory records older than the retention window. Snapshot
    /// files are left untouched. Returns the number of records pruned.
    pub fn reset(&self) -> usize {
        let now = self.clock.now();
        let cutoff = daily_key(&(now - TimeDelta::days(i64::from(self.retention_days))));
        let removed = self.ledger().prune_before(&cutoff);
        log::info!(
            "Budget reset for {}: pruned {} records older than {}",
            daily_key(&now),
            removed,
            cutoff
        );
        removed
    }

    /// Totals of the daily snapshot files for the last `days` calendar days,
    /// newest first. Reads storage directly, beyond the in-memory window.
    pub fn history(&self, days: u32) -> Vec<DailyHistory> {
        let today = self.clock.now().date_naive();
        (0..u64::from(days))
            .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
            .filter_map(|date| {
                let key = date.format("%Y-%m-%d").to_string();
                match self.store.read_day(&key) {
                    Ok(Some(snapshot)) => Some(DailyHistory::from_records(key, &snapshot.records)),
                    Ok(None) => None,
                    Err(e) => {
                        log::warn!("Skipping unreadable budget history for {}: {}", key, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Today's total recorded cost
    pub fn daily_usage(&self) -> f64 {
        let today = daily_key(&self.clock.now());
        self.ledger().total_for_day(&today)
    }

    /// Today's total recorded cost for one agent role
    pub fn agent_usage(&self, agent_type: &str) -> f64 {
        let today = daily_key(&self.clock.now());
        self.ledger().agent_total_for_day(&today, agent_type)
    }

    /// Copy of every in-memory record, oldest first
    pub fn records(&self) -> Vec<UsageRecord> {
        self.ledger().records().to_vec()
    }
}
