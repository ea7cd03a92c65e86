//! In-memory append-only usage ledger

use std::collections::BTreeSet;

use crate::budget::types::UsageRecord;

/// Append-only collection of usage records backing all aggregate queries.
///
/// The ledger is not synchronized; the governor keeps it behind a mutex.
/// Records are never edited; the only removal is retention pruning.
///
/// Every record also remembers the snapshot file it is persisted in. A
/// record appended here lives in the file of its own day, but a file loaded
/// from disk may carry records of an earlier day (a process that ran past
/// midnight), and rewriting that file must keep them.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
    /// Snapshot day of each record, parallel to `records`
    snapshot_days: Vec<String>,
    batch_size: usize,
    appends: u64,
    /// Days appended to since their snapshot was last written
    dirty_days: BTreeSet<String>,
    /// Days whose snapshot file has been read into the ledger
    loaded_days: BTreeSet<String>,
}

impl UsageLedger {
    pub fn new(batch_size: usize) -> Self {
        Self {
            records: Vec::new(),
            snapshot_days: Vec::new(),
            batch_size: batch_size.max(1),
            appends: 0,
            dirty_days: BTreeSet::new(),
            loaded_days: BTreeSet::new(),
        }
    }

    /// Ledger seeded with the contents of the snapshot file of `snapshot_day`
    pub fn with_snapshot(batch_size: usize, snapshot_day: &str, records: Vec<UsageRecord>) -> Self {
        let mut ledger = Self::new(batch_size);
        ledger.adopt_snapshot(snapshot_day, records);
        ledger
    }

    /// Whether the snapshot file of `day` has been read into the ledger
    pub fn has_snapshot(&self, day: &str) -> bool {
        self.loaded_days.contains(day)
    }

    /// Take in the records read from the snapshot file of `day`. They do
    /// not count as appends and do not mark the day dirty.
    pub fn adopt_snapshot(&mut self, day: &str, records: Vec<UsageRecord>) {
        self.loaded_days.insert(day.to_string());
        self.snapshot_days
            .extend(std::iter::repeat(day.to_string()).take(records.len()));
        self.records.extend(records);
    }

    /// Append a record. Returns true when this append reaches a batch
    /// boundary and a snapshot should be written.
    pub fn append(&mut self, record: UsageRecord) -> bool {
        self.dirty_days.insert(record.period_key.clone());
        self.snapshot_days.push(record.period_key.clone());
        self.records.push(record);
        self.appends += 1;
        self.appends % self.batch_size as u64 == 0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn records_for_day<'a>(&'a self, day: &'a str) -> impl Iterator<Item = &'a UsageRecord> + 'a {
        self.records.iter().filter(move |r| r.period_key == day)
    }

    /// Records persisted in the snapshot file of `day`, in ledger order
    pub fn snapshot_records<'a>(&'a self, day: &'a str) -> impl Iterator<Item = &'a UsageRecord> + 'a {
        self.records
            .iter()
            .zip(&self.snapshot_days)
            .filter(move |(_, snapshot_day)| snapshot_day.as_str() == day)
            .map(|(record, _)| record)
    }

    /// Total cost recorded on `day`
    pub fn total_for_day(&self, day: &str) -> f64 {
        self.records_for_day(day).map(|r| r.cost).sum()
    }

    /// Total cost recorded on `day` by `agent_type`
    pub fn agent_total_for_day(&self, day: &str, agent_type: &str) -> f64 {
        self.records_for_day(day)
            .filter(|r| r.agent_type == agent_type)
            .map(|r| r.cost)
            .sum()
    }

    pub fn count_for_day(&self, day: &str) -> usize {
        self.records_for_day(day).count()
    }

    pub fn dirty_days(&self) -> Vec<String> {
        self.dirty_days.iter().cloned().collect()
    }

    pub fn mark_clean(&mut self, day: &str) {
        self.dirty_days.remove(day);
    }

    /// Drop records whose day key sorts before `cutoff_day`. A record is
    /// kept while the snapshot file holding it is inside the window, so a
    /// later rewrite of that file still contains it. Returns the number of
    /// records removed.
    pub fn prune_before(&mut self, cutoff_day: &str) -> usize {
        let before = self.records.len();
        let (records, snapshot_days): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .zip(std::mem::take(&mut self.snapshot_days))
            .filter(|(record, snapshot_day)| {
                record.period_key.as_str() >= cutoff_day || snapshot_day.as_str() >= cutoff_day
            })
            .unzip();
        self.records = records;
        self.snapshot_days = snapshot_days;
        // Pruned days must not be rewritten from a partial in-memory view
        self.dirty_days.retain(|day| day.as_str() >= cutoff_day);
        before - self.records.len()
    }
}
