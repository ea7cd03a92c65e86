use budget_governor::budget::{BudgetGovernor, BudgetPeriod, FixedClock, SnapshotStore, UsageRecord};
use budget_governor::config::GovernorConfig;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 11, day, hour, minute, 0).single().unwrap()
}

fn config_in(dir: &Path) -> GovernorConfig {
    GovernorConfig {
        storage_dir: dir.to_path_buf(),
        ..GovernorConfig::with_daily_budget(10.0)
    }
}

fn governor_at(dir: &Path, clock: &Arc<FixedClock>) -> BudgetGovernor {
    BudgetGovernor::with_clock(config_in(dir), clock.clone()).expect("valid config")
}

fn snapshot_records(dir: &Path, date: &str) -> Vec<UsageRecord> {
    SnapshotStore::open(dir)
        .read_day(date)
        .unwrap()
        .map(|snapshot| snapshot.records)
        .unwrap_or_default()
}

#[test]
fn test_batch_boundary_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 10, 0)));
    let gov = governor_at(dir.path(), &clock);
    let file = dir.path().join("budget_usage_2025-11-21.json");

    for _ in 0..9 {
        gov.record("executor", "llm_call", 0.01, None, false);
    }
    assert!(!file.exists());

    gov.record("executor", "llm_call", 0.01, None, false);
    assert!(file.exists());
    assert_eq!(snapshot_records(dir.path(), "2025-11-21").len(), 10);
}

#[test]
fn test_restart_reloads_today_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 10, 0)));

    let first = governor_at(dir.path(), &clock);
    for i in 0..4 {
        first.record("planner", "llm_call", 0.25, None, i % 2 == 0);
    }
    first.flush().unwrap();
    let before = first.daily_usage();
    drop(first);

    let second = governor_at(dir.path(), &clock);
    assert_eq!(second.daily_usage(), before);
    assert_eq!(second.records().len(), 4);

    // Flushing a freshly loaded day rewrites nothing new
    second.flush().unwrap();
    second.record("planner", "llm_call", 0.25, None, false);
    second.flush().unwrap();
    assert_eq!(snapshot_records(dir.path(), "2025-11-21").len(), 5);

    let third = governor_at(dir.path(), &clock);
    assert_eq!(third.records().len(), 5);
    assert_eq!(third.generate_report(BudgetPeriod::Daily).fallback_count, 2);
}

#[test]
fn test_flush_keeps_earlier_day_records_in_todays_file() {
    let dir = tempfile::tempdir().unwrap();
    // A run that crossed midnight left a record of the 20th in the 21st's file
    SnapshotStore::open(dir.path())
        .write_day(
            "2025-11-21",
            vec![
                UsageRecord::new(at(20, 23, 55), "planner", "llm_call", 0.5, None, false),
                UsageRecord::new(at(21, 0, 10), "executor", "llm_call", 0.25, None, false),
            ],
        )
        .unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 10, 0)));

    let gov = governor_at(dir.path(), &clock);
    assert_eq!(gov.records().len(), 2);
    assert_eq!(gov.daily_usage(), 0.25);

    gov.record("executor", "llm_call", 0.125, None, false);
    gov.flush().unwrap();

    let periods: Vec<String> = snapshot_records(dir.path(), "2025-11-21")
        .into_iter()
        .map(|r| r.period_key)
        .collect();
    assert_eq!(periods, vec!["2025-11-20", "2025-11-21", "2025-11-21"]);
}

#[test]
fn test_rollover_into_existing_file_keeps_its_records() {
    let dir = tempfile::tempdir().unwrap();
    SnapshotStore::open(dir.path())
        .write_day(
            "2025-11-22",
            vec![UsageRecord::new(at(22, 0, 1), "researcher", "web_search", 0.5, None, false)],
        )
        .unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 23, 58)));
    let gov = governor_at(dir.path(), &clock);

    clock.advance(TimeDelta::minutes(4));
    gov.record("executor", "llm_call", 0.25, None, false);
    gov.flush().unwrap();

    assert_eq!(snapshot_records(dir.path(), "2025-11-22").len(), 2);
    assert_eq!(gov.daily_usage(), 0.75);
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("budget_usage_2025-11-21.json"), "{ not json").unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 10, 0)));

    let gov = governor_at(dir.path(), &clock);
    assert_eq!(gov.daily_usage(), 0.0);
    assert!(gov.records().is_empty());
}

#[test]
fn test_write_failures_do_not_reach_record() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the storage directory should be
    let blocked = dir.path().join("not-a-dir");
    fs::write(&blocked, "occupied").unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 10, 0)));

    let gov = governor_at(&blocked, &clock);
    for _ in 0..10 {
        gov.record("executor", "llm_call", 0.01, None, false);
    }
    assert_eq!(gov.records().len(), 10);
    assert!(gov.flush().is_err());
}

#[test]
fn test_midnight_rollover_writes_both_days() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 23, 58)));
    let gov = governor_at(dir.path(), &clock);

    for _ in 0..3 {
        gov.record("executor", "llm_call", 0.5, None, false);
    }
    clock.advance(TimeDelta::minutes(4));
    for _ in 0..2 {
        gov.record("executor", "llm_call", 0.5, None, false);
    }
    gov.flush().unwrap();

    assert_eq!(snapshot_records(dir.path(), "2025-11-21").len(), 3);
    assert_eq!(snapshot_records(dir.path(), "2025-11-22").len(), 2);
    // The new day starts from zero
    assert_eq!(gov.daily_usage(), 1.0);
}

#[test]
fn test_reset_prunes_memory_but_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(at(10, 12, 0)));
    let gov = governor_at(dir.path(), &clock);

    gov.record("executor", "llm_call", 0.5, None, false);
    gov.record("planner", "llm_call", 0.5, None, false);
    gov.flush().unwrap();
    let old_file = dir.path().join("budget_usage_2025-11-10.json");
    let old_bytes = fs::read(&old_file).unwrap();

    clock.advance(TimeDelta::days(8));
    gov.record("executor", "llm_call", 0.25, None, false);
    gov.flush().unwrap();

    assert_eq!(gov.reset(), 2);
    assert_eq!(gov.records().len(), 1);
    assert_eq!(fs::read(&old_file).unwrap(), old_bytes);

    // Nothing left to prune
    assert_eq!(gov.reset(), 0);
}

#[test]
fn test_history_reads_snapshot_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(dir.path());
    for (day, costs) in [(21, vec![0.5, 0.25]), (19, vec![1.0]), (10, vec![2.0])] {
        let records = costs
            .into_iter()
            .map(|cost| UsageRecord::new(at(day, 9, 0), "executor", "llm_call", cost, None, cost > 0.9))
            .collect();
        store
            .write_day(&format!("2025-11-{:02}", day), records)
            .unwrap();
    }

    let clock = Arc::new(FixedClock::new(at(21, 18, 0)));
    let gov = governor_at(dir.path(), &clock);

    let history = gov.history(7);
    let dates: Vec<&str> = history.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(dates, vec!["2025-11-21", "2025-11-19"]);
    assert_eq!(history[0].total_cost, 0.75);
    assert_eq!(history[0].operations, 2);
    assert_eq!(history[1].fallbacks, 1);

    assert_eq!(gov.history(1).len(), 1);
    assert_eq!(gov.history(12).len(), 3);
}

#[test]
fn test_daily_report_matches_recorded_total() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 9, 0)));
    let gov = governor_at(dir.path(), &clock);

    let costs = [0.125, 0.25, 0.0625, 1.5];
    for (i, cost) in costs.iter().enumerate() {
        let agent = if i % 2 == 0 { "executor" } else { "researcher" };
        gov.record(agent, "llm_call", *cost, None, false);
    }
    // Invalid costs are recorded as zero
    gov.record("planner", "llm_call", -3.0, None, false);

    let report = gov.generate_report(BudgetPeriod::Daily);
    assert_eq!(report.total_cost, costs.iter().sum::<f64>());
    assert_eq!(report.total_operations, 5);
    assert_eq!(report.agent_breakdown["planner"].cost, 0.0);
    assert_eq!(report.remaining_budget, 10.0 - report.total_cost);
}

#[test]
fn test_governor_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("budget.toml");
    let storage = dir.path().join("usage");
    fs::write(
        &config_path,
        format!(
            "[budget]\ndaily_budget = 2.5\nbatch_size = 2\nstorage_dir = {:?}\n",
            storage.display().to_string()
        ),
    )
    .unwrap();

    let config = GovernorConfig::load(&config_path).unwrap();
    let clock = Arc::new(FixedClock::new(at(21, 9, 0)));
    let gov = BudgetGovernor::with_clock(config, clock).unwrap();
    assert_eq!(gov.policy().daily().total, 2.5);

    gov.record("executor", "llm_call", 0.1, None, false);
    gov.record("executor", "llm_call", 0.1, None, false);
    assert!(storage.join("budget_usage_2025-11-21.json").exists());
}
