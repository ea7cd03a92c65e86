//! Budget admission control
//!
//! This module gates cost-bearing operations against a shared daily budget
//! and per-agent sub-allocations. Crossing a limit degrades the operation
//! (cheaper model, cached results only) and blocks it only when no cheaper
//! path is left.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      BudgetGovernor                          │
//! │  ┌──────────────┐   ┌─────────────────────────────────────┐  │
//! │  │ BudgetPolicy │   │     Mutex<UsageLedger>              │  │
//! │  │ • limits     │   │  • append-only records (today +     │  │
//! │  │ • ratios     │   │    records added since start)       │  │
//! │  │ • prices     │   │  • dirty days awaiting snapshot     │  │
//! │  │ • fallbacks  │   └──────────────┬──────────────────────┘  │
//! │  └──────┬───────┘                  │ every Nth record        │
//! │         │                          ▼                         │
//! │         │                 ┌─────────────────┐                │
//! │         │                 │ SnapshotStore   │ budget_usage_  │
//! │         │                 │ (temp + rename) │ <date>.json    │
//! │         ▼                 └─────────────────┘                │
//! │  ┌──────────────────────┐   ┌──────────────────┐             │
//! │  │ AdmissionController  │   │ ReportGenerator  │             │
//! │  │ check → verdict      │   │ report / status  │             │
//! │  └──────────────────────┘   └──────────────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use budget_governor::budget::{BudgetGovernor, FallbackStrategy};
//! use budget_governor::config::GovernorConfig;
//!
//! let governor = BudgetGovernor::new(GovernorConfig::with_daily_budget(10.0))?;
//! let model = "claude-3-5-sonnet-20241022";
//! let estimate = governor.estimate_cost(2_000, 500, model);
//!
//! let verdict = governor.check("executor", "llm_call", estimate, model);
//! if verdict.allowed {
//!     let model = verdict.recommended_model.as_deref().unwrap_or(model);
//!     // ... run the call with `model` ...
//!     let fallback = verdict.strategy == FallbackStrategy::SmallerModel;
//!     governor.record("executor", "llm_call", estimate, Some(model), fallback);
//! }
//! # Ok::<(), budget_governor::BudgetError>(())
//! ```

mod admission;
mod governor;
mod ledger;
pub mod period;
pub mod policy;
mod report;
mod snapshot;
mod types;

pub use admission::{AdmissionController, AdmissionRequest};
pub use governor::BudgetGovernor;
pub use ledger::UsageLedger;
pub use period::{daily_key, period_key, BudgetPeriod, Clock, FixedClock, SystemClock};
pub use policy::{BudgetPolicy, ModelPricing};
pub use report::{
    AgentBreakdown, AgentUsage, BudgetReport, DailyHistory, OperationBreakdown, ReportGenerator,
    StatusSnapshot,
};
pub use snapshot::{DailySnapshot, SnapshotStore};
pub use types::{
    AdmissionVerdict, BudgetLimit, FallbackStrategy, HealthStatus, UsageLevel, UsageRecord,
};
