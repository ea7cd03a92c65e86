//! Budget Governance Engine
//!
//! Gates cost-bearing operations (model invocations, paid searches) issued by
//! several agent roles against shared daily limits and per-agent
//! sub-allocations. When a limit would be crossed the engine degrades the
//! operation (cheaper model, cached results only) before it blocks it.
//!
//! Callers hold a single [`BudgetGovernor`] per process, ask it to
//! [`check`](BudgetGovernor::check) before an operation and
//! [`record`](BudgetGovernor::record) the actual cost afterwards.

pub mod budget;
pub mod config;
pub mod error;

#[cfg(feature = "cli")]
pub mod cli;

pub use budget::{AdmissionVerdict, BudgetGovernor, BudgetPeriod, FallbackStrategy};
pub use config::GovernorConfig;
pub use error::{BudgetError, BudgetResult};
