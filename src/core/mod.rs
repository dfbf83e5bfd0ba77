mod engine;
mod error;
mod phase;
mod recurrence;
mod solver;
mod types;

pub use engine::{
    evaluate, run_baseline, run_constant_reduction, run_instantaneous_adjustment,
    run_progressive, run_variable_reduction,
};
pub use error::{DebtError, ErrorCategory, Result};
pub use phase::{CobwebSegment, MAP_SAMPLES, PhaseDiagram, PhasePoint, baseline_phase_diagram};
pub use recurrence::{debt_multiplier, next_debt, stabilizing_balance, stabilizing_debt};
pub use solver::{
    ProgressiveConfig, ProgressiveRun, ProgressiveStep, constant_balance_for_target,
    run_progressive_adjustment,
};
pub use types::{
    BalanceKind, Diagnostics, Policy, PolicyOutcome, ScenarioParams, TerminalBalance,
    TrajectoryPoint,
};
