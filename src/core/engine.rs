use tracing::{debug, warn};

use super::error::Result;
use super::recurrence::{debt_multiplier, next_debt, stabilizing_balance, stabilizing_debt};
use super::solver::{ProgressiveConfig, constant_balance_for_target, run_progressive_adjustment};
use super::types::{
    BalanceKind, Diagnostics, Policy, PolicyOutcome, ScenarioParams, TerminalBalance,
    TrajectoryPoint,
};

/// Validates `params` and runs the requested policy.
pub fn evaluate(policy: Policy, params: &ScenarioParams) -> Result<PolicyOutcome> {
    debug!(%policy, ?params, "evaluating policy");

    let outcome = match policy {
        Policy::Baseline => run_baseline(params),
        Policy::Instantaneous => run_instantaneous_adjustment(params),
        Policy::Progressive => run_progressive(params),
        Policy::VariableReduction => run_variable_reduction(params),
        Policy::ConstantReduction => run_constant_reduction(params),
    };
    outcome.map_err(|e| e.in_policy(policy))
}

/// No policy change: debt evolves under the initial balance for
/// `projection_years`, reporting the stabilizing balance of each year's debt.
pub fn run_baseline(params: &ScenarioParams) -> Result<PolicyOutcome> {
    params.validate()?;
    let (r, g) = rates(params);
    let fixed_point = match stabilizing_debt(params.initial_balance, r, g) {
        Ok(x) => Some(x),
        Err(e) => {
            warn!(error = %e, "baseline fixed point is undefined");
            None
        }
    };

    let debts = iterate_constant(
        params.initial_debt,
        params.initial_balance,
        params.projection_years,
        r,
        g,
    );
    let points = debts
        .iter()
        .enumerate()
        .map(|(k, &debt)| {
            let stabilizing = stabilizing_balance(debt, r, g);
            point(params, k, debt, stabilizing, BalanceKind::Stabilizing, r, g)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PolicyOutcome::new(
        Policy::Baseline,
        points,
        Diagnostics {
            fixed_point,
            ..Diagnostics::default()
        },
    ))
}

/// Applies the stabilizing balance of the initial debt from the first year on
/// and keeps it fixed; it is not recomputed as debt moves.
pub fn run_instantaneous_adjustment(params: &ScenarioParams) -> Result<PolicyOutcome> {
    params.validate()?;
    let (r, g) = rates(params);
    let s_star = stabilizing_balance(params.initial_debt, r, g);

    let debts = iterate_constant(params.initial_debt, s_star, params.projection_years, r, g);
    let points = debts
        .iter()
        .enumerate()
        .map(|(k, &debt)| point(params, k, debt, s_star, BalanceKind::Applied, r, g))
        .collect::<Result<Vec<_>>>()?;

    Ok(PolicyOutcome::new(
        Policy::Instantaneous,
        points,
        Diagnostics {
            stabilizing_balance: Some(s_star),
            ..Diagnostics::default()
        },
    ))
}

/// Moves the applied balance toward the stabilizing balance by at most
/// `effort` per year. The horizon is open-ended, capped by `max_iterations`.
pub fn run_progressive(params: &ScenarioParams) -> Result<PolicyOutcome> {
    params.validate()?;
    let (r, g) = rates(params);
    let run = run_progressive_adjustment(
        params.initial_debt,
        params.initial_balance,
        r,
        g,
        ProgressiveConfig {
            effort: params.effort,
            max_iterations: params.max_iterations,
        },
    )?;

    let mut points = Vec::with_capacity(run.steps.len() + 1);
    points.push(point(
        params,
        0,
        params.initial_debt,
        params.initial_balance,
        BalanceKind::Applied,
        r,
        g,
    )?);
    for (k, step) in run.steps.iter().enumerate() {
        points.push(TrajectoryPoint {
            year: params.year(k + 1)?,
            debt: step.debt,
            balance: step.applied_balance,
            balance_kind: BalanceKind::Applied,
            stabilizing_balance: step.stabilizing_balance,
        });
    }

    Ok(PolicyOutcome::new(
        Policy::Progressive,
        points,
        Diagnostics {
            iterations: Some(run.iterations),
            ..Diagnostics::default()
        },
    ))
}

/// Closes the gap to `target_debt` by a fixed amount each year; the balance is
/// recomputed from the debt level at the start of every year.
///
/// The balance of year `k` is the one applied during the transition to `k + 1`.
/// The terminal year carries the stabilizing balance of the final debt level
/// instead, since no transition leaves it.
pub fn run_variable_reduction(params: &ScenarioParams) -> Result<PolicyOutcome> {
    params.validate()?;
    let (r, g) = rates(params);
    let n = params.target_years;
    let increment = (params.initial_debt - params.target_debt) / f64::from(n);
    let excess = debt_multiplier(r, g) - 1.0;

    let mut points = Vec::with_capacity(n as usize + 1);
    let mut debt = params.initial_debt;
    for k in 0..n as usize {
        let balance = excess * debt + increment;
        points.push(point(params, k, debt, balance, BalanceKind::Applied, r, g)?);
        debt = next_debt(debt, balance, r, g);
    }
    let terminal = stabilizing_balance(debt, r, g);
    points.push(point(
        params,
        n as usize,
        debt,
        terminal,
        BalanceKind::Stabilizing,
        r,
        g,
    )?);

    Ok(PolicyOutcome::new(
        Policy::VariableReduction,
        points,
        Diagnostics {
            annual_reduction: Some(increment),
            ..Diagnostics::default()
        },
    ))
}

/// Holds the single balance that reaches `target_debt` in exactly
/// `target_years` years.
pub fn run_constant_reduction(params: &ScenarioParams) -> Result<PolicyOutcome> {
    params.validate()?;
    let (r, g) = rates(params);
    let s_const = constant_balance_for_target(
        params.initial_debt,
        params.target_debt,
        params.target_years,
        r,
        g,
    )?;

    let debts = iterate_constant(params.initial_debt, s_const, params.target_years, r, g);
    let mut points = debts
        .iter()
        .enumerate()
        .map(|(k, &debt)| point(params, k, debt, s_const, BalanceKind::Applied, r, g))
        .collect::<Result<Vec<_>>>()?;

    if params.terminal_balance == TerminalBalance::Stabilizing {
        if let Some(last) = points.last_mut() {
            last.balance = last.stabilizing_balance;
            last.balance_kind = BalanceKind::Stabilizing;
        }
    }

    Ok(PolicyOutcome::new(
        Policy::ConstantReduction,
        points,
        Diagnostics {
            constant_balance: Some(s_const),
            ..Diagnostics::default()
        },
    ))
}

fn rates(params: &ScenarioParams) -> (f64, f64) {
    (params.interest_rate, params.growth_rate)
}

/// `steps + 1` debt levels starting at `x0` under a constant balance.
pub(crate) fn iterate_constant(x0: f64, balance: f64, steps: u32, r: f64, g: f64) -> Vec<f64> {
    let mut debts = Vec::with_capacity(steps as usize + 1);
    let mut debt = x0;
    debts.push(debt);
    for _ in 0..steps {
        debt = next_debt(debt, balance, r, g);
        debts.push(debt);
    }
    debts
}

fn point(
    params: &ScenarioParams,
    offset: usize,
    debt: f64,
    balance: f64,
    balance_kind: BalanceKind,
    r: f64,
    g: f64,
) -> Result<TrajectoryPoint> {
    Ok(TrajectoryPoint {
        year: params.year(offset)?,
        debt,
        balance,
        balance_kind,
        stabilizing_balance: stabilizing_balance(debt, r, g),
    })
}
