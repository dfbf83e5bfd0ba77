use tracing::debug;

use super::error::{DebtError, Result};
use super::recurrence::{RATE_EPSILON, debt_multiplier, next_debt, stabilizing_balance};

/// Closed-form constant primary balance taking `x0` to `target` in exactly `years` steps.
///
/// Solves `alpha^n * x0 - s * (1 - alpha^n) / (1 - alpha) = target` for `s`.
pub fn constant_balance_for_target(
    x0: f64,
    target: f64,
    years: u32,
    r: f64,
    g: f64,
) -> Result<f64> {
    if years == 0 {
        return Err(DebtError::invalid("target_years", "must be > 0"));
    }

    let alpha = debt_multiplier(r, g);
    if (1.0 - alpha).abs() < RATE_EPSILON {
        return Err(DebtError::RatesCoincide {
            quantity: "constant balance",
            r,
            g,
        });
    }

    let exponent = i32::try_from(years)
        .map_err(|_| DebtError::invalid("target_years", format!("{years} is too large")))?;
    let alpha_n = alpha.powi(exponent);
    if (1.0 - alpha_n).abs() < RATE_EPSILON {
        return Err(DebtError::DegenerateHorizon { alpha, years });
    }

    Ok((alpha_n * x0 - target) * (1.0 - alpha) / (1.0 - alpha_n))
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressiveConfig {
    pub effort: f64,
    pub max_iterations: u32,
}

/// One round of the progressive adjustment, recorded after the debt update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressiveStep {
    pub debt: f64,
    pub applied_balance: f64,
    pub stabilizing_balance: f64,
}

#[derive(Debug, Clone)]
pub struct ProgressiveRun {
    pub steps: Vec<ProgressiveStep>,
    pub iterations: u32,
}

/// Raises the applied balance by at most `effort` per year until it covers the
/// stabilizing balance of the current debt level.
pub fn run_progressive_adjustment(
    x0: f64,
    s0: f64,
    r: f64,
    g: f64,
    config: ProgressiveConfig,
) -> Result<ProgressiveRun> {
    if !config.effort.is_finite() || config.effort <= 0.0 {
        return Err(DebtError::invalid("effort", "must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(DebtError::invalid("max_iterations", "must be > 0"));
    }

    let mut debt = x0;
    let mut applied = s0;
    let mut steps = Vec::new();
    let mut iterations = 0;

    while stabilizing_balance(debt, r, g) > applied {
        if iterations == config.max_iterations {
            return Err(DebtError::NotConverged {
                max_iterations: config.max_iterations,
                debt,
                applied_balance: applied,
                stabilizing_balance: stabilizing_balance(debt, r, g),
            });
        }
        iterations += 1;

        let target = stabilizing_balance(debt, r, g);
        if target - applied > config.effort {
            applied += config.effort;
        } else {
            applied = target;
        }

        debt = next_debt(debt, applied, r, g);
        steps.push(ProgressiveStep {
            debt,
            applied_balance: applied,
            stabilizing_balance: stabilizing_balance(debt, r, g),
        });
    }

    debug!(iterations, final_debt = debt, final_balance = applied, "progressive adjustment converged");
    Ok(ProgressiveRun { steps, iterations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorCategory;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn simulate_constant(x0: f64, s: f64, years: u32, r: f64, g: f64) -> f64 {
        (0..years).fold(x0, |x, _| next_debt(x, s, r, g))
    }

    fn config(effort: f64) -> ProgressiveConfig {
        ProgressiveConfig {
            effort,
            max_iterations: 1_000,
        }
    }

    #[test]
    fn constant_balance_lands_on_target_for_reference_scenario() {
        let (r, g) = (0.025, 0.018);
        let s = constant_balance_for_target(1.15, 1.0, 10, r, g).expect("defined");
        let landed = simulate_constant(1.15, s, 10, r, g);
        assert_approx_tol(landed, 1.0, 1e-9);
        assert!(s > stabilizing_balance(1.15, r, g));
    }

    #[test]
    fn constant_balance_rejects_equal_rates() {
        let err = constant_balance_for_target(1.15, 1.0, 10, 0.02, 0.02).expect_err("alpha = 1");
        assert_eq!(err.category(), ErrorCategory::Domain);
        assert!(matches!(err, DebtError::RatesCoincide { .. }));
    }

    #[test]
    fn constant_balance_rejects_alpha_power_of_one() {
        // alpha = -1 with an even horizon.
        let err = constant_balance_for_target(1.0, 0.5, 2, -2.5, 0.5).expect_err("alpha^n = 1");
        assert!(matches!(err, DebtError::DegenerateHorizon { years: 2, .. }));
        assert_eq!(err.category(), ErrorCategory::Domain);
    }

    #[test]
    fn constant_balance_rejects_zero_horizon() {
        let err = constant_balance_for_target(1.0, 0.5, 0, 0.03, 0.01).expect_err("n = 0");
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn constant_balance_rejects_horizon_beyond_exponent_range() {
        let err = constant_balance_for_target(1.15, 1.0, 2_147_483_649, 0.025, 0.018)
            .expect_err("exponent does not fit");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("target_years"));
    }

    #[test]
    fn progressive_converges_for_reference_deficit() {
        let run = run_progressive_adjustment(1.15, -0.032, 0.025, 0.018, config(0.005))
            .expect("must converge");
        assert!(run.iterations > 0);
        assert_eq!(run.steps.len(), run.iterations as usize);

        let last = run.steps.last().expect("at least one step");
        assert!(last.stabilizing_balance <= last.applied_balance);
        let previous = run.steps[run.steps.len() - 2];
        assert!(previous.stabilizing_balance > previous.applied_balance);
    }

    #[test]
    fn progressive_is_empty_when_balance_already_stabilizes() {
        let run = run_progressive_adjustment(1.0, 0.05, 0.03, 0.01, config(0.005))
            .expect("nothing to do");
        assert_eq!(run.iterations, 0);
        assert!(run.steps.is_empty());
    }

    #[test]
    fn progressive_rejects_non_positive_effort() {
        for effort in [0.0, -0.01, f64::NAN] {
            let err = run_progressive_adjustment(1.15, -0.032, 0.025, 0.018, config(effort))
                .expect_err("invalid effort");
            assert_eq!(err.category(), ErrorCategory::Configuration);
        }
    }

    #[test]
    fn progressive_reports_non_convergence_at_iteration_cap() {
        // Debt explodes faster than a tiny effort can follow.
        let err = run_progressive_adjustment(
            1.0,
            -0.05,
            0.5,
            0.0,
            ProgressiveConfig {
                effort: 1e-6,
                max_iterations: 25,
            },
        )
        .expect_err("cannot converge");
        assert!(matches!(
            err,
            DebtError::NotConverged {
                max_iterations: 25,
                ..
            }
        ));
        assert_eq!(err.category(), ErrorCategory::NonConvergence);
    }

    #[test]
    fn progressive_final_correction_snaps_to_target() {
        let run = run_progressive_adjustment(1.0, 0.0, 0.03, 0.01, config(0.5)).expect("converges");
        assert!(run.iterations >= 1);
        assert_approx_tol(
            run.steps[0].applied_balance,
            stabilizing_balance(1.0, 0.03, 0.01),
            1e-15,
        );
        assert_approx_tol(run.steps[0].debt, 1.0, 1e-12);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_constant_balance_lands_on_target(
            x0_bp in 0u32..25_000,
            target_bp in 0u32..25_000,
            years in 1u32..40,
            r_bp in -200i32..1_200,
            g_bp in -200i32..1_200,
        ) {
            prop_assume!(r_bp != g_bp);
            let x0 = x0_bp as f64 / 10_000.0;
            let target = target_bp as f64 / 10_000.0;
            let r = r_bp as f64 / 10_000.0;
            let g = g_bp as f64 / 10_000.0;

            let s = constant_balance_for_target(x0, target, years, r, g).expect("defined");
            let landed = simulate_constant(x0, s, years, r, g);
            prop_assert!((landed - target).abs() <= 1e-8 * (1.0 + x0 + target));
        }

        // With r > g the gap to the stabilizing balance shrinks whenever it is
        // below alpha * effort / (alpha - 1); every case generated here starts below it.
        #[test]
        fn prop_progressive_converges_with_monotone_capped_balance(
            x0_bp in 0u32..20_000,
            s0_bp in -800i32..200,
            spread_bp in 1i32..150,
            g_bp in -100i32..500,
            effort_bp in 20u32..200,
        ) {
            let x0 = x0_bp as f64 / 10_000.0;
            let s0 = s0_bp as f64 / 10_000.0;
            let g = g_bp as f64 / 10_000.0;
            let r = (g_bp + spread_bp) as f64 / 10_000.0;
            let effort = effort_bp as f64 / 10_000.0;

            let run = run_progressive_adjustment(
                x0,
                s0,
                r,
                g,
                ProgressiveConfig { effort, max_iterations: 10_000 },
            );
            prop_assert!(
                run.is_ok(),
                "r = {r}, g = {g}, x0 = {x0}, s0 = {s0}, effort = {effort}: {:?}",
                run.as_ref().err()
            );
            let run = run.expect("checked");

            let mut previous = s0;
            for step in &run.steps {
                prop_assert!(step.applied_balance >= previous - 1e-15);
                prop_assert!(step.applied_balance - previous <= effort + 1e-12);
                previous = step.applied_balance;
            }
        }
    }
}
