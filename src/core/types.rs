use std::fmt;

use serde::Serialize;

use super::error::DebtError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    Baseline,
    Instantaneous,
    Progressive,
    VariableReduction,
    ConstantReduction,
}

impl Policy {
    pub const ALL: [Policy; 5] = [
        Policy::Baseline,
        Policy::Instantaneous,
        Policy::Progressive,
        Policy::VariableReduction,
        Policy::ConstantReduction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Policy::Baseline => "baseline",
            Policy::Instantaneous => "instantaneous",
            Policy::Progressive => "progressive",
            Policy::VariableReduction => "variable-reduction",
            Policy::ConstantReduction => "constant-reduction",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the `balance` of a trajectory point stands for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceKind {
    /// Primary balance applied during the transition out of this year.
    Applied,
    /// Balance that would hold this year's debt level constant.
    Stabilizing,
}

/// How the last balance sample of the constant-balance reduction is reported.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TerminalBalance {
    /// Keep the constant balance on every sample.
    #[default]
    Applied,
    /// Replace the last sample with the stabilizing balance at the terminal debt.
    Stabilizing,
}

/// Scenario inputs, all ratios as fractions of GDP (1.15 = 115%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioParams {
    pub interest_rate: f64,
    pub growth_rate: f64,
    pub initial_balance: f64,
    pub initial_debt: f64,
    pub target_debt: f64,
    pub base_year: i32,
    pub projection_years: u32,
    pub target_years: u32,
    pub effort: f64,
    pub max_iterations: u32,
    pub terminal_balance: TerminalBalance,
}

impl ScenarioParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 1_000;
    /// Upper bound on `projection_years`, `target_years` and `max_iterations`.
    pub const MAX_HORIZON: u32 = 10_000;

    /// Rejects parameter sets no policy can be evaluated on.
    pub fn validate(&self) -> Result<(), DebtError> {
        for (parameter, value) in [
            ("interest_rate", self.interest_rate),
            ("growth_rate", self.growth_rate),
            ("initial_balance", self.initial_balance),
            ("initial_debt", self.initial_debt),
            ("target_debt", self.target_debt),
            ("effort", self.effort),
        ] {
            if !value.is_finite() {
                return Err(DebtError::invalid(parameter, "must be finite"));
            }
        }

        if 1.0 + self.interest_rate == 0.0 {
            return Err(DebtError::invalid("interest_rate", "must not equal -1"));
        }
        if 1.0 + self.growth_rate == 0.0 {
            return Err(DebtError::invalid("growth_rate", "must not equal -1"));
        }
        if self.initial_debt < 0.0 {
            return Err(DebtError::invalid("initial_debt", "must be >= 0"));
        }
        if self.target_debt < 0.0 {
            return Err(DebtError::invalid("target_debt", "must be >= 0"));
        }
        if self.effort <= 0.0 {
            return Err(DebtError::invalid("effort", "must be > 0"));
        }
        if self.target_years == 0 {
            return Err(DebtError::invalid("target_years", "must be > 0"));
        }
        if self.max_iterations == 0 {
            return Err(DebtError::invalid("max_iterations", "must be > 0"));
        }
        for (parameter, value) in [
            ("projection_years", self.projection_years),
            ("target_years", self.target_years),
            ("max_iterations", self.max_iterations),
        ] {
            if value > Self::MAX_HORIZON {
                return Err(DebtError::invalid(
                    parameter,
                    format!("must be <= {}", Self::MAX_HORIZON),
                ));
            }
        }

        let longest = self
            .projection_years
            .max(self.target_years)
            .max(self.max_iterations);
        if i32::try_from(longest)
            .ok()
            .and_then(|years| self.base_year.checked_add(years))
            .is_none()
        {
            return Err(DebtError::invalid(
                "base_year",
                format!("base_year + {longest} years does not fit in a calendar year"),
            ));
        }
        Ok(())
    }

    /// Calendar year `offset` years after `base_year`.
    pub fn year(&self, offset: usize) -> Result<i32, DebtError> {
        i32::try_from(offset)
            .ok()
            .and_then(|offset| self.base_year.checked_add(offset))
            .ok_or_else(|| {
                DebtError::invalid(
                    "base_year",
                    format!("base_year + {offset} years does not fit in a calendar year"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub year: i32,
    pub debt: f64,
    pub balance: f64,
    pub balance_kind: BalanceKind,
    pub stabilizing_balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub initial_debt: f64,
    pub final_debt: f64,
    pub years: usize,
    pub fixed_point: Option<f64>,
    pub stabilizing_balance: Option<f64>,
    pub constant_balance: Option<f64>,
    pub annual_reduction: Option<f64>,
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutcome {
    pub policy: Policy,
    pub points: Vec<TrajectoryPoint>,
    pub diagnostics: Diagnostics,
}

impl PolicyOutcome {
    pub(crate) fn new(policy: Policy, points: Vec<TrajectoryPoint>, diagnostics: Diagnostics) -> Self {
        let initial_debt = points.first().map_or(0.0, |p| p.debt);
        let final_debt = points.last().map_or(0.0, |p| p.debt);
        let years = points.len().saturating_sub(1);
        Self {
            policy,
            points,
            diagnostics: Diagnostics {
                initial_debt,
                final_debt,
                years,
                ..diagnostics
            },
        }
    }

    pub fn final_point(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }
}

#[cfg(test)]
pub(crate) fn sample_params() -> ScenarioParams {
    ScenarioParams {
        interest_rate: 0.025,
        growth_rate: 0.018,
        initial_balance: -0.032,
        initial_debt: 1.15,
        target_debt: 1.0,
        base_year: 2025,
        projection_years: 5,
        target_years: 10,
        effort: 0.005,
        max_iterations: ScenarioParams::DEFAULT_MAX_ITERATIONS,
        terminal_balance: TerminalBalance::Applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorCategory;

    fn assert_rejects(params: ScenarioParams, parameter: &str) {
        let err = params.validate().expect_err("must reject");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(
            err.to_string().contains(parameter),
            "expected `{parameter}` in `{err}`"
        );
    }

    #[test]
    fn sample_params_are_valid() {
        assert!(sample_params().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_effort() {
        let mut params = sample_params();
        params.effort = 0.0;
        assert_rejects(params, "effort");
        params.effort = -0.01;
        assert_rejects(params, "effort");
    }

    #[test]
    fn validate_rejects_zero_target_years() {
        let mut params = sample_params();
        params.target_years = 0;
        assert_rejects(params, "target_years");
    }

    #[test]
    fn validate_rejects_degenerate_growth_factor() {
        let mut params = sample_params();
        params.growth_rate = -1.0;
        assert_rejects(params, "growth_rate");
    }

    #[test]
    fn validate_rejects_non_finite_values() {
        let mut params = sample_params();
        params.interest_rate = f64::NAN;
        assert_rejects(params, "interest_rate");

        let mut params = sample_params();
        params.initial_debt = f64::INFINITY;
        assert_rejects(params, "initial_debt");
    }

    #[test]
    fn validate_rejects_negative_debt_levels() {
        let mut params = sample_params();
        params.target_debt = -0.1;
        assert_rejects(params, "target_debt");
    }

    #[test]
    fn validate_rejects_base_year_that_overflows_horizon() {
        let mut params = sample_params();
        params.base_year = i32::MAX;
        params.projection_years = 1;
        assert_rejects(params, "base_year");

        params.base_year = i32::MAX - i32::try_from(ScenarioParams::MAX_HORIZON).expect("fits");
        params.projection_years = ScenarioParams::MAX_HORIZON;
        params.max_iterations = ScenarioParams::MAX_HORIZON;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn validate_caps_horizons() {
        let over = ScenarioParams::MAX_HORIZON + 1;

        let mut params = sample_params();
        params.projection_years = over;
        assert_rejects(params, "projection_years");

        let mut params = sample_params();
        params.target_years = over;
        assert_rejects(params, "target_years");

        let mut params = sample_params();
        params.max_iterations = over;
        assert_rejects(params, "max_iterations");
    }

    #[test]
    fn year_reports_overflow_instead_of_wrapping() {
        let mut params = sample_params();
        assert_eq!(params.year(3).expect("fits"), 2028);

        params.base_year = i32::MAX;
        let err = params.year(1).expect_err("overflows");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        let err = params.year(usize::MAX).expect_err("offset too large");
        assert!(err.to_string().contains("base_year"));
    }

    #[test]
    fn outcome_summary_tracks_endpoints() {
        let point = |year, debt| TrajectoryPoint {
            year,
            debt,
            balance: 0.0,
            balance_kind: BalanceKind::Applied,
            stabilizing_balance: 0.0,
        };
        let outcome = PolicyOutcome::new(
            Policy::Instantaneous,
            vec![point(2025, 1.0), point(2026, 1.1), point(2027, 1.2)],
            Diagnostics::default(),
        );
        assert_eq!(outcome.diagnostics.years, 2);
        assert_eq!(outcome.diagnostics.initial_debt, 1.0);
        assert_eq!(outcome.diagnostics.final_debt, 1.2);
    }

    #[test]
    fn policy_names_are_kebab_case() {
        let names: Vec<_> = Policy::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            [
                "baseline",
                "instantaneous",
                "progressive",
                "variable-reduction",
                "constant-reduction"
            ]
        );
        assert_eq!(
            serde_json::to_string(&Policy::VariableReduction).expect("serialize"),
            "\"variable-reduction\""
        );
    }
}
