use serde::Serialize;
use thiserror::Error;

use super::types::Policy;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DebtError {
    #[error("{quantity} is undefined when the interest rate equals the growth rate (r = {r}, g = {g})")]
    RatesCoincide {
        quantity: &'static str,
        r: f64,
        g: f64,
    },

    #[error("constant balance is undefined because alpha^n equals 1 (alpha = {alpha}, n = {years})")]
    DegenerateHorizon { alpha: f64, years: u32 },

    #[error("invalid parameter `{parameter}`: {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    #[error(
        "progressive adjustment did not converge within {max_iterations} iterations \
         (debt = {debt}, applied balance = {applied_balance}, stabilizing balance = {stabilizing_balance})"
    )]
    NotConverged {
        max_iterations: u32,
        debt: f64,
        applied_balance: f64,
        stabilizing_balance: f64,
    },

    #[error("{policy}: {source}")]
    InPolicy {
        policy: Policy,
        #[source]
        source: Box<DebtError>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Domain,
    Configuration,
    NonConvergence,
}

impl DebtError {
    pub(crate) fn invalid(parameter: &'static str, message: impl Into<String>) -> Self {
        DebtError::InvalidParameter {
            parameter,
            message: message.into(),
        }
    }

    pub(crate) fn in_policy(self, policy: Policy) -> Self {
        match self {
            DebtError::InPolicy { .. } => self,
            other => DebtError::InPolicy {
                policy,
                source: Box::new(other),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DebtError::RatesCoincide { .. } | DebtError::DegenerateHorizon { .. } => {
                ErrorCategory::Domain
            }
            DebtError::InvalidParameter { .. } => ErrorCategory::Configuration,
            DebtError::NotConverged { .. } => ErrorCategory::NonConvergence,
            DebtError::InPolicy { source, .. } => source.category(),
        }
    }

    pub fn policy(&self) -> Option<Policy> {
        match self {
            DebtError::InPolicy { policy, .. } => Some(*policy),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DebtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_looks_through_policy_context() {
        let err = DebtError::NotConverged {
            max_iterations: 10,
            debt: 1.0,
            applied_balance: 0.0,
            stabilizing_balance: 0.1,
        }
        .in_policy(Policy::Progressive);

        assert_eq!(err.category(), ErrorCategory::NonConvergence);
        assert_eq!(err.policy(), Some(Policy::Progressive));
        assert!(err.to_string().starts_with("progressive: "));
    }

    #[test]
    fn policy_context_is_not_nested_twice() {
        let err = DebtError::invalid("effort", "must be > 0")
            .in_policy(Policy::Progressive)
            .in_policy(Policy::Baseline);
        assert_eq!(err.policy(), Some(Policy::Progressive));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn rate_coincidence_is_a_domain_error() {
        let err = DebtError::RatesCoincide {
            quantity: "stabilizing debt",
            r: 0.02,
            g: 0.02,
        };
        assert_eq!(err.category(), ErrorCategory::Domain);
        assert!(err.to_string().contains("stabilizing debt"));
    }
}
