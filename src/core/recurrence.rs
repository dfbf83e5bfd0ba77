use super::error::{DebtError, Result};

/// Below this distance from 1 the debt multiplier is treated as exactly 1.
pub const RATE_EPSILON: f64 = 1e-12;

/// Interest-growth multiplier `alpha = (1 + r) / (1 + g)`.
pub fn debt_multiplier(r: f64, g: f64) -> f64 {
    (1.0 + r) / (1.0 + g)
}

/// One year of the debt law of motion: `x' = alpha * x - s`.
pub fn next_debt(x: f64, s: f64, r: f64, g: f64) -> f64 {
    debt_multiplier(r, g) * x - s
}

/// Primary balance holding debt level `x` constant for one year.
pub fn stabilizing_balance(x: f64, r: f64, g: f64) -> f64 {
    ((r - g) / (1.0 + g)) * x
}

/// Fixed point of [`next_debt`] under the constant balance `s`.
pub fn stabilizing_debt(s: f64, r: f64, g: f64) -> Result<f64> {
    let gap = debt_multiplier(r, g) - 1.0;
    if gap.abs() < RATE_EPSILON {
        return Err(DebtError::RatesCoincide {
            quantity: "stabilizing debt",
            r,
            g,
        });
    }
    Ok(s / gap)
}
