//! Phase-diagram data for the baseline: the one-year debt map `y = alpha * x - s0`
//! plotted against `y = x`, with the cobweb staircase traced by the iteration.

use serde::Serialize;

use super::engine::iterate_constant;
use super::error::Result;
use super::recurrence::{next_debt, stabilizing_debt};
use super::types::{Policy, ScenarioParams};

pub const MAP_SAMPLES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhasePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CobwebSegment {
    pub from: PhasePoint,
    pub to: PhasePoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDiagram {
    pub domain_min: f64,
    pub domain_max: f64,
    pub map: Vec<PhasePoint>,
    pub cobweb: Vec<CobwebSegment>,
    pub initial: PhasePoint,
    pub terminal: PhasePoint,
    pub fixed_point: Option<PhasePoint>,
}

/// The map is sampled on `x0 +/- |x0 + x_t| / 2` in fractions of GDP, not the wider `x0 +/- 2|x0|`.
pub fn baseline_phase_diagram(params: &ScenarioParams) -> Result<PhaseDiagram> {
    params
        .validate()
        .map_err(|e| e.in_policy(Policy::Baseline))?;

    let (r, g, s0) = (params.interest_rate, params.growth_rate, params.initial_balance);
    let debts = iterate_constant(params.initial_debt, s0, params.projection_years, r, g);
    let x0 = params.initial_debt;
    let last = debts.last().copied().unwrap_or(x0);

    let mut half_width = (x0 + last).abs() * 0.5;
    if half_width == 0.0 {
        half_width = 1.0;
    }
    let (lo, hi) = (x0 - half_width, x0 + half_width);

    let step = (hi - lo) / (MAP_SAMPLES - 1) as f64;
    let map = (0..MAP_SAMPLES)
        .map(|i| {
            let x = if i == MAP_SAMPLES - 1 { hi } else { lo + step * i as f64 };
            PhasePoint {
                x,
                y: next_debt(x, s0, r, g),
            }
        })
        .collect();

    let mut cobweb = Vec::with_capacity(2 * debts.len().saturating_sub(1));
    for pair in debts.windows(2) {
        let (x, y) = (pair[0], pair[1]);
        cobweb.push(CobwebSegment {
            from: PhasePoint { x, y: x },
            to: PhasePoint { x, y },
        });
        cobweb.push(CobwebSegment {
            from: PhasePoint { x, y },
            to: PhasePoint { x: y, y },
        });
    }

    let fixed_point = stabilizing_debt(s0, r, g)
        .ok()
        .map(|x| PhasePoint { x, y: x });

    Ok(PhaseDiagram {
        domain_min: lo,
        domain_max: hi,
        map,
        cobweb,
        initial: PhasePoint { x: x0, y: x0 },
        terminal: PhasePoint { x: last, y: last },
        fixed_point,
    })
}
