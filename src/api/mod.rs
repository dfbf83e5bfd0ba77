use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    BalanceKind, DebtError, Diagnostics, ErrorCategory, PhaseDiagram, PhasePoint, Policy,
    PolicyOutcome, ScenarioParams, TerminalBalance, baseline_phase_diagram, evaluate,
};

/// Inputs and outputs at this boundary are in percent; the core works in fractions.
const PERCENT: f64 = 100.0;

fn to_fraction(percent: f64) -> f64 {
    percent / PERCENT
}

fn to_percent(fraction: f64) -> f64 {
    fraction * PERCENT
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPolicy {
    Baseline,
    Instantaneous,
    Progressive,
    VariableReduction,
    ConstantReduction,
}

impl From<CliPolicy> for Policy {
    fn from(value: CliPolicy) -> Self {
        match value {
            CliPolicy::Baseline => Policy::Baseline,
            CliPolicy::Instantaneous => Policy::Instantaneous,
            CliPolicy::Progressive => Policy::Progressive,
            CliPolicy::VariableReduction => Policy::VariableReduction,
            CliPolicy::ConstantReduction => Policy::ConstantReduction,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliTerminalBalance {
    Applied,
    Stabilizing,
}

impl From<CliTerminalBalance> for TerminalBalance {
    fn from(value: CliTerminalBalance) -> Self {
        match value {
            CliTerminalBalance::Applied => TerminalBalance::Applied,
            CliTerminalBalance::Stabilizing => TerminalBalance::Stabilizing,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPolicy {
    #[serde(alias = "current", alias = "status-quo")]
    Baseline,
    #[serde(alias = "instant")]
    Instantaneous,
    #[serde(alias = "gradual", alias = "smoothed")]
    Progressive,
    #[serde(alias = "variableReduction", alias = "variable_reduction")]
    VariableReduction,
    #[serde(alias = "constantReduction", alias = "constant_reduction")]
    ConstantReduction,
}

impl From<ApiPolicy> for CliPolicy {
    fn from(value: ApiPolicy) -> Self {
        match value {
            ApiPolicy::Baseline => CliPolicy::Baseline,
            ApiPolicy::Instantaneous => CliPolicy::Instantaneous,
            ApiPolicy::Progressive => CliPolicy::Progressive,
            ApiPolicy::VariableReduction => CliPolicy::VariableReduction,
            ApiPolicy::ConstantReduction => CliPolicy::ConstantReduction,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTerminalBalance {
    Applied,
    #[serde(alias = "stable")]
    Stabilizing,
}

impl From<ApiTerminalBalance> for CliTerminalBalance {
    fn from(value: ApiTerminalBalance) -> Self {
        match value {
            ApiTerminalBalance::Applied => CliTerminalBalance::Applied,
            ApiTerminalBalance::Stabilizing => CliTerminalBalance::Stabilizing,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    policy: Option<ApiPolicy>,
    interest_rate: Option<f64>,
    growth_rate: Option<f64>,
    primary_balance: Option<f64>,
    debt: Option<f64>,
    debt_target: Option<f64>,
    base_year: Option<i32>,
    projection_years: Option<i64>,
    target_years: Option<i64>,
    effort: Option<f64>,
    max_iterations: Option<i64>,
    terminal_balance: Option<ApiTerminalBalance>,
}

#[derive(Parser, Debug)]
#[command(
    name = "debt-dynamics",
    about = "Public debt-to-GDP trajectories under simple fiscal adjustment rules"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Evaluate one policy and print the JSON result
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, value_enum, default_value_t = CliPolicy::Baseline)]
    pub policy: CliPolicy,
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, help = "Pretty-print the JSON output")]
    pub pretty: bool,
}

/// Scenario flags, all rates and ratios in percent.
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, default_value_t = 2.5, allow_hyphen_values = true, help = "Interest rate r (%)")]
    pub interest_rate: f64,
    #[arg(long, default_value_t = 1.8, allow_hyphen_values = true, help = "Growth rate g (%)")]
    pub growth_rate: f64,
    #[arg(
        long,
        default_value_t = -3.2,
        allow_hyphen_values = true,
        help = "Current primary balance (% of GDP, negative = deficit)"
    )]
    pub primary_balance: f64,
    #[arg(long, default_value_t = 115.0, help = "Current debt (% of GDP)")]
    pub debt: f64,
    #[arg(long, default_value_t = 100.0, help = "Debt target (% of GDP)")]
    pub debt_target: f64,
    #[arg(long, default_value_t = 2025, allow_hyphen_values = true)]
    pub base_year: i32,
    #[arg(
        long,
        default_value_t = 5,
        allow_hyphen_values = true,
        help = "Projection horizon for the baseline and instantaneous adjustment (years)"
    )]
    pub projection_years: i64,
    #[arg(
        long,
        default_value_t = 10,
        allow_hyphen_values = true,
        help = "Years allowed to reach the debt target"
    )]
    pub target_years: i64,
    #[arg(
        long,
        default_value_t = 0.5,
        allow_hyphen_values = true,
        help = "Maximum annual balance improvement for progressive adjustment (% of GDP)"
    )]
    pub effort: f64,
    #[arg(long, default_value_t = ScenarioParams::DEFAULT_MAX_ITERATIONS as i64, allow_hyphen_values = true)]
    pub max_iterations: i64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliTerminalBalance::Applied,
        help = "Last balance sample of the constant-balance reduction"
    )]
    pub terminal_balance: CliTerminalBalance,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            interest_rate: 2.5,
            growth_rate: 1.8,
            primary_balance: -3.2,
            debt: 115.0,
            debt_target: 100.0,
            base_year: 2025,
            projection_years: 5,
            target_years: 10,
            effort: 0.5,
            max_iterations: ScenarioParams::DEFAULT_MAX_ITERATIONS as i64,
            terminal_balance: CliTerminalBalance::Applied,
        }
    }
}

#[derive(Debug, Clone)]
struct ApiRequest {
    policy: Policy,
    params: ScenarioParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParametersResponse {
    interest_rate: f64,
    growth_rate: f64,
    primary_balance: f64,
    debt: f64,
    debt_target: f64,
    base_year: i32,
    projection_years: u32,
    target_years: u32,
    effort: f64,
    max_iterations: u32,
}

impl From<&ScenarioParams> for ParametersResponse {
    fn from(params: &ScenarioParams) -> Self {
        Self {
            interest_rate: to_percent(params.interest_rate),
            growth_rate: to_percent(params.growth_rate),
            primary_balance: to_percent(params.initial_balance),
            debt: to_percent(params.initial_debt),
            debt_target: to_percent(params.target_debt),
            base_year: params.base_year,
            projection_years: params.projection_years,
            target_years: params.target_years,
            effort: to_percent(params.effort),
            max_iterations: params.max_iterations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PointResponse {
    year: i32,
    debt_percent: f64,
    balance_percent: f64,
    balance_kind: BalanceKind,
    stabilizing_balance_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsResponse {
    initial_debt_percent: f64,
    final_debt_percent: f64,
    years: usize,
    fixed_point_percent: Option<f64>,
    stabilizing_balance_percent: Option<f64>,
    constant_balance_percent: Option<f64>,
    annual_reduction_percent: Option<f64>,
    iterations: Option<u32>,
}

impl From<&Diagnostics> for DiagnosticsResponse {
    fn from(d: &Diagnostics) -> Self {
        Self {
            initial_debt_percent: to_percent(d.initial_debt),
            final_debt_percent: to_percent(d.final_debt),
            years: d.years,
            fixed_point_percent: d.fixed_point.map(to_percent),
            stabilizing_balance_percent: d.stabilizing_balance.map(to_percent),
            constant_balance_percent: d.constant_balance.map(to_percent),
            annual_reduction_percent: d.annual_reduction.map(to_percent),
            iterations: d.iterations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    policy: Policy,
    parameters: ParametersResponse,
    points: Vec<PointResponse>,
    diagnostics: DiagnosticsResponse,
    phase_diagram: Option<PhaseDiagram>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    category: Option<ErrorCategory>,
    policy: Option<Policy>,
}

#[derive(Debug, Serialize)]
struct PoliciesResponse {
    policies: Vec<Policy>,
}

fn build_params(args: &ScenarioArgs) -> Result<ScenarioParams, String> {
    if args.projection_years < 0 {
        return Err("--projection-years must be >= 0".to_string());
    }

    if args.target_years <= 0 {
        return Err("--target-years must be > 0".to_string());
    }

    if !args.effort.is_finite() || args.effort <= 0.0 {
        return Err("--effort must be > 0".to_string());
    }

    if args.max_iterations <= 0 {
        return Err("--max-iterations must be > 0".to_string());
    }

    let max_horizon = i64::from(ScenarioParams::MAX_HORIZON);
    for (name, value) in [
        ("--projection-years", args.projection_years),
        ("--target-years", args.target_years),
        ("--max-iterations", args.max_iterations),
    ] {
        if value > max_horizon {
            return Err(format!("{name} must be <= {max_horizon}"));
        }
    }

    if !args.debt.is_finite() || args.debt < 0.0 {
        return Err("--debt must be >= 0".to_string());
    }

    if !args.debt_target.is_finite() || args.debt_target < 0.0 {
        return Err("--debt-target must be >= 0".to_string());
    }

    for (name, rate) in [
        ("--interest-rate", args.interest_rate),
        ("--growth-rate", args.growth_rate),
    ] {
        if !rate.is_finite() || rate == -PERCENT {
            return Err(format!("{name} must be finite and different from -100"));
        }
    }

    if !args.primary_balance.is_finite() {
        return Err("--primary-balance must be finite".to_string());
    }

    let projection_years = u32::try_from(args.projection_years)
        .map_err(|_| "--projection-years is too large".to_string())?;
    let target_years = u32::try_from(args.target_years)
        .map_err(|_| "--target-years is too large".to_string())?;
    let max_iterations = u32::try_from(args.max_iterations)
        .map_err(|_| "--max-iterations is too large".to_string())?;

    let params = ScenarioParams {
        interest_rate: to_fraction(args.interest_rate),
        growth_rate: to_fraction(args.growth_rate),
        initial_balance: to_fraction(args.primary_balance),
        initial_debt: to_fraction(args.debt),
        target_debt: to_fraction(args.debt_target),
        base_year: args.base_year,
        projection_years,
        target_years,
        effort: to_fraction(args.effort),
        max_iterations,
        terminal_balance: args.terminal_balance.into(),
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

fn run_request(request: &ApiRequest) -> Result<SimulateResponse, DebtError> {
    let outcome = evaluate(request.policy, &request.params)?;
    let phase_diagram = match request.policy {
        Policy::Baseline => Some(percent_phase_diagram(baseline_phase_diagram(
            &request.params,
        )?)),
        _ => None,
    };
    Ok(build_simulate_response(&request.params, &outcome, phase_diagram))
}

fn build_simulate_response(
    params: &ScenarioParams,
    outcome: &PolicyOutcome,
    phase_diagram: Option<PhaseDiagram>,
) -> SimulateResponse {
    SimulateResponse {
        policy: outcome.policy,
        parameters: params.into(),
        points: outcome
            .points
            .iter()
            .map(|p| PointResponse {
                year: p.year,
                debt_percent: to_percent(p.debt),
                balance_percent: to_percent(p.balance),
                balance_kind: p.balance_kind,
                stabilizing_balance_percent: to_percent(p.stabilizing_balance),
            })
            .collect(),
        diagnostics: (&outcome.diagnostics).into(),
        phase_diagram,
    }
}

fn percent_phase_diagram(diagram: PhaseDiagram) -> PhaseDiagram {
    let scale = |p: PhasePoint| PhasePoint {
        x: to_percent(p.x),
        y: to_percent(p.y),
    };
    PhaseDiagram {
        domain_min: to_percent(diagram.domain_min),
        domain_max: to_percent(diagram.domain_max),
        map: diagram.map.into_iter().map(scale).collect(),
        cobweb: diagram
            .cobweb
            .into_iter()
            .map(|s| crate::core::CobwebSegment {
                from: scale(s.from),
                to: scale(s.to),
            })
            .collect(),
        initial: scale(diagram.initial),
        terminal: scale(diagram.terminal),
        fixed_point: diagram.fixed_point.map(scale),
    }
}

/// Runs the `simulate` subcommand and returns the JSON document to print.
pub fn run_simulate_command(args: &SimulateArgs) -> Result<String, String> {
    let params = build_params(&args.scenario)?;
    let request = ApiRequest {
        policy: args.policy.into(),
        params,
    };
    let response = run_request(&request).map_err(|e| e.to_string())?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    json.map_err(|e| format!("Failed to serialize response: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/policies", get(policies_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("debt dynamics API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None, None)
}

async fn policies_handler() -> Response {
    json_response(
        StatusCode::OK,
        PoliciesResponse {
            policies: Policy::ALL.to_vec(),
        },
    )
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected simulate request");
            return error_response(
                StatusCode::BAD_REQUEST,
                &msg,
                Some(ErrorCategory::Configuration),
                None,
            );
        }
    };

    match run_request(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => {
            warn!(error = %e, policy = %request.policy, "simulation failed");
            error_response(
                status_for(&e),
                &e.to_string(),
                Some(e.category()),
                e.policy(),
            )
        }
    }
}

fn status_for(err: &DebtError) -> StatusCode {
    match err.category() {
        ErrorCategory::Configuration => StatusCode::BAD_REQUEST,
        ErrorCategory::Domain | ErrorCategory::NonConvergence => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(
    status: StatusCode,
    msg: &str,
    category: Option<ErrorCategory>,
    policy: Option<Policy>,
) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            category,
            policy,
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut args = ScenarioArgs::default();
    let policy = payload
        .policy
        .map(CliPolicy::from)
        .unwrap_or(CliPolicy::Baseline);

    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.growth_rate {
        args.growth_rate = v;
    }
    if let Some(v) = payload.primary_balance {
        args.primary_balance = v;
    }
    if let Some(v) = payload.debt {
        args.debt = v;
    }
    if let Some(v) = payload.debt_target {
        args.debt_target = v;
    }
    if let Some(v) = payload.base_year {
        args.base_year = v;
    }
    if let Some(v) = payload.projection_years {
        args.projection_years = v;
    }
    if let Some(v) = payload.target_years {
        args.target_years = v;
    }
    if let Some(v) = payload.effort {
        args.effort = v;
    }
    if let Some(v) = payload.max_iterations {
        args.max_iterations = v;
    }
    if let Some(v) = payload.terminal_balance {
        args.terminal_balance = v.into();
    }

    let params = build_params(&args).map_err(|msg| {
        // JSON callers never see the flag prefix.
        msg.trim_start_matches("--").to_string()
    })?;
    Ok(ApiRequest {
        policy: policy.into(),
        params,
    })
}
