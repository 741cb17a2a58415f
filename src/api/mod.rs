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
use tabled::{Table, builder::Builder};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::{
    AmortizationResult, InvalidInput, LoanParameters, ScheduleEnd, SweepPoint, price_grid,
    round_rate, simulate, solve_break_even, sweep, validate_fixed,
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PRICE_STEP: u64 = 50_000;
const MAX_API_SWEEP_POINTS: usize = 500;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "homeloan",
    about = "Mortgage amortization and break-even capital gains estimator"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Amortize one loan and report gains, interest and the break-even growth rate
    Simulate(SimulateArgs),
    /// Break-even growth rate across a range of property prices with a fixed deposit
    Sweep(SweepArgs),
    /// Serve the JSON API
    Serve {
        #[arg(default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
struct SimulateArgs {
    #[arg(long, help = "Annual interest rate in percent, e.g. 6")]
    interest_rate: f64,
    #[arg(long, help = "Property price")]
    price: f64,
    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Expected annual capital gains rate in percent"
    )]
    capital_gains_rate: f64,
    #[arg(long, help = "Loan term in years")]
    term: u32,
    #[arg(long)]
    deposit: f64,
    #[arg(long, help = "Buy under the government co-ownership scheme (75% share)")]
    government_scheme: bool,
    #[arg(long, help = "Finance stamp duty as part of the loan")]
    include_stamp_duty: bool,
    #[arg(
        long,
        help = "Monthly payment actually made; ignored when below the required payment"
    )]
    actual_payment: Option<f64>,
    #[arg(long, help = "Also print the schedule at each loan anniversary")]
    schedule: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Args, Debug, Clone)]
struct SweepArgs {
    #[arg(help = "Annual interest rate in percent")]
    interest_rate: f64,
    #[arg(help = "Loan term in years")]
    term: u32,
    #[arg(help = "Deposit amount")]
    deposit: f64,
    #[arg(help = "Minimum property price")]
    price_min: u64,
    #[arg(help = "Maximum property price")]
    price_max: u64,
    #[arg(long, default_value_t = DEFAULT_PRICE_STEP, help = "Step between property prices")]
    step: u64,
    #[arg(long)]
    government_scheme: bool,
    #[arg(long)]
    include_stamp_duty: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

/// Form fields from the interactive front-end. Missing fields keep their defaults. The
/// actual payment only applies once the user has edited it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    interest_rate: Option<f64>,
    property_price: Option<f64>,
    capital_gains_rate: Option<f64>,
    term: Option<u32>,
    deposit: Option<f64>,
    government_scheme: Option<bool>,
    include_stamp_duty: Option<bool>,
    actual_payment: Option<f64>,
    actual_payment_edited: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SweepPayload {
    interest_rate: Option<f64>,
    term: Option<u32>,
    deposit: Option<f64>,
    price_min: Option<u64>,
    price_max: Option<u64>,
    step: Option<u64>,
    government_scheme: Option<bool>,
    include_stamp_duty: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    break_even_rate: Option<f64>,
    #[serde(flatten)]
    result: AmortizationResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepResponse {
    interest_rate: f64,
    term: u32,
    deposit: f64,
    points: Vec<SweepPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Simulate(args) => run_simulate(&args),
        Command::Sweep(args) => run_sweep(&args),
        Command::Serve { port } => Ok(run_http_server(port).await?),
    }
}

fn build_params(args: &SimulateArgs) -> Result<LoanParameters, InvalidInput> {
    LoanParameters {
        interest_rate: args.interest_rate,
        property_price: args.price,
        capital_gains_rate: args.capital_gains_rate,
        term_years: args.term,
        deposit: args.deposit,
        government_scheme: args.government_scheme,
        include_stamp_duty: args.include_stamp_duty,
        payment_override: args.actual_payment,
    }
    .validated()
}

fn build_sweep(args: &SweepArgs) -> Result<(LoanParameters, Vec<f64>), InvalidInput> {
    let fixed = validate_fixed(LoanParameters {
        interest_rate: args.interest_rate,
        property_price: args.price_min as f64,
        capital_gains_rate: 0.0,
        term_years: args.term,
        deposit: args.deposit,
        government_scheme: args.government_scheme,
        include_stamp_duty: args.include_stamp_duty,
        payment_override: None,
    })?;
    let grid = price_grid(args.price_min, args.price_max, args.step)?;
    Ok((fixed, grid))
}

fn simulate_response(params: &LoanParameters) -> SimulateResponse {
    let result = simulate(params);
    // Nothing borrowed means no interest to recover.
    let break_even_rate = (result.principal > 0.0).then(|| round_rate(solve_break_even(params)));
    SimulateResponse {
        break_even_rate,
        result,
    }
}

fn sweep_response(fixed: &LoanParameters, grid: &[f64]) -> SweepResponse {
    SweepResponse {
        interest_rate: fixed.interest_rate,
        term: fixed.term_years,
        deposit: fixed.deposit,
        points: sweep(fixed, grid),
    }
}

fn run_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let params = build_params(args)?;
    let response = simulate_response(&params);
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            println!("{}", summary_table(&params, &response));
            if args.schedule {
                println!("{}", schedule_table(&response.result));
            }
        }
    }
    Ok(())
}

fn run_sweep(args: &SweepArgs) -> Result<(), AppError> {
    let (fixed, grid) = build_sweep(args)?;
    info!(points = grid.len(), "calculating break-even rates");
    let response = sweep_response(&fixed, &grid);
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => println!("{}", sweep_table(&response.points)),
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/sweep", get(sweep_get_handler).post(sweep_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "homeloan HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn sweep_get_handler(Query(payload): Query<SweepPayload>) -> Response {
    sweep_handler_impl(payload)
}

async fn sweep_post_handler(Json(payload): Json<SweepPayload>) -> Response {
    sweep_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    match params_from_payload(payload) {
        Ok(params) => json_response(StatusCode::OK, simulate_response(&params)),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn sweep_handler_impl(payload: SweepPayload) -> Response {
    match sweep_from_payload(payload) {
        Ok((fixed, grid)) => json_response(StatusCode::OK, sweep_response(&fixed, &grid)),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
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

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        interest_rate: 6.0,
        price: 500_000.0,
        capital_gains_rate: 5.0,
        term: 30,
        deposit: 100_000.0,
        government_scheme: false,
        include_stamp_duty: false,
        actual_payment: None,
        schedule: false,
        output: OutputFormat::Json,
    }
}

fn default_sweep_args() -> SweepArgs {
    SweepArgs {
        interest_rate: 6.0,
        term: 30,
        deposit: 100_000.0,
        price_min: 200_000,
        price_max: 1_000_000,
        step: DEFAULT_PRICE_STEP,
        government_scheme: false,
        include_stamp_duty: false,
        output: OutputFormat::Json,
    }
}

fn params_from_payload(payload: SimulatePayload) -> Result<LoanParameters, InvalidInput> {
    let mut args = default_simulate_args();

    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.property_price {
        args.price = v;
    }
    if let Some(v) = payload.capital_gains_rate {
        args.capital_gains_rate = v;
    }
    if let Some(v) = payload.term {
        args.term = v;
    }
    if let Some(v) = payload.deposit {
        args.deposit = v;
    }
    if let Some(v) = payload.government_scheme {
        args.government_scheme = v;
    }
    if let Some(v) = payload.include_stamp_duty {
        args.include_stamp_duty = v;
    }
    if payload.actual_payment_edited.unwrap_or(false) {
        args.actual_payment = payload.actual_payment;
    }

    build_params(&args)
}

fn sweep_from_payload(payload: SweepPayload) -> Result<(LoanParameters, Vec<f64>), InvalidInput> {
    let mut args = default_sweep_args();

    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.term {
        args.term = v;
    }
    if let Some(v) = payload.deposit {
        args.deposit = v;
    }
    if let Some(v) = payload.price_min {
        args.price_min = v;
    }
    if let Some(v) = payload.price_max {
        args.price_max = v;
    }
    if let Some(v) = payload.step {
        args.step = v;
    }
    if let Some(v) = payload.government_scheme {
        args.government_scheme = v;
    }
    if let Some(v) = payload.include_stamp_duty {
        args.include_stamp_duty = v;
    }

    if args.step > 0
        && args.price_max >= args.price_min
        && (args.price_max - args.price_min) / args.step >= MAX_API_SWEEP_POINTS as u64
    {
        return Err(InvalidInput::OutOfRange {
            field: "price range",
            requirement: "at most 500 grid points",
        });
    }
    build_sweep(&args)
}

fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn describe_termination(end: ScheduleEnd) -> String {
    match end {
        ScheduleEnd::Completed => "full term".to_string(),
        ScheduleEnd::PaidOff { month } => format!("paid off before month {month}"),
        ScheduleEnd::PaymentBelowInterest { month } => {
            format!("payment below interest at month {month}")
        }
    }
}

fn summary_table(params: &LoanParameters, response: &SimulateResponse) -> Table {
    let result = &response.result;
    let mut rows: Vec<(&str, String)> = vec![
        ("Property Price", format_currency(params.property_price)),
        ("Deposit", format_currency(params.deposit)),
    ];
    if params.include_stamp_duty {
        rows.push(("Stamp Duty", format_currency(result.stamp_duty)));
    }
    rows.push(("Borrowed", format_currency(result.principal)));
    rows.push(("Interest Rate", format!("{:.2}%", params.interest_rate)));
    rows.push(("Term", format!("{} years", params.term_years)));
    rows.push((
        "Monthly Payment",
        format_currency(result.required_monthly_payment),
    ));
    if result.actual_monthly_payment > result.required_monthly_payment {
        rows.push((
            "Actual Payment",
            format_currency(result.actual_monthly_payment),
        ));
    }
    rows.push((
        "Total Interest Paid",
        format_currency(result.total_interest_paid),
    ));
    rows.push((
        "Final Property Value",
        format_currency(result.final_property_value),
    ));
    rows.push((
        "Capital Gains",
        format_currency(result.investor_capital_gains),
    ));
    if let Some(government) = result.government_capital_gains {
        rows.push(("Government Share of Gains", format_currency(government)));
    }
    rows.push(("Net Gain/Loss", format_currency(result.net_gain_loss)));
    rows.push((
        "Break-even Capital Gain Rate",
        match response.break_even_rate {
            Some(rate) => format!("~{rate:.2}%"),
            None => "no loan needed".to_string(),
        },
    ));
    rows.push(("Schedule", describe_termination(result.termination)));

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (field, value) in rows {
        builder.push_record([field.to_string(), value]);
    }
    Table::from(builder)
}

fn schedule_table(result: &AmortizationResult) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Month", "Balance", "Property Value", "Equity"]);
    let last_month = result.schedule.last().map(|point| point.month);
    for point in result
        .schedule
        .iter()
        .filter(|point| point.month % 12 == 0 || Some(point.month) == last_month)
    {
        builder.push_record([
            point.month.to_string(),
            format_currency(point.balance),
            format_currency(point.property_value),
            format_currency(point.equity),
        ]);
    }
    Table::from(builder)
}

fn sweep_table(points: &[SweepPoint]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Property Price", "Break-even Gains"]);
    for point in points {
        let rate = match point.break_even_rate {
            Some(rate) => format!("{rate:.2}%"),
            None => "no loan needed".to_string(),
        };
        builder.push_record([format_currency(point.property_price), rate]);
    }
    Table::from(builder)
}
