use tracing::{debug, warn};

use super::engine::simulate;
use super::types::{BreakEvenSearch, BreakEvenSolution, LoanParameters};

/// Annual capital-gains rate (percent) at which the investor's capital gains equal the
/// interest paid over the schedule. Best effort: an unconverged search still returns the
/// last candidate.
pub fn solve_break_even(params: &LoanParameters) -> f64 {
    bisect_break_even(params, &BreakEvenSearch::default()).rate
}

/// Rounds a break-even rate to four decimal places for display.
pub fn round_rate(rate: f64) -> f64 {
    (rate * 10_000.0).round() / 10_000.0
}

fn gains_minus_interest(params: &LoanParameters, capital_gains_rate: f64) -> f64 {
    let result = simulate(&params.with_capital_gains_rate(capital_gains_rate));
    result.investor_capital_gains - result.total_interest_paid
}

/// Bisection over the capital-gains rate. Assumes gains minus interest is non-decreasing in
/// the rate across the bracket; a bracket that does not straddle zero is logged but still
/// searched.
pub fn bisect_break_even(params: &LoanParameters, search: &BreakEvenSearch) -> BreakEvenSolution {
    let low_diff = gains_minus_interest(params, search.lower);
    let high_diff = gains_minus_interest(params, search.upper);
    if low_diff > 0.0 || high_diff < 0.0 {
        warn!(
            lower = search.lower,
            upper = search.upper,
            low_diff,
            high_diff,
            "break-even bracket does not straddle zero; result will sit at a bracket edge"
        );
    }

    let mut lo = search.lower;
    let mut hi = search.upper;
    let mut mid = (lo + hi) * 0.5;
    for iteration in 1..=search.max_iterations {
        mid = (lo + hi) * 0.5;
        let diff = gains_minus_interest(params, mid);
        debug!(iteration, lo, hi, candidate = mid, diff, "bisection step");

        if diff.abs() < search.tolerance {
            return BreakEvenSolution {
                rate: mid,
                iterations: iteration,
                converged: true,
            };
        }

        if diff > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    warn!(
        max_iterations = search.max_iterations,
        candidate = mid,
        "break-even search reached max iterations; returning best estimate"
    );
    BreakEvenSolution {
        rate: mid,
        iterations: search.max_iterations,
        converged: false,
    }
}
