use tracing::info;

use super::error::{InvalidInput, require};
use super::solver::solve_break_even;
use super::types::{LoanParameters, SweepPoint};

/// Ascending prices from `min` to `max` inclusive in steps of `step`.
pub fn price_grid(min: u64, max: u64, step: u64) -> Result<Vec<f64>, InvalidInput> {
    require("price step", step > 0, "> 0")?;
    require("minimum price", min > 0, "> 0")?;
    require("maximum price", max >= min, ">= minimum price")?;

    let step = usize::try_from(step).map_err(|_| InvalidInput::OutOfRange {
        field: "price step",
        requirement: "addressable on this platform",
    })?;
    Ok((min..=max).step_by(step).map(|price| price as f64).collect())
}

/// Break-even rate for every price in `grid`, in grid order. Prices the deposit already
/// covers are reported without running the solver.
pub fn sweep(fixed: &LoanParameters, grid: &[f64]) -> Vec<SweepPoint> {
    grid.iter()
        .map(|&price| {
            if fixed.deposit >= price {
                return SweepPoint {
                    property_price: price,
                    break_even_rate: None,
                };
            }

            let rate = solve_break_even(&fixed.with_property_price(price));
            info!("{}", progress_line(price, rate));
            SweepPoint {
                property_price: price,
                break_even_rate: Some(rate),
            }
        })
        .collect()
}

fn progress_line(price: f64, rate: f64) -> String {
    format!("${price:.0}: Break-even gains = {rate:.2}%")
}

/// Validates the non-price parts of a sweep request. Price and capital-gains rate are
/// substituted per grid point.
pub fn validate_fixed(fixed: LoanParameters) -> Result<LoanParameters, InvalidInput> {
    fixed.with_property_price(1.0).validated()?;
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::simulate;

    fn fixed_params() -> LoanParameters {
        LoanParameters {
            interest_rate: 6.0,
            property_price: 0.0,
            capital_gains_rate: 0.0,
            term_years: 30,
            deposit: 100_000.0,
            government_scheme: false,
            include_stamp_duty: false,
            payment_override: None,
        }
    }

    #[test]
    fn price_grid_is_inclusive_when_step_divides_range() {
        let grid = price_grid(200_000, 400_000, 50_000).expect("valid grid");
        assert_eq!(grid, vec![200_000.0, 250_000.0, 300_000.0, 350_000.0, 400_000.0]);
    }

    #[test]
    fn price_grid_stops_below_max_when_step_overshoots() {
        let grid = price_grid(100_000, 220_000, 50_000).expect("valid grid");
        assert_eq!(grid, vec![100_000.0, 150_000.0, 200_000.0]);
    }

    #[test]
    fn price_grid_rejects_zero_step_and_inverted_range() {
        let err = price_grid(1, 10, 0).expect_err("zero step");
        assert_eq!(err.field(), "price step");
        let err = price_grid(10, 1, 1).expect_err("inverted range");
        assert_eq!(err.field(), "maximum price");
    }

    #[test]
    fn scenario_c_sentinel_for_prices_covered_by_deposit() {
        let grid = [50_000.0, 100_000.0, 300_000.0];
        let points = sweep(&fixed_params(), &grid);

        assert_eq!(points.len(), 3);
        assert!(points[0].no_loan_needed());
        assert!(points[1].no_loan_needed());
        assert_eq!(points[1].rate_or_zero(), 0.0);
        assert!(!points[2].no_loan_needed());
        assert!(points[2].rate_or_zero() > 0.0);
    }

    #[test]
    fn sweep_preserves_grid_order_and_matches_single_solves() {
        let grid = [600_000.0, 200_000.0, 400_000.0];
        let fixed = fixed_params();
        let points = sweep(&fixed, &grid);

        for (point, &price) in points.iter().zip(grid.iter()) {
            assert_eq!(point.property_price, price);
            let expected = solve_break_even(&fixed.with_property_price(price));
            assert_eq!(point.break_even_rate, Some(expected));
        }
    }

    #[test]
    fn larger_loans_need_higher_break_even_growth() {
        let grid = price_grid(200_000, 800_000, 200_000).expect("valid grid");
        let points = sweep(&fixed_params(), &grid);
        for pair in points.windows(2) {
            assert!(pair[1].rate_or_zero() > pair[0].rate_or_zero());
        }

        let last = points.last().expect("points expected");
        let check = simulate(
            &fixed_params()
                .with_property_price(last.property_price)
                .with_capital_gains_rate(last.rate_or_zero()),
        );
        assert!((check.investor_capital_gains - check.total_interest_paid).abs() < 1e-4);
    }

    #[test]
    fn progress_line_reports_price_and_two_decimal_rate() {
        assert_eq!(
            progress_line(350_000.0, 4.567_89),
            "$350000: Break-even gains = 4.57%"
        );
    }

    #[test]
    fn validate_fixed_ignores_placeholder_price() {
        assert!(validate_fixed(fixed_params()).is_ok());
        let mut bad = fixed_params();
        bad.term_years = 0;
        assert!(validate_fixed(bad).is_err());
        bad.term_years = 400_000_000;
        let err = validate_fixed(bad).expect_err("oversized term");
        assert_eq!(err.field(), "loan term");
    }
}
