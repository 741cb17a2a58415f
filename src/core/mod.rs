mod engine;
mod error;
mod solver;
mod sweep;
mod types;

pub use engine::{Schedule, ScheduleRow, amortize, annuity_payment, simulate, stamp_duty};
pub use error::InvalidInput;
pub use solver::{bisect_break_even, round_rate, solve_break_even};
pub use sweep::{price_grid, sweep, validate_fixed};
pub use types::{
    AmortizationResult, BreakEvenSearch, BreakEvenSolution, LoanParameters, MonthPoint,
    MAX_TERM_YEARS, SCHEME_OWNERSHIP_FRACTION, ScheduleEnd, SweepPoint,
};
