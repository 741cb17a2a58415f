use serde::Serialize;

use super::error::{InvalidInput, require, require_finite};

/// Investor share of the property under the government co-ownership scheme.
pub const SCHEME_OWNERSHIP_FRACTION: f64 = 0.75;

/// Longest loan term accepted by validation.
pub const MAX_TERM_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanParameters {
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    pub property_price: f64,
    /// Annual property appreciation in percent, may be negative.
    pub capital_gains_rate: f64,
    pub term_years: u32,
    pub deposit: f64,
    pub government_scheme: bool,
    pub include_stamp_duty: bool,
    /// Monthly payment the borrower chooses to make. Never lowers the required payment.
    pub payment_override: Option<f64>,
}

impl LoanParameters {
    pub fn ownership_fraction(&self) -> f64 {
        if self.government_scheme {
            SCHEME_OWNERSHIP_FRACTION
        } else {
            1.0
        }
    }

    pub fn with_capital_gains_rate(self, capital_gains_rate: f64) -> Self {
        Self {
            capital_gains_rate,
            ..self
        }
    }

    pub fn with_property_price(self, property_price: f64) -> Self {
        Self {
            property_price,
            ..self
        }
    }

    /// Checks every field against its domain. A deposit at or above the price is accepted
    /// and simulates as a schedule with no recorded months.
    pub fn validated(self) -> Result<Self, InvalidInput> {
        let interest = require_finite("interest rate", self.interest_rate)?;
        require("interest rate", interest >= 0.0, ">= 0")?;

        let price = require_finite("property price", self.property_price)?;
        require("property price", price > 0.0, "> 0")?;

        let gains = require_finite("capital gains rate", self.capital_gains_rate)?;
        require("capital gains rate", gains > -100.0, "> -100")?;

        require("loan term", self.term_years > 0, "> 0 years")?;
        require(
            "loan term",
            self.term_years <= MAX_TERM_YEARS,
            "<= 100 years",
        )?;

        let deposit = require_finite("deposit", self.deposit)?;
        require("deposit", deposit >= 0.0, ">= 0")?;

        if let Some(payment) = self.payment_override {
            let payment = require_finite("actual payment", payment)?;
            require("actual payment", payment > 0.0, "> 0")?;
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPoint {
    pub month: u32,
    pub balance: f64,
    pub property_value: f64,
    pub equity: f64,
    pub interest_paid_to_date: f64,
}

/// Why the month-by-month schedule stopped recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ScheduleEnd {
    /// Every month of the term was recorded.
    Completed,
    /// Balance was already at or below zero at the start of `month`.
    PaidOff { month: u32 },
    /// The payment did not cover the interest due in `month`.
    PaymentBelowInterest { month: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    pub required_monthly_payment: f64,
    pub actual_monthly_payment: f64,
    pub total_interest_paid: f64,
    pub schedule: Vec<MonthPoint>,
    pub termination: ScheduleEnd,
    pub investor_capital_gains: f64,
    /// Present only under the government scheme.
    pub government_capital_gains: Option<f64>,
    pub net_gain_loss: f64,
    pub final_property_value: f64,
    pub stamp_duty: f64,
    pub principal: f64,
    pub ownership_fraction: f64,
}

impl AmortizationResult {
    pub fn months_recorded(&self) -> usize {
        self.schedule.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPoint {
    pub property_price: f64,
    /// `None` when the deposit already covers the price.
    pub break_even_rate: Option<f64>,
}

impl SweepPoint {
    pub fn no_loan_needed(&self) -> bool {
        self.break_even_rate.is_none()
    }

    pub fn rate_or_zero(&self) -> f64 {
        self.break_even_rate.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenSearch {
    pub lower: f64,
    pub upper: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for BreakEvenSearch {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 20.0,
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakEvenSolution {
    pub rate: f64,
    pub iterations: u32,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> LoanParameters {
        LoanParameters {
            interest_rate: 6.0,
            property_price: 500_000.0,
            capital_gains_rate: 5.0,
            term_years: 30,
            deposit: 100_000.0,
            government_scheme: false,
            include_stamp_duty: false,
            payment_override: None,
        }
    }

    #[test]
    fn ownership_fraction_follows_scheme_flag() {
        let mut params = base_params();
        assert_eq!(params.ownership_fraction(), 1.0);
        params.government_scheme = true;
        assert_eq!(params.ownership_fraction(), 0.75);
    }

    #[test]
    fn validated_accepts_deposit_equal_to_price() {
        let mut params = base_params();
        params.deposit = params.property_price;
        assert!(params.validated().is_ok());
    }

    #[test]
    fn validated_rejects_zero_term() {
        let mut params = base_params();
        params.term_years = 0;
        let err = params.validated().expect_err("term 0 must be rejected");
        assert_eq!(err.field(), "loan term");
    }

    #[test]
    fn validated_rejects_term_beyond_a_century() {
        let mut params = base_params();
        params.term_years = MAX_TERM_YEARS;
        assert!(params.validated().is_ok());

        params.term_years = 400_000_000;
        let err = params.validated().expect_err("oversized term must be rejected");
        assert_eq!(err.field(), "loan term");
        assert!(err.to_string().contains("<= 100 years"));
    }

    #[test]
    fn validated_rejects_non_finite_rate() {
        let mut params = base_params();
        params.interest_rate = f64::NAN;
        let err = params.validated().expect_err("NaN must be rejected");
        assert_eq!(
            err,
            InvalidInput::NotFinite {
                field: "interest rate"
            }
        );
    }

    #[test]
    fn validated_rejects_total_loss_growth_rate() {
        let mut params = base_params();
        params.capital_gains_rate = -100.0;
        let err = params.validated().expect_err("-100% must be rejected");
        assert!(err.to_string().contains("capital gains rate"));
    }

    #[test]
    fn validated_rejects_non_positive_override() {
        let mut params = base_params();
        params.payment_override = Some(0.0);
        let err = params.validated().expect_err("zero override must be rejected");
        assert_eq!(err.field(), "actual payment");
    }

    #[test]
    fn sweep_point_sentinel_plots_as_zero() {
        let point = SweepPoint {
            property_price: 50_000.0,
            break_even_rate: None,
        };
        assert!(point.no_loan_needed());
        assert_eq!(point.rate_or_zero(), 0.0);
    }

    #[test]
    fn schedule_end_serializes_with_reason_tag() {
        let json = serde_json::to_string(&ScheduleEnd::PaidOff { month: 12 }).expect("serialize");
        assert_eq!(json, r#"{"reason":"paid-off","month":12}"#);
    }
}
