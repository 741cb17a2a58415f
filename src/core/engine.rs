use super::types::{AmortizationResult, LoanParameters, MonthPoint, ScheduleEnd};

const MONTHS_PER_YEAR: u32 = 12;
const MAX_PREALLOCATED_MONTHS: u32 = 1_200;

/// Progressive stamp duty on the purchase price, in four brackets.
pub fn stamp_duty(price: f64) -> f64 {
    if price <= 25_000.0 {
        price * 0.014
    } else if price <= 130_000.0 {
        350.0 + (price - 25_000.0) * 0.024
    } else if price <= 960_000.0 {
        2_870.0 + (price - 130_000.0) * 0.06
    } else {
        price * 0.055
    }
}

/// Level payment that retires `principal` over `months` at `monthly_rate`.
pub fn annuity_payment(principal: f64, monthly_rate: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let n = months as f64;
    if monthly_rate == 0.0 {
        return principal / n;
    }
    let growth = (1.0 + monthly_rate).powf(n);
    if !growth.is_finite() {
        // Interest-only in the limit of an unbounded term.
        return principal * monthly_rate;
    }
    principal * monthly_rate * growth / (growth - 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleRow {
    pub month: u32,
    pub balance: f64,
    pub interest_paid_to_date: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub rows: Vec<ScheduleRow>,
    pub total_interest_paid: f64,
    pub end: ScheduleEnd,
}

fn termination_for(month: u32, balance: f64, principal_component: f64) -> Option<ScheduleEnd> {
    if balance <= 0.0 {
        Some(ScheduleEnd::PaidOff { month })
    } else if principal_component <= 0.0 {
        Some(ScheduleEnd::PaymentBelowInterest { month })
    } else {
        None
    }
}

/// Runs the loan month by month. A month that would start paid off, or whose payment does
/// not reduce the balance, ends the schedule without being recorded.
pub fn amortize(principal: f64, monthly_rate: f64, payment: f64, months: u32) -> Schedule {
    let mut rows = Vec::with_capacity(months.min(MAX_PREALLOCATED_MONTHS) as usize);
    let mut balance = principal;
    let mut total_interest_paid = 0.0;

    for month in 1..=months {
        let monthly_interest = balance * monthly_rate;
        let principal_component = payment - monthly_interest;
        if let Some(end) = termination_for(month, balance, principal_component) {
            return Schedule {
                rows,
                total_interest_paid,
                end,
            };
        }

        balance -= principal_component;
        total_interest_paid += monthly_interest;
        rows.push(ScheduleRow {
            month,
            balance,
            interest_paid_to_date: total_interest_paid,
        });
    }

    Schedule {
        rows,
        total_interest_paid,
        end: ScheduleEnd::Completed,
    }
}

fn property_value_at(price: f64, capital_gains_rate: f64, month: u32) -> f64 {
    price * (1.0 + capital_gains_rate / 100.0).powf(month as f64 / MONTHS_PER_YEAR as f64)
}

pub fn simulate(params: &LoanParameters) -> AmortizationResult {
    let price = params.property_price;
    let ownership = params.ownership_fraction();

    let duty = if params.include_stamp_duty {
        stamp_duty(price)
    } else {
        0.0
    };
    let principal = price * ownership + duty - params.deposit;

    let monthly_rate = params.interest_rate / 1200.0;
    let months = params.term_years.saturating_mul(MONTHS_PER_YEAR);
    let required_monthly_payment = annuity_payment(principal.max(0.0), monthly_rate, months);
    let actual_monthly_payment = match params.payment_override {
        Some(payment) => payment.max(required_monthly_payment),
        None => required_monthly_payment,
    };

    let amortized = amortize(principal, monthly_rate, actual_monthly_payment, months);

    let schedule: Vec<MonthPoint> = amortized
        .rows
        .iter()
        .map(|row| {
            let property_value = property_value_at(price, params.capital_gains_rate, row.month);
            MonthPoint {
                month: row.month,
                balance: row.balance,
                property_value,
                equity: ownership * property_value - row.balance,
                interest_paid_to_date: row.interest_paid_to_date,
            }
        })
        .collect();

    let final_property_value = schedule.last().map_or(price, |point| point.property_value);
    let total_capital_gains = final_property_value - price;
    let investor_capital_gains = total_capital_gains * ownership;
    let government_capital_gains = params
        .government_scheme
        .then(|| total_capital_gains * (1.0 - ownership));

    AmortizationResult {
        required_monthly_payment,
        actual_monthly_payment,
        total_interest_paid: amortized.total_interest_paid,
        schedule,
        termination: amortized.end,
        investor_capital_gains,
        government_capital_gains,
        net_gain_loss: investor_capital_gains - amortized.total_interest_paid,
        final_property_value,
        stamp_duty: duty,
        principal,
        ownership_fraction: ownership,
    }
}
