//! ### Finance
//! Internal rate of return for generator investments.

/// Longest generator life, in years, that cash flows are built for.
pub const MAX_LIFE_YEARS: f64 = 1000.;

/// Starting rate for the root search.
const IRR_GUESS: f64 = 0.;

/// Cash flows of a build decision: the capital outlay, then one equal
/// operating profit per whole year of generator life.
pub fn annuity_cash_flows(capex: f64, profit: f64, life: f64) -> Vec<f64> {
    // `as` truncates toward zero and saturates negatives and NaN at zero.
    let years = life.min(MAX_LIFE_YEARS) as usize;
    let mut flows = Vec::with_capacity(years + 1);
    flows.push(-capex);
    flows.extend(std::iter::repeat(profit).take(years));
    flows
}

/// Internal rate of return of `cash_flows`, where index `t` is paid at the
/// end of year `t`. Returns NaN when no rate above -100% sets the net
/// present value to zero or the search does not converge.
pub fn irr(cash_flows: &[f64]) -> f64 {
    let has_inflow = cash_flows.iter().any(|&cf| cf > 0.);
    let has_outflow = cash_flows.iter().any(|&cf| cf < 0.);
    if !has_inflow || !has_outflow || cash_flows.iter().any(|cf| !cf.is_finite()) {
        return f64::NAN;
    }

    let rate = financial::irr(cash_flows, Some(IRR_GUESS)).unwrap_or(f64::NAN);
    if rate.is_finite() && rate > -1. {
        rate
    } else {
        f64::NAN
    }
}

/// IRR of a generator build as a percentage rounded to two decimals.
pub fn irr_percent(capex: f64, profit: f64, life: f64) -> f64 {
    let rate = irr(&annuity_cash_flows(capex, profit, life));
    (rate * 100. * 100.).round() / 100.
}
