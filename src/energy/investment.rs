//! Capacity investment decisions and their annualized cost.

use serde::Serialize;

use crate::error::DomainError;

/// Equivalent annual cost of a one-time capital expenditure.
///
/// Uses the capital recovery factor `r / (1 - (1 + r)^-n)`; a zero discount
/// rate degenerates to straight-line depreciation `capex / n`.
///
/// # Errors
///
/// Returns a `DomainError` if `lifetime_years <= 0` (or is not finite) or
/// `discount_rate < -1`.
///
/// # Examples
///
/// ```
/// use district_planner::energy::investment::annuity;
///
/// let flat = annuity(1000.0, 20.0, 0.0).unwrap();
/// assert_eq!(flat, 50.0);
/// ```
pub fn annuity(capex: f64, lifetime_years: f64, discount_rate: f64) -> Result<f64, DomainError> {
    if !(lifetime_years.is_finite() && lifetime_years > 0.0) {
        return Err(DomainError::NonPositiveLifetime(lifetime_years));
    }
    if discount_rate.is_nan() || discount_rate < -1.0 {
        return Err(DomainError::DiscountRateBelowMinusOne(discount_rate));
    }
    if discount_rate == 0.0 {
        return Ok(capex / lifetime_years);
    }
    let discount = (1.0 + discount_rate).powf(-lifetime_years);
    Ok(capex * discount_rate / (1.0 - discount))
}

/// Installable capacity attached to a flow or to a storage's energy content.
///
/// The decided size is bounded by `[minimum, maximum]`; `maximum = None`
/// leaves it unbounded above. `ep_costs` is the per-unit annual cost that
/// multiplies the size in the objective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Investment {
    /// Equivalent periodical cost per unit of installed capacity.
    pub ep_costs: f64,
    pub minimum: f64,
    pub maximum: Option<f64>,
}

impl Investment {
    /// Unbounded investment with zero minimum.
    pub fn new(ep_costs: f64) -> Self {
        Self {
            ep_costs,
            minimum: 0.0,
            maximum: None,
        }
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Upper bound as a float, `f64::INFINITY` when unbounded.
    pub fn upper(&self) -> f64 {
        self.maximum.unwrap_or(f64::INFINITY)
    }

    /// True when the bounds admit at least one size.
    pub fn bounds_consistent(&self) -> bool {
        self.minimum >= 0.0 && self.minimum <= self.upper()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_straight_line() {
        assert_eq!(annuity(1200.0, 12.0, 0.0), Ok(100.0));
    }

    #[test]
    fn known_capital_recovery_factor() {
        // 1000 over 10 years at 5 %: CRF = 0.129504575...
        let a = annuity(1000.0, 10.0, 0.05).unwrap_or(f64::NAN);
        assert!((a - 129.504_574_6).abs() < 1e-6, "got {a}");
    }

    #[test]
    fn strictly_decreasing_in_lifetime() {
        let mut previous = f64::INFINITY;
        for n in 1..=40 {
            let a = annuity(500.0, f64::from(n), 0.07).unwrap_or(f64::NAN);
            assert!(a < previous, "annuity must fall with lifetime at n={n}");
            previous = a;
        }
    }

    #[test]
    fn non_positive_lifetime_is_domain_error() {
        assert_eq!(
            annuity(100.0, 0.0, 0.05),
            Err(DomainError::NonPositiveLifetime(0.0))
        );
        assert!(annuity(100.0, -3.0, 0.0).is_err());
        assert!(annuity(100.0, f64::NAN, 0.05).is_err());
    }

    #[test]
    fn discount_rate_below_minus_one_is_domain_error() {
        assert_eq!(
            annuity(100.0, 10.0, -1.5),
            Err(DomainError::DiscountRateBelowMinusOne(-1.5))
        );
    }

    #[test]
    fn investment_bounds() {
        let inv = Investment::new(10.0).with_minimum(5.0).with_maximum(3.0);
        assert!(!inv.bounds_consistent());
        let open = Investment::new(10.0).with_minimum(5.0);
        assert!(open.bounds_consistent());
        assert_eq!(open.upper(), f64::INFINITY);
    }
}
