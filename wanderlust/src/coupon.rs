//! Coupon catalog and discount evaluation.
//!
//! Evaluation is synchronous and stateless. The delay users see while a
//! coupon is "checked" is a timer scheduled by the reducer, not part of
//! this module.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::LazyLock;
use thiserror::Error;

use crate::types::{Coupon, CouponKind};

/// Absolute ceiling on any discount, whatever the currency or base price
pub const DISCOUNT_CAP: f64 = 100.0;

/// Why a coupon cannot be applied
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponError {
    /// The coupon's expiry is in the past
    #[error("Coupon expired!")]
    Expired,

    /// No coupon has the given code
    #[error("Coupon not found!")]
    NotFound,
}

static CATALOG: LazyLock<[Coupon; 3]> = LazyLock::new(|| {
    [
        coupon("TRAVEL10", CouponKind::Percent, 50.0, midnight_utc(2025, 12, 31)),
        coupon("SAVE50", CouponKind::Fixed, 50.0, midnight_utc(2024, 12, 31)),
        coupon("FIRSTBOOK20", CouponKind::Percent, 20.0, midnight_utc(2025, 6, 30)),
    ]
});

fn coupon(code: &str, kind: CouponKind, value: f64, expiry: DateTime<Utc>) -> Coupon {
    Coupon {
        code: code.to_string(),
        kind,
        value,
        expiry,
    }
}

fn midnight_utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// The coupons offered at checkout
#[must_use]
pub fn catalog() -> &'static [Coupon] {
    CATALOG.as_slice()
}

/// Finds a coupon by code, ignoring case
///
/// # Errors
///
/// Returns [`CouponError::NotFound`] if no catalog entry matches.
pub fn lookup(code: &str) -> Result<&'static Coupon, CouponError> {
    let code = code.to_uppercase();
    catalog()
        .iter()
        .find(|coupon| coupon.code == code)
        .ok_or(CouponError::NotFound)
}

/// Computes the discount `coupon` grants on `base_price` at `now`
///
/// The discount is floored at 0 and capped at [`DISCOUNT_CAP`]. It may
/// exceed `base_price`; [`final_price`] clamps the result instead.
///
/// # Errors
///
/// Returns [`CouponError::Expired`] if `coupon.expiry < now`.
pub fn evaluate_coupon(
    coupon: &Coupon,
    base_price: f64,
    now: DateTime<Utc>,
) -> Result<f64, CouponError> {
    if coupon.expiry < now {
        return Err(CouponError::Expired);
    }

    let raw = match coupon.kind {
        CouponKind::Percent => base_price * coupon.value / 100.0,
        CouponKind::Fixed => coupon.value,
    };

    Ok(raw.max(0.0).min(DISCOUNT_CAP))
}

/// Price after discount, never negative
#[must_use]
pub fn final_price(base_price: f64, discount: f64) -> f64 {
    (base_price - discount).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("travel10").unwrap().code, "TRAVEL10");
        assert_eq!(lookup("FirstBook20").unwrap().code, "FIRSTBOOK20");
        assert_eq!(lookup("WELCOME"), Err(CouponError::NotFound));
        assert_eq!(lookup(""), Err(CouponError::NotFound));
    }

    #[test]
    fn catalog_expiries_are_utc_midnight() {
        let save50 = lookup("SAVE50").unwrap();
        assert_eq!(save50.expiry.to_rfc3339(), "2024-12-31T00:00:00+00:00");
        assert_eq!(catalog().len(), 3);
    }

    #[test]
    fn percent_discount_is_capped() {
        let travel = lookup("TRAVEL10").unwrap();
        let now = midnight_utc(2025, 1, 1);

        let discount = evaluate_coupon(travel, 200.0, now).unwrap();
        assert!(approx(discount, 100.0));
        assert!(approx(final_price(200.0, discount), 100.0));

        let discount = evaluate_coupon(travel, 10_000.0, now).unwrap();
        assert!(approx(discount, DISCOUNT_CAP));

        let discount = evaluate_coupon(travel, 80.0, now).unwrap();
        assert!(approx(discount, 40.0));
    }

    #[test]
    fn fixed_discount_larger_than_price_gives_zero_total() {
        let save50 = coupon("SAVE50", CouponKind::Fixed, 50.0, midnight_utc(2030, 1, 1));
        let discount = evaluate_coupon(&save50, 40.0, midnight_utc(2025, 1, 1)).unwrap();
        assert!(approx(discount, 50.0));
        assert!(approx(final_price(40.0, discount), 0.0));
    }

    #[test]
    fn expired_for_both_kinds() {
        let expiry = midnight_utc(2025, 6, 30);
        let after = expiry + Duration::seconds(1);
        for kind in [CouponKind::Percent, CouponKind::Fixed] {
            let c = coupon("X", kind, 10.0, expiry);
            assert_eq!(evaluate_coupon(&c, 100.0, after), Err(CouponError::Expired));
            assert!(evaluate_coupon(&c, 100.0, expiry).is_ok());
        }
        assert_eq!(CouponError::Expired.to_string(), "Coupon expired!");
    }

    #[test]
    fn negative_values_floor_at_zero() {
        let c = coupon("ODD", CouponKind::Fixed, -20.0, midnight_utc(2030, 1, 1));
        let discount = evaluate_coupon(&c, 100.0, midnight_utc(2025, 1, 1)).unwrap();
        assert!(approx(discount, 0.0));
    }
}
