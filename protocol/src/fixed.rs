//! # Fixed-Point Conversion
//!
//! The one routine that turns a native-unit amount of any asset into
//! reference-currency units. Everything is integer arithmetic with
//! truncating division; there is no floating point anywhere in the ledger.
//!
//! ```text
//! reference = floor(amount * price * 10^REFERENCE_DECIMALS
//!                   / 10^(asset_decimals + feed_decimals))
//! ```
//!
//! With an 8-decimal feed the `10^8` factors cancel and the formula reduces
//! to `amount * price / 10^asset_decimals`, where `price` is the raw feed
//! answer. Written as `amount * p / 10^(asset_decimals - 8)`, `p` is the
//! price in whole reference units; feeds publish it scaled by `10^8`, hence
//! the extra factor. Keeping the feed's own decimals in the exponent also
//! covers feeds that are not 8-decimal and assets with fewer than 8
//! decimals.
//!
//! Truncation always rounds toward zero, i.e. in the ledger's favor: a
//! deposit is never over-valued against the cap and a withdrawal is never
//! over-valued against the limit by more than one unit of the last digit.

use crate::config::{MAX_DECIMALS, REFERENCE_DECIMALS, REFERENCE_UNIT};
use crate::types::Amount;

/// `10^exp`, or `None` if it does not fit in a `u128`.
pub fn pow10(exp: u32) -> Option<u128> {
    if exp > MAX_DECIMALS as u32 {
        return None;
    }
    10u128.checked_pow(exp)
}

/// Converts `amount` (native units of an asset with `asset_decimals`) to
/// reference units, using `price` scaled by `feed_decimals`.
///
/// Returns `None` on overflow. The numerator is scaled up before the single
/// division so no precision is lost to an intermediate truncation.
pub fn to_reference(
    amount: Amount,
    price: u128,
    asset_decimals: u8,
    feed_decimals: u8,
) -> Option<u128> {
    let value = amount.checked_mul(price)?;
    let scale_in = asset_decimals as u32 + feed_decimals as u32;
    let scale_out = REFERENCE_DECIMALS as u32;

    if scale_in >= scale_out {
        let divisor = pow10(scale_in - scale_out)?;
        Some(value / divisor)
    } else {
        let multiplier = pow10(scale_out - scale_in)?;
        value.checked_mul(multiplier)
    }
}

/// Renders a reference amount as a decimal string, e.g. `1234.50000000`.
pub fn format_reference(value: u128) -> String {
    format!(
        "{}.{:0width$}",
        value / REFERENCE_UNIT,
        value % REFERENCE_UNIT,
        width = REFERENCE_DECIMALS as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NATIVE_UNIT;

    const PRICE_2000: u128 = 2_000 * REFERENCE_UNIT;

    #[test]
    fn one_native_unit_at_2000() {
        let v = to_reference(NATIVE_UNIT, PRICE_2000, 18, 8).unwrap();
        assert_eq!(v, 2_000 * REFERENCE_UNIT);
    }

    #[test]
    fn matches_reduced_formula_for_eight_decimal_feeds() {
        let amount: u128 = 123_456_789_012_345_678;
        let price: u128 = 187_654_321_000;
        let general = to_reference(amount, price, 18, 8).unwrap();
        let reduced = amount * price / 10u128.pow(18);
        assert_eq!(general, reduced);
        assert_eq!(general, 23_167_199_914);
    }

    #[test]
    fn whole_unit_price_form_agrees() {
        // 2.5 native units at a whole-unit price of 2000: amount * p / 10^(18 - 8).
        let amount = 5 * NATIVE_UNIT / 2;
        let whole_price: u128 = 2_000;
        let expected = amount * whole_price / 10u128.pow(18 - 8);
        assert_eq!(to_reference(amount, PRICE_2000, 18, 8).unwrap(), expected);
        assert_eq!(expected, 5_000 * REFERENCE_UNIT);
    }

    #[test]
    fn six_decimal_asset_scales_up() {
        // 1.5 units of a 6-decimal stablecoin at 1.00000000.
        let v = to_reference(1_500_000, REFERENCE_UNIT, 6, 8).unwrap();
        assert_eq!(v, 150_000_000);
    }

    #[test]
    fn tiny_amount_truncates_to_zero() {
        // 1 wei at 2000 is far below one reference unit of the last digit.
        assert_eq!(to_reference(1, PRICE_2000, 18, 8).unwrap(), 0);
    }

    #[test]
    fn truncation_rounds_down() {
        // 9-decimal asset, 8-decimal feed: reference = amount * price / 10^9.
        assert_eq!(to_reference(7, 3, 9, 8).unwrap(), 0);
        assert_eq!(to_reference(7_000_000_000, 3, 9, 8).unwrap(), 21);
        // 22.5 → 22
        assert_eq!(to_reference(7_500_000_000, 3, 9, 8).unwrap(), 22);
    }

    #[test]
    fn overflow_is_reported() {
        assert!(to_reference(u128::MAX, 2, 18, 8).is_none());
        assert!(pow10(39).is_none());
    }

    #[test]
    fn formats_with_eight_digits() {
        assert_eq!(format_reference(0), "0.00000000");
        assert_eq!(format_reference(123_450_000_000), "1234.50000000");
        assert_eq!(format_reference(1), "0.00000001");
    }
}
