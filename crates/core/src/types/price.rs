//! Money arithmetic for BRL prices.
//!
//! All amounts are `Decimal` in reais (not centavos). Anything that leaves
//! the store - order totals, PIX charge amounts - is rounded to two places
//! with [`round_money`] first.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to centavos, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a percentage discount and round the result.
///
/// A percent outside `0..=100` is clamped.
///
/// ```
/// use rust_decimal::Decimal;
/// use pixstore_core::apply_discount;
///
/// let subtotal = Decimal::new(5980, 2);
/// assert_eq!(apply_discount(subtotal, Decimal::from(5)), Decimal::new(5681, 2));
/// ```
#[must_use]
pub fn apply_discount(amount: Decimal, percent: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    let percent = percent.clamp(Decimal::ZERO, hundred);
    round_money(amount * (hundred - percent) / hundred)
}

/// Savings percentage shown on a product badge.
///
/// Returns `None` unless the original price is strictly higher than the
/// current one.
#[must_use]
pub fn discount_percent(price: Decimal, original_price: Option<Decimal>) -> Option<u32> {
    let original = original_price?;
    if original <= price || original <= Decimal::ZERO {
        return None;
    }
    let pct = ((original - price) / original * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    pct.to_u32()
}

/// Amount as submitted to the PIX provider: two decimals, dot separator,
/// no thousands grouping (`1000.98`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Amount formatted for Brazilian display: `R$ 1.234,56`.
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    format!("{sign}R$ {grouped},{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(mantissa: i64, scale: u32) -> Decimal {
        Decimal::new(mantissa, scale)
    }

    #[test]
    fn test_pix_discount_example() {
        // 29.90 x 2 = 59.80, five percent off
        let subtotal = dec(2990, 2) * Decimal::from(2);
        assert_eq!(subtotal, dec(5980, 2));
        assert_eq!(apply_discount(subtotal, Decimal::from(5)), dec(5681, 2));
    }

    #[test]
    fn test_apply_discount_rounds_half_away_from_zero() {
        // 0.10 * 0.95 = 0.095 -> 0.10
        assert_eq!(apply_discount(dec(10, 2), Decimal::from(5)), dec(10, 2));
    }

    #[test]
    fn test_apply_discount_clamps_percent() {
        assert_eq!(apply_discount(dec(1000, 2), Decimal::from(150)), Decimal::ZERO);
        assert_eq!(apply_discount(dec(1000, 2), Decimal::from(-5)), dec(1000, 2));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec(12_345, 3)), dec(1235, 2));
        assert_eq!(round_money(dec(12_344, 3)), dec(1234, 2));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec(5681, 2)), "56.81");
        assert_eq!(format_amount(Decimal::from(20)), "20.00");
        assert_eq!(format_amount(dec(100_098, 2)), "1000.98");
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec(5980, 2)), "R$ 59,80");
        assert_eq!(format_brl(dec(123_456, 2)), "R$ 1.234,56");
        assert_eq!(format_brl(dec(123_456_789, 2)), "R$ 1.234.567,89");
        assert_eq!(format_brl(Decimal::ZERO), "R$ 0,00");
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(discount_percent(dec(2990, 2), Some(dec(4990, 2))), Some(40));
        assert_eq!(discount_percent(dec(2990, 2), Some(dec(2990, 2))), None);
        assert_eq!(discount_percent(dec(2990, 2), None), None);
    }

    #[test]
    fn test_format_brl_negative_and_rounding() {
        assert_eq!(format_brl(dec(-1050, 2)), "-R$ 10,50");
        assert_eq!(format_brl(dec(-1, 3)), "R$ 0,00");
        assert_eq!(format_brl(dec(99_995, 3)), "R$ 100,00");
    }
}
