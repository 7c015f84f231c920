//! Pure settlement logic: no I/O, deterministic for fixed inputs. The
//! services layer loads rows, calls into here, and persists whatever comes
//! back inside a single transaction.

pub mod commission;
pub mod lifecycle;
pub mod payroll;
pub mod performance;
pub mod tax;

use rust_decimal::{Decimal, RoundingStrategy};

/// Statutory rounding: two decimal places, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec!(20.005)), dec!(20.01));
        assert_eq!(round_money(dec!(20.004)), dec!(20.00));
        assert_eq!(round_money(dec!(-20.005)), dec!(-20.01));
    }
}
