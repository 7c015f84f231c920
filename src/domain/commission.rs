//! Pure commission computation over a finalized sale or service-order line.
//!
//! The line carries its own cost-price snapshot, taken when the item was
//! sold — profit is computed from that snapshot, never from the live catalog
//! cost, so a stored commission cannot drift when the catalog changes.

use crate::{
    domain::round_money,
    errors::{AppError, AppResult},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sale,
    ServiceOrder,
}

/// A finalized line item as received from the sales/service surfaces.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SettledLine {
    pub unit_price: Decimal,
    /// Cost snapshot stored on the line item itself at sale time.
    pub cost_price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    /// Copied from the catalog at sale time, never re-read.
    pub commission_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionComputation {
    /// Net sale value of the line (price * quantity - discount).
    pub sale_amount: Decimal,
    /// May be negative; preserved as-is for review.
    pub profit_amount: Decimal,
    /// Floored at zero when profit is not positive.
    pub commission_amount: Decimal,
    /// Set when the floor kicked in, so the payout is reviewed instead of
    /// silently clamped away.
    pub flagged_for_review: bool,
}

pub fn compute(line: &SettledLine) -> AppResult<CommissionComputation> {
    if line.quantity <= Decimal::ZERO {
        return Err(AppError::Validation(
            "line quantity must be positive".to_string(),
        ));
    }
    if line.unit_price < Decimal::ZERO || line.cost_price < Decimal::ZERO {
        return Err(AppError::Validation(
            "line prices cannot be negative".to_string(),
        ));
    }
    if line.discount < Decimal::ZERO {
        return Err(AppError::Validation(
            "line discount cannot be negative".to_string(),
        ));
    }
    if line.commission_percent < Decimal::ZERO || line.commission_percent > dec!(100) {
        return Err(AppError::Validation(
            "commission percent must be between 0 and 100".to_string(),
        ));
    }

    let sale_amount = round_money(line.unit_price * line.quantity - line.discount);
    let profit_amount =
        round_money((line.unit_price - line.cost_price) * line.quantity - line.discount);

    let (commission_amount, flagged_for_review) = if profit_amount > Decimal::ZERO {
        (
            round_money(profit_amount * line.commission_percent / dec!(100)),
            false,
        )
    } else {
        (Decimal::ZERO, true)
    };

    Ok(CommissionComputation {
        sale_amount,
        profit_amount,
        commission_amount,
        flagged_for_review,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(
        unit_price: Decimal,
        cost_price: Decimal,
        quantity: Decimal,
        discount: Decimal,
        percent: Decimal,
    ) -> SettledLine {
        SettledLine {
            unit_price,
            cost_price,
            quantity,
            discount,
            commission_percent: percent,
        }
    }

    #[test]
    fn profit_200_at_10_percent_pays_20() {
        let c = compute(&line(dec!(300.00), dec!(100.00), dec!(1), dec!(0), dec!(10.00))).unwrap();
        assert_eq!(c.profit_amount, dec!(200.00));
        assert_eq!(c.commission_amount, dec!(20.00));
        assert!(!c.flagged_for_review);
    }

    #[test]
    fn discount_reduces_profit_and_sale_amount() {
        let c = compute(&line(dec!(50.00), dec!(30.00), dec!(4), dec!(20.00), dec!(5.00))).unwrap();
        assert_eq!(c.sale_amount, dec!(180.00));
        // (50 - 30) * 4 - 20 = 60
        assert_eq!(c.profit_amount, dec!(60.00));
        assert_eq!(c.commission_amount, dec!(3.00));
    }

    #[test]
    fn commission_rounds_half_up() {
        // profit 33.35 * 7.5% = 2.50125
        let c = compute(&line(dec!(66.70), dec!(33.35), dec!(1), dec!(0), dec!(7.50))).unwrap();
        assert_eq!(c.commission_amount, dec!(2.50));
        // profit 10.10 * 2.5% = 0.2525
        let c = compute(&line(dec!(20.20), dec!(10.10), dec!(1), dec!(0), dec!(2.50))).unwrap();
        assert_eq!(c.commission_amount, dec!(0.25));
        // profit 100.00 * 10.005% would need a finer percent; check a .005 edge
        let c = compute(&line(dec!(101.01), dec!(0), dec!(1), dec!(0), dec!(2.50))).unwrap();
        assert_eq!(c.commission_amount, dec!(2.53));
    }

    #[test]
    fn negative_profit_floors_commission_and_flags() {
        let c = compute(&line(dec!(80.00), dec!(100.00), dec!(1), dec!(0), dec!(10.00))).unwrap();
        assert_eq!(c.profit_amount, dec!(-20.00));
        assert_eq!(c.commission_amount, dec!(0.00));
        assert!(c.flagged_for_review);
    }

    #[test]
    fn zero_profit_floors_commission_and_flags() {
        let c = compute(&line(dec!(100.00), dec!(100.00), dec!(2), dec!(0), dec!(10.00))).unwrap();
        assert_eq!(c.commission_amount, dec!(0.00));
        assert!(c.flagged_for_review);
    }

    #[test]
    fn computation_uses_the_snapshot_not_a_live_cost() {
        let mut l = line(dec!(300.00), dec!(100.00), dec!(1), dec!(0), dec!(10.00));
        let first = compute(&l).unwrap();

        // Catalog cost changing later means a new line snapshot, never a
        // recomputation of the old one.
        l.cost_price = dec!(250.00);
        let second = compute(&l).unwrap();

        assert_eq!(first.commission_amount, dec!(20.00));
        assert_eq!(second.commission_amount, dec!(5.00));
    }

    #[test]
    fn invalid_lines_are_rejected() {
        assert!(compute(&line(dec!(10), dec!(5), dec!(0), dec!(0), dec!(10))).is_err());
        assert!(compute(&line(dec!(-1), dec!(5), dec!(1), dec!(0), dec!(10))).is_err());
        assert!(compute(&line(dec!(10), dec!(5), dec!(1), dec!(-1), dec!(10))).is_err());
        assert!(compute(&line(dec!(10), dec!(5), dec!(1), dec!(0), dec!(101))).is_err());
    }
}
