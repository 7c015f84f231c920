//! Vendor performance rollup.
//!
//! A pure recomputation over one `(tenant, user, year, month)` window: sums
//! the month's commissions, compares against the sales goal when one exists,
//! and yields the numbers the service upserts. The stored row is a cache —
//! recomputing always overwrites it.

use crate::domain::{lifecycle::CommissionStatus, round_money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The slice of a commission row the rollup needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommissionFact {
    pub status: CommissionStatus,
    pub sale_amount: Decimal,
    pub profit_amount: Decimal,
    pub commission_amount: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalInput {
    pub target_amount: Decimal,
    pub bonus_commission_percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceRollup {
    pub total_sales_count: i32,
    pub total_sales_amount: Decimal,
    pub total_profit_amount: Decimal,
    pub total_commission_earned: Decimal,
    pub total_commission_paid: Decimal,
    pub total_commission_pending: Decimal,
    pub bonus_commission_earned: Decimal,
    pub goal_target_amount: Option<Decimal>,
    pub goal_achievement_percent: Option<Decimal>,
}

/// Cancelled commissions count for nothing; pending and approved both sit in
/// the "pending" payout bucket until settled against a paid payroll period.
pub fn rollup(facts: &[CommissionFact], goal: Option<GoalInput>) -> PerformanceRollup {
    let mut out = PerformanceRollup::default();

    for fact in facts {
        if fact.status == CommissionStatus::Cancelled {
            continue;
        }
        out.total_sales_count += 1;
        out.total_sales_amount += fact.sale_amount;
        out.total_profit_amount += fact.profit_amount;
        out.total_commission_earned += fact.commission_amount;
        match fact.status {
            CommissionStatus::Paid => out.total_commission_paid += fact.commission_amount,
            CommissionStatus::Pending | CommissionStatus::Approved => {
                out.total_commission_pending += fact.commission_amount;
            }
            CommissionStatus::Cancelled => unreachable!(),
        }
    }

    if let Some(goal) = goal {
        out.goal_target_amount = Some(goal.target_amount);
        if goal.target_amount > Decimal::ZERO {
            out.goal_achievement_percent = Some(round_money(
                out.total_sales_amount / goal.target_amount * dec!(100),
            ));
            if out.total_sales_amount >= goal.target_amount {
                out.bonus_commission_earned = round_money(
                    out.total_profit_amount * goal.bonus_commission_percent / dec!(100),
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(status: CommissionStatus, sale: Decimal, profit: Decimal, commission: Decimal) -> CommissionFact {
        CommissionFact {
            status,
            sale_amount: sale,
            profit_amount: profit,
            commission_amount: commission,
        }
    }

    #[test]
    fn sums_by_payout_bucket() {
        let facts = vec![
            fact(CommissionStatus::Paid, dec!(1000), dec!(300), dec!(30)),
            fact(CommissionStatus::Approved, dec!(500), dec!(100), dec!(10)),
            fact(CommissionStatus::Pending, dec!(200), dec!(50), dec!(5)),
        ];
        let out = rollup(&facts, None);

        assert_eq!(out.total_sales_count, 3);
        assert_eq!(out.total_sales_amount, dec!(1700));
        assert_eq!(out.total_profit_amount, dec!(450));
        assert_eq!(out.total_commission_earned, dec!(45));
        assert_eq!(out.total_commission_paid, dec!(30));
        assert_eq!(out.total_commission_pending, dec!(15));
        assert!(out.goal_target_amount.is_none());
        assert!(out.goal_achievement_percent.is_none());
    }

    #[test]
    fn cancelled_commissions_are_excluded_everywhere() {
        let facts = vec![
            fact(CommissionStatus::Paid, dec!(1000), dec!(300), dec!(30)),
            fact(CommissionStatus::Cancelled, dec!(9000), dec!(5000), dec!(500)),
        ];
        let out = rollup(&facts, None);
        assert_eq!(out.total_sales_count, 1);
        assert_eq!(out.total_sales_amount, dec!(1000));
        assert_eq!(out.total_commission_earned, dec!(30));
    }

    #[test]
    fn achievement_percent_against_goal() {
        let facts = vec![fact(CommissionStatus::Paid, dec!(750), dec!(200), dec!(20))];
        let goal = GoalInput {
            target_amount: dec!(1000),
            bonus_commission_percent: dec!(2),
        };
        let out = rollup(&facts, Some(goal));
        assert_eq!(out.goal_achievement_percent, Some(dec!(75.00)));
        // under target: no bonus
        assert_eq!(out.bonus_commission_earned, dec!(0));
    }

    #[test]
    fn bonus_when_target_met() {
        let facts = vec![
            fact(CommissionStatus::Paid, dec!(800), dec!(200), dec!(20)),
            fact(CommissionStatus::Approved, dec!(400), dec!(150), dec!(15)),
        ];
        let goal = GoalInput {
            target_amount: dec!(1000),
            bonus_commission_percent: dec!(2.00),
        };
        let out = rollup(&facts, Some(goal));
        assert_eq!(out.goal_achievement_percent, Some(dec!(120.00)));
        // 2% of 350 profit
        assert_eq!(out.bonus_commission_earned, dec!(7.00));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let facts = vec![fact(CommissionStatus::Paid, dec!(100), dec!(40), dec!(4))];
        assert_eq!(rollup(&facts, None), rollup(&facts, None));
    }

    #[test]
    fn zero_target_yields_no_achievement() {
        let out = rollup(
            &[],
            Some(GoalInput {
                target_amount: dec!(0),
                bonus_commission_percent: dec!(5),
            }),
        );
        assert_eq!(out.goal_target_amount, Some(dec!(0)));
        assert!(out.goal_achievement_percent.is_none());
    }
}
