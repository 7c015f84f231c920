// src/services/performance.rs

//! Vendor performance recompute-and-fetch.
//!
//! The rollup itself is pure (`domain::performance::rollup`); this service
//! loads the month's commission facts and the matching sales goal, then
//! upserts the scorecard row for the `(tenant, user, year, month)` key.
//! Recomputing overwrites the prior row — the table is a cache.

use crate::{
    domain::performance::{CommissionFact, GoalInput, rollup},
    errors::{AppError, AppResult},
    models::{SalesGoal, VendorPerformance},
    tenant::TenantContext,
};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

fn month_window(year: i32, month: i32) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month as u32, 1)
        .ok_or_else(|| AppError::Validation(format!("{month}/{year} is not a valid month")))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month as u32 + 1, 1)
    }
    .ok_or_else(|| AppError::Validation(format!("{month}/{year} is not a valid month")))?;
    Ok((start, end))
}

pub async fn recompute(
    db: &PgPool,
    ctx: &TenantContext,
    user_id: Uuid,
    year: i32,
    month: i32,
) -> AppResult<VendorPerformance> {
    let (start, end) = month_window(year, month)?;

    let facts = sqlx::query_as::<_, CommissionFact>(
        "SELECT status, sale_amount, profit_amount, commission_amount
         FROM commissions
         WHERE tenant_id = $1 AND user_id = $2
           AND created_at::date >= $3 AND created_at::date < $4",
    )
    .bind(ctx.tenant_id)
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;

    let goal = sqlx::query_as::<_, SalesGoal>(
        "SELECT * FROM sales_goals
         WHERE tenant_id = $1 AND user_id = $2 AND goal_year = $3 AND goal_month = $4",
    )
    .bind(ctx.tenant_id)
    .bind(user_id)
    .bind(year)
    .bind(month)
    .fetch_optional(db)
    .await?;

    let computed = rollup(
        &facts,
        goal.map(|g| GoalInput {
            target_amount: g.target_amount,
            bonus_commission_percent: g.bonus_commission_percent,
        }),
    );

    let performance = sqlx::query_as::<_, VendorPerformance>(
        "INSERT INTO vendor_performances (
            id, tenant_id, user_id, perf_year, perf_month,
            total_sales_count, total_sales_amount, total_profit_amount,
            total_commission_earned, total_commission_paid, total_commission_pending,
            bonus_commission_earned, goal_target_amount, goal_achievement_percent,
            last_calculated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,NOW())
        ON CONFLICT (tenant_id, user_id, perf_year, perf_month) DO UPDATE SET
            total_sales_count = EXCLUDED.total_sales_count,
            total_sales_amount = EXCLUDED.total_sales_amount,
            total_profit_amount = EXCLUDED.total_profit_amount,
            total_commission_earned = EXCLUDED.total_commission_earned,
            total_commission_paid = EXCLUDED.total_commission_paid,
            total_commission_pending = EXCLUDED.total_commission_pending,
            bonus_commission_earned = EXCLUDED.bonus_commission_earned,
            goal_target_amount = EXCLUDED.goal_target_amount,
            goal_achievement_percent = EXCLUDED.goal_achievement_percent,
            last_calculated_at = NOW()
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(user_id)
    .bind(year)
    .bind(month)
    .bind(computed.total_sales_count)
    .bind(computed.total_sales_amount)
    .bind(computed.total_profit_amount)
    .bind(computed.total_commission_earned)
    .bind(computed.total_commission_paid)
    .bind(computed.total_commission_pending)
    .bind(computed.bonus_commission_earned)
    .bind(computed.goal_target_amount)
    .bind(computed.goal_achievement_percent)
    .fetch_one(db)
    .await?;

    Ok(performance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_window_covers_december_rollover() {
        let (start, end) = month_window(2025, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn month_window_rejects_invalid_month() {
        assert!(month_window(2025, 0).is_err());
        assert!(month_window(2025, 13).is_err());
    }
}
