// src/services/settlement.rs

//! Commission recording and settlement.
//!
//! A commission is born `Pending` when a sale or service-order line item is
//! finalized, is reviewed into `Approved`, and is settled (`Paid`) by being
//! attached to a payroll period that has been approved and paid. Attaching is
//! the only path to `Paid`.

use crate::{
    domain::{
        commission::{SettledLine, compute},
        lifecycle::{CommissionAction, CommissionStatus, PeriodStatus, stamped_payment_date},
    },
    errors::{AppError, AppResult},
    models::{AttachCommissionsRequest, Commission, PayrollPeriod, RecordCommissionRequest},
    tenant::TenantContext,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

/// Record the commission for a finalized line item. Profit comes from the
/// line's own cost-price snapshot; the catalog is never consulted again.
pub async fn record(
    db: &PgPool,
    ctx: &TenantContext,
    req: &RecordCommissionRequest,
) -> AppResult<Commission> {
    let line = SettledLine {
        unit_price: req.unit_price,
        cost_price: req.cost_price,
        quantity: req.quantity,
        discount: req.discount,
        commission_percent: req.commission_percent,
    };
    let computed = compute(&line)?;

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM commissions WHERE source_kind = $1 AND line_item_id = $2",
    )
    .bind(req.source_kind)
    .bind(req.line_item_id)
    .fetch_optional(db)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "a commission already exists for line item {}",
            req.line_item_id
        )));
    }

    let commission = sqlx::query_as::<_, Commission>(
        "INSERT INTO commissions (
            id, tenant_id, source_kind, source_id, line_item_id, product_id,
            user_id, sale_amount, profit_amount, commission_percent,
            commission_amount, flagged_for_review
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(req.source_kind)
    .bind(req.source_id)
    .bind(req.line_item_id)
    .bind(req.product_id)
    .bind(req.user_id)
    .bind(computed.sale_amount)
    .bind(computed.profit_amount)
    .bind(req.commission_percent)
    .bind(computed.commission_amount)
    .bind(computed.flagged_for_review)
    .fetch_one(db)
    .await?;

    if commission.flagged_for_review {
        warn!(
            commission = %commission.id,
            profit = %commission.profit_amount,
            "commission recorded with non-positive profit, flagged for review"
        );
    }
    Ok(commission)
}

async fn fetch_commission_for_update(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TenantContext,
    commission_id: Uuid,
) -> AppResult<Commission> {
    let commission =
        sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = $1 FOR UPDATE")
            .bind(commission_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Commission {commission_id} not found")))?;

    ctx.guard(commission.tenant_id)?;
    Ok(commission)
}

async fn transition(
    db: &PgPool,
    ctx: &TenantContext,
    commission_id: Uuid,
    action: CommissionAction,
) -> AppResult<Commission> {
    let mut tx = db.begin().await?;
    let commission = fetch_commission_for_update(&mut tx, ctx, commission_id).await?;

    if commission.payroll_period_id.is_some() {
        return Err(AppError::Conflict(format!(
            "commission {commission_id} is attached to a payroll period; detach it first"
        )));
    }

    let status = commission.status.apply(action)?;
    let commission = sqlx::query_as::<_, Commission>(
        "UPDATE commissions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(commission_id)
    .bind(status)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(commission)
}

pub async fn approve(db: &PgPool, ctx: &TenantContext, id: Uuid) -> AppResult<Commission> {
    transition(db, ctx, id, CommissionAction::Approve).await
}

pub async fn cancel(db: &PgPool, ctx: &TenantContext, id: Uuid) -> AppResult<Commission> {
    transition(db, ctx, id, CommissionAction::Cancel).await
}

/// Bulk settlement: attach approved commissions to an approved-or-paid
/// payroll period. When the period is already paid the commissions settle
/// immediately; otherwise they settle when the period is marked paid.
pub async fn attach_to_period(
    db: &PgPool,
    ctx: &TenantContext,
    req: &AttachCommissionsRequest,
) -> AppResult<Vec<Commission>> {
    if req.commission_ids.is_empty() {
        return Err(AppError::Validation(
            "no commission ids were given".to_string(),
        ));
    }

    let mut tx = db.begin().await?;

    let period = sqlx::query_as::<_, PayrollPeriod>(
        "SELECT * FROM payroll_periods WHERE id = $1 FOR UPDATE",
    )
    .bind(req.payroll_period_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("Payroll period {} not found", req.payroll_period_id))
    })?;
    ctx.guard(period.tenant_id)?;

    if !matches!(period.status, PeriodStatus::Approved | PeriodStatus::Paid) {
        return Err(AppError::InvalidState(format!(
            "commissions can only be attached to an approved or paid period, not '{}'",
            period.status.as_str()
        )));
    }

    let mut attached = Vec::with_capacity(req.commission_ids.len());
    for &commission_id in &req.commission_ids {
        let commission = fetch_commission_for_update(&mut tx, ctx, commission_id).await?;

        if commission.payroll_period_id.is_some() {
            return Err(AppError::Conflict(format!(
                "commission {commission_id} is already attached to a payroll period"
            )));
        }
        if commission.status != CommissionStatus::Approved {
            return Err(AppError::InvalidState(format!(
                "commission {commission_id} is '{}', only approved commissions can be attached",
                commission.status.as_str()
            )));
        }

        let commission = if period.status == PeriodStatus::Paid {
            let settled = commission.status.apply(CommissionAction::Settle)?;
            let paid_date = stamped_payment_date(period.payment_date, Utc::now().date_naive());
            sqlx::query_as::<_, Commission>(
                "UPDATE commissions
                 SET payroll_period_id = $2, status = $3, paid_date = $4, updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(commission_id)
            .bind(period.id)
            .bind(settled)
            .bind(paid_date)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, Commission>(
                "UPDATE commissions
                 SET payroll_period_id = $2, updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(commission_id)
            .bind(period.id)
            .fetch_one(&mut *tx)
            .await?
        };
        attached.push(commission);
    }

    tx.commit().await?;
    info!(
        period = %period.id,
        count = attached.len(),
        "commissions attached to payroll period"
    );
    Ok(attached)
}
