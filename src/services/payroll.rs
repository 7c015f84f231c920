// src/services/payroll.rs

//! Payroll period lifecycle orchestration.
//!
//! Every command here is one logical transaction. Calculation takes a
//! `FOR UPDATE` lock on the period row, so concurrent recalculations
//! serialize and a second run can never observe a half-written result set;
//! readers outside the transaction only ever see the previous committed set
//! or the new one.

use crate::{
    domain::{
        lifecycle::{CommissionAction, CommissionStatus, PeriodAction, PeriodStatus},
        payroll::{CalculatedResult, EmployeeProfile, EntryInput, PeriodTotals, calculate_period},
        tax::{BracketSet, TaxBracket, TaxType},
    },
    errors::{AppError, AppResult},
    models::{PayrollEntry, PayrollPeriod, UpsertEntryRequest},
    tenant::TenantContext,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

const EMPLOYEE_COLUMNS: &str = "id, tenant_id, full_name, tax_id, department, \"position\", \
     bank_name, bank_account, dependents, base_salary";

/// Taxes are resolved as of the first day of the reference month.
fn reference_date(period: &PayrollPeriod) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(period.reference_year, period.reference_month as u32, 1).ok_or_else(
        || {
            AppError::Validation(format!(
                "period {}/{} is not a valid reference month",
                period.reference_month, period.reference_year
            ))
        },
    )
}

async fn fetch_period_for_update(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TenantContext,
    period_id: Uuid,
) -> AppResult<PayrollPeriod> {
    let period = sqlx::query_as::<_, PayrollPeriod>(
        "SELECT * FROM payroll_periods WHERE id = $1 FOR UPDATE",
    )
    .bind(period_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payroll period {period_id} not found")))?;

    ctx.guard(period.tenant_id)?;
    Ok(period)
}

async fn load_bracket_sets(
    tx: &mut Transaction<'_, Postgres>,
    as_of: NaiveDate,
) -> AppResult<(BracketSet, BracketSet)> {
    let rows = sqlx::query_as::<_, TaxBracket>(
        "SELECT id, tax_type, range_start, range_end, rate, deduction,
                effective_from, effective_to, is_active, sort_order
         FROM tax_brackets",
    )
    .fetch_all(&mut **tx)
    .await?;

    let social = BracketSet::for_date(rows.clone(), TaxType::SocialContribution, as_of)?;
    let withholding = BracketSet::for_date(rows, TaxType::IncomeWithholding, as_of)?;
    Ok((social, withholding))
}

pub async fn create_period(
    db: &PgPool,
    ctx: &TenantContext,
    year: i32,
    month: i32,
) -> AppResult<PayrollPeriod> {
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation(format!(
            "{month} is not a valid reference month"
        )));
    }

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM payroll_periods
         WHERE tenant_id = $1 AND reference_year = $2 AND reference_month = $3",
    )
    .bind(ctx.tenant_id)
    .bind(year)
    .bind(month)
    .fetch_optional(db)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "payroll period {month}/{year} already exists"
        )));
    }

    let period = sqlx::query_as::<_, PayrollPeriod>(
        "INSERT INTO payroll_periods (id, tenant_id, reference_year, reference_month)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(year)
    .bind(month)
    .fetch_one(db)
    .await?;

    Ok(period)
}

/// Upsert one employee's manual adjustments. Takes the same period row lock
/// as `calculate`, so an edit can never land after a concurrent calculation
/// moved the period out of draft.
pub async fn upsert_entry(
    db: &PgPool,
    ctx: &TenantContext,
    period_id: Uuid,
    req: &UpsertEntryRequest,
) -> AppResult<PayrollEntry> {
    if req.absence_days < 0 || req.justified_absence_days < 0 {
        return Err(AppError::Validation(
            "absence days cannot be negative".to_string(),
        ));
    }
    if req.justified_absence_days > req.absence_days {
        return Err(AppError::Validation(
            "justified absence days cannot exceed total absence days".to_string(),
        ));
    }
    if req.overtime_hours < Decimal::ZERO || req.lateness_hours < Decimal::ZERO {
        return Err(AppError::Validation("hours cannot be negative".to_string()));
    }

    let mut tx = db.begin().await?;
    let period = fetch_period_for_update(&mut tx, ctx, period_id).await?;
    period.status.ensure_entries_mutable()?;

    let employee_exists = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM employees WHERE id = $1 AND tenant_id = $2",
    )
    .bind(req.employee_id)
    .bind(ctx.tenant_id)
    .fetch_optional(&mut *tx)
    .await?;
    if employee_exists.is_none() {
        return Err(AppError::NotFound(format!(
            "Employee {} not found",
            req.employee_id
        )));
    }

    let entry = sqlx::query_as::<_, PayrollEntry>(
        "INSERT INTO payroll_entries (
            id, tenant_id, payroll_period_id, employee_id, absence_days,
            justified_absence_days, overtime_hours, lateness_hours, notes
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        ON CONFLICT (payroll_period_id, employee_id) DO UPDATE SET
            absence_days = EXCLUDED.absence_days,
            justified_absence_days = EXCLUDED.justified_absence_days,
            overtime_hours = EXCLUDED.overtime_hours,
            lateness_hours = EXCLUDED.lateness_hours,
            notes = EXCLUDED.notes,
            updated_at = NOW()
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(period_id)
    .bind(req.employee_id)
    .bind(req.absence_days)
    .bind(req.justified_absence_days)
    .bind(req.overtime_hours)
    .bind(req.lateness_hours)
    .bind(req.notes.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(entry)
}

/// Remove one employee's entry, under the same period lock as `upsert_entry`.
pub async fn delete_entry(
    db: &PgPool,
    ctx: &TenantContext,
    period_id: Uuid,
    employee_id: Uuid,
) -> AppResult<()> {
    let mut tx = db.begin().await?;
    let period = fetch_period_for_update(&mut tx, ctx, period_id).await?;
    period.status.ensure_entries_mutable()?;

    let result = sqlx::query(
        "DELETE FROM payroll_entries
         WHERE payroll_period_id = $1 AND employee_id = $2 AND tenant_id = $3",
    )
    .bind(period_id)
    .bind(employee_id)
    .bind(ctx.tenant_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No entry for employee {employee_id} in this period"
        )));
    }
    tx.commit().await?;
    Ok(())
}

/// Calculate or recalculate a period: replace the full result set atomically
/// and recompute totals from the fresh results. Fails without touching stored
/// state when brackets are missing, an entry is malformed, or downstream
/// commission links exist.
pub async fn calculate(
    db: &PgPool,
    ctx: &TenantContext,
    period_id: Uuid,
) -> AppResult<PayrollPeriod> {
    let mut tx = db.begin().await?;
    let period = fetch_period_for_update(&mut tx, ctx, period_id).await?;

    // Downstream settlement commitments freeze the result set until cleared.
    let linked: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM commissions WHERE payroll_period_id = $1")
            .bind(period_id)
            .fetch_one(&mut *tx)
            .await?;
    if linked > 0 {
        return Err(AppError::Conflict(format!(
            "{linked} commission(s) are attached to this period; detach them before recalculating"
        )));
    }

    // The interim state never becomes visible outside the transaction, but
    // both edges go through the transition table so an Approved or Paid
    // period is rejected here.
    let calculating = period.status.apply(PeriodAction::StartCalculation)?;

    let as_of = reference_date(&period)?;
    let (social_set, withholding_set) = load_bracket_sets(&mut tx, as_of).await?;

    let employees = sqlx::query_as::<_, EmployeeProfile>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees
         WHERE tenant_id = $1 AND is_active = true
         ORDER BY full_name",
    ))
    .bind(ctx.tenant_id)
    .fetch_all(&mut *tx)
    .await?;

    let entries = sqlx::query_as::<_, PayrollEntry>(
        "SELECT * FROM payroll_entries WHERE payroll_period_id = $1 AND tenant_id = $2",
    )
    .bind(period_id)
    .bind(ctx.tenant_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut entry_by_employee: HashMap<Uuid, EntryInput> = entries
        .into_iter()
        .map(|e| {
            (
                e.employee_id,
                EntryInput {
                    id: e.id,
                    absence_days: e.absence_days,
                    justified_absence_days: e.justified_absence_days,
                    overtime_hours: e.overtime_hours,
                    lateness_hours: e.lateness_hours,
                },
            )
        })
        .collect();

    let mut inputs: Vec<(EmployeeProfile, Option<EntryInput>)> = employees
        .into_iter()
        .map(|e| {
            let entry = entry_by_employee.remove(&e.id);
            (e, entry)
        })
        .collect();

    // Entries may reference employees deactivated after the entry was typed;
    // an entry keeps its employee in the run.
    for (employee_id, entry) in entry_by_employee.drain() {
        let profile = sqlx::query_as::<_, EmployeeProfile>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1 AND tenant_id = $2",
        ))
        .bind(employee_id)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!(
                "payroll entry {} references unknown employee {employee_id}",
                entry.id
            ))
        })?;
        inputs.push((profile, Some(entry)));
    }

    let (results, totals) = calculate_period(&inputs, &social_set, &withholding_set)?;
    let employee_count = results.len();

    // Replace-all: the old set goes away and the new one lands in the same
    // transaction, so no reader ever sees a partial overwrite.
    sqlx::query("DELETE FROM payroll_results WHERE payroll_period_id = $1")
        .bind(period_id)
        .execute(&mut *tx)
        .await?;

    for result in &results {
        insert_result(&mut tx, ctx, period_id, result).await?;
    }

    let status = calculating.apply(PeriodAction::FinishCalculation)?;
    let period = update_period_totals(&mut tx, period_id, status, &totals).await?;

    tx.commit().await?;

    info!(
        period = %period_id,
        employees = employee_count,
        total_net = %period.total_net,
        "payroll period calculated"
    );
    Ok(period)
}

async fn insert_result(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &TenantContext,
    period_id: Uuid,
    result: &CalculatedResult,
) -> AppResult<()> {
    let result_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO payroll_results (
            id, tenant_id, payroll_period_id, employee_id, payroll_entry_id,
            employee_name, employee_tax_id, department, \"position\",
            bank_name, bank_account, dependents, base_salary,
            gross_amount, total_deductions, total_contributions, net_amount,
            social_contribution_amount, income_withholding_amount,
            additional_employer_cost
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)",
    )
    .bind(result_id)
    .bind(ctx.tenant_id)
    .bind(period_id)
    .bind(result.employee.id)
    .bind(result.entry_id)
    .bind(&result.employee.full_name)
    .bind(&result.employee.tax_id)
    .bind(&result.employee.department)
    .bind(&result.employee.position)
    .bind(&result.employee.bank_name)
    .bind(&result.employee.bank_account)
    .bind(result.employee.dependents)
    .bind(result.employee.base_salary)
    .bind(result.gross_amount)
    .bind(result.total_deductions)
    .bind(result.total_contributions)
    .bind(result.net_amount)
    .bind(result.social_contribution_amount)
    .bind(result.income_withholding_amount)
    .bind(result.additional_employer_cost)
    .execute(&mut **tx)
    .await?;

    for component in &result.components {
        sqlx::query(
            "INSERT INTO payroll_components (
                id, tenant_id, payroll_result_id, component_type, code,
                description, amount, base_amount, reference_quantity,
                impacts_fgts, is_taxable, sequence
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(Uuid::new_v4())
        .bind(ctx.tenant_id)
        .bind(result_id)
        .bind(component.kind)
        .bind(component.code)
        .bind(&component.description)
        .bind(component.amount)
        .bind(component.base_amount)
        .bind(component.reference_quantity)
        .bind(component.impacts_fgts)
        .bind(component.is_taxable)
        .bind(component.sequence)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn update_period_totals(
    tx: &mut Transaction<'_, Postgres>,
    period_id: Uuid,
    status: PeriodStatus,
    totals: &PeriodTotals,
) -> AppResult<PayrollPeriod> {
    let period = sqlx::query_as::<_, PayrollPeriod>(
        "UPDATE payroll_periods
         SET status = $2,
             calculation_date = NOW(),
             total_gross = $3,
             total_net = $4,
             total_social_contribution = $5,
             total_income_withholding = $6,
             total_employer_cost = $7,
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(period_id)
    .bind(status)
    .bind(totals.gross)
    .bind(totals.net)
    .bind(totals.social_contribution)
    .bind(totals.income_withholding)
    .bind(totals.employer_cost)
    .fetch_one(&mut **tx)
    .await?;

    Ok(period)
}

/// Approval freezes the monetary snapshot: from here on recalculation is
/// permanently rejected by the transition table.
pub async fn approve(
    db: &PgPool,
    ctx: &TenantContext,
    period_id: Uuid,
) -> AppResult<PayrollPeriod> {
    let mut tx = db.begin().await?;
    let period = fetch_period_for_update(&mut tx, ctx, period_id).await?;
    let status = period.status.apply(PeriodAction::Approve)?;

    let period = sqlx::query_as::<_, PayrollPeriod>(
        "UPDATE payroll_periods
         SET status = $2, approved_at = NOW(), approved_by = $3, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(period_id)
    .bind(status)
    .bind(ctx.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(period = %period_id, approved_by = %ctx.user_id, "payroll period approved");
    Ok(period)
}

/// Mark the period paid: stamps the payment date onto every owned result
/// that does not have one yet and settles every approved commission attached
/// to the period. Calling it again on a paid period is a no-op.
pub async fn mark_paid(
    db: &PgPool,
    ctx: &TenantContext,
    period_id: Uuid,
    payment_date: Option<NaiveDate>,
) -> AppResult<PayrollPeriod> {
    let mut tx = db.begin().await?;
    let period = fetch_period_for_update(&mut tx, ctx, period_id).await?;

    let Some((status, payment_date)) = period
        .status
        .plan_payment(payment_date, Utc::now().date_naive())?
    else {
        tx.commit().await?;
        return Ok(period);
    };

    sqlx::query(
        "UPDATE payroll_results SET payment_date = $2
         WHERE payroll_period_id = $1 AND payment_date IS NULL",
    )
    .bind(period_id)
    .bind(payment_date)
    .execute(&mut *tx)
    .await?;

    // Attached commissions were required to be Approved, so the Settle edge
    // is the one legal transition for all of them.
    let settled = CommissionStatus::Approved.apply(CommissionAction::Settle)?;
    sqlx::query(
        "UPDATE commissions
         SET status = $2, paid_date = $3, updated_at = NOW()
         WHERE payroll_period_id = $1 AND status = 'approved'",
    )
    .bind(period_id)
    .bind(settled)
    .bind(payment_date)
    .execute(&mut *tx)
    .await?;

    let period = sqlx::query_as::<_, PayrollPeriod>(
        "UPDATE payroll_periods
         SET status = $2, paid_at = NOW(), paid_by = $3, payment_date = $4, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(period_id)
    .bind(status)
    .bind(ctx.user_id)
    .bind(payment_date)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(period = %period_id, paid_by = %ctx.user_id, %payment_date, "payroll period paid");
    Ok(period)
}
