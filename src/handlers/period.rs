// src/handlers/period.rs

//! Payroll period commands and queries: create, entries, calculate, approve,
//! pay, plus result/component/slip reads. Multi-step transitions live in
//! `services::payroll`; this module keeps the thin per-request plumbing.

use crate::{
    errors::{AppError, AppResult},
    models::{
        CreatePeriodRequest, MarkPaidRequest, PayrollComponent, PayrollEntry, PayrollPeriod,
        PayrollResult, PayrollSlip, RegisterSlipRequest, UpsertEntryRequest,
    },
    services,
    state::AppState,
    tenant::TenantContext,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Open a new draft period for a (year, month)
#[utoipa::path(
    post,
    path = "/api/v1/payroll/periods",
    request_body = CreatePeriodRequest,
    responses(
        (status = 201, description = "Period created", body = PayrollPeriod),
        (status = 409, description = "Period already exists for this month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn create_period(
    ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<CreatePeriodRequest>,
) -> AppResult<(StatusCode, Json<PayrollPeriod>)> {
    let period = services::payroll::create_period(
        &state.db,
        &ctx,
        body.reference_year,
        body.reference_month,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(period)))
}

/// List the tenant's payroll periods, newest first
#[utoipa::path(
    get,
    path = "/api/v1/payroll/periods",
    responses((status = 200, description = "Periods", body = Vec<PayrollPeriod>)),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn list_periods(
    ctx: TenantContext,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PayrollPeriod>>> {
    let periods = sqlx::query_as::<_, PayrollPeriod>(
        "SELECT * FROM payroll_periods WHERE tenant_id = $1
         ORDER BY reference_year DESC, reference_month DESC",
    )
    .bind(ctx.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(periods))
}

async fn fetch_period(
    state: &AppState,
    ctx: &TenantContext,
    period_id: Uuid,
) -> AppResult<PayrollPeriod> {
    let period =
        sqlx::query_as::<_, PayrollPeriod>("SELECT * FROM payroll_periods WHERE id = $1")
            .bind(period_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payroll period {period_id} not found")))?;

    ctx.guard(period.tenant_id)?;
    Ok(period)
}

/// Get one payroll period with its totals
#[utoipa::path(
    get,
    path = "/api/v1/payroll/periods/{period_id}",
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses(
        (status = 200, description = "Period detail", body = PayrollPeriod),
        (status = 404, description = "Period not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn get_period(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
) -> AppResult<Json<PayrollPeriod>> {
    Ok(Json(fetch_period(&state, &ctx, period_id).await?))
}

// ─── Entries ──────────────────────────────────────────────────────────────────

/// Upsert the manual adjustments for one employee in a draft period
#[utoipa::path(
    put,
    path = "/api/v1/payroll/periods/{period_id}/entries",
    request_body = UpsertEntryRequest,
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses(
        (status = 200, description = "Entry saved", body = PayrollEntry),
        (status = 422, description = "Period is no longer in draft"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Entries"
)]
pub async fn upsert_entry(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
    Json(body): Json<UpsertEntryRequest>,
) -> AppResult<Json<PayrollEntry>> {
    let entry = services::payroll::upsert_entry(&state.db, &ctx, period_id, &body).await?;
    Ok(Json(entry))
}

/// List the period's entries
#[utoipa::path(
    get,
    path = "/api/v1/payroll/periods/{period_id}/entries",
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses((status = 200, description = "Entries", body = Vec<PayrollEntry>)),
    security(("bearer_auth" = [])),
    tag = "Payroll Entries"
)]
pub async fn list_entries(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
) -> AppResult<Json<Vec<PayrollEntry>>> {
    fetch_period(&state, &ctx, period_id).await?;

    let entries = sqlx::query_as::<_, PayrollEntry>(
        "SELECT * FROM payroll_entries
         WHERE payroll_period_id = $1 AND tenant_id = $2
         ORDER BY created_at",
    )
    .bind(period_id)
    .bind(ctx.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

/// Remove one employee's entry from a draft period
#[utoipa::path(
    delete,
    path = "/api/v1/payroll/periods/{period_id}/entries/{employee_id}",
    params(
        ("period_id" = Uuid, Path, description = "Payroll period ID"),
        ("employee_id" = Uuid, Path, description = "Employee ID"),
    ),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "Entry not found"),
        (status = 422, description = "Period is no longer in draft"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Entries"
)]
pub async fn delete_entry(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path((period_id, employee_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::payroll::delete_entry(&state.db, &ctx, period_id, employee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Lifecycle commands ───────────────────────────────────────────────────────

/// Calculate (or recalculate) the period, replacing all results atomically
#[utoipa::path(
    post,
    path = "/api/v1/payroll/periods/{period_id}/calculate",
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses(
        (status = 200, description = "Period calculated", body = PayrollPeriod),
        (status = 409, description = "Attached commissions block recalculation"),
        (status = 422, description = "Period cannot be calculated in its current status"),
        (status = 500, description = "Bracket tables missing for the reference date, or no eligible employees"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn calculate_period(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
) -> AppResult<Json<PayrollPeriod>> {
    let period = services::payroll::calculate(&state.db, &ctx, period_id).await?;
    Ok(Json(period))
}

/// Approve a calculated period, freezing its results
#[utoipa::path(
    post,
    path = "/api/v1/payroll/periods/{period_id}/approve",
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses(
        (status = 200, description = "Period approved", body = PayrollPeriod),
        (status = 422, description = "Period is not in calculated status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn approve_period(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
) -> AppResult<Json<PayrollPeriod>> {
    let period = services::payroll::approve(&state.db, &ctx, period_id).await?;
    Ok(Json(period))
}

/// Mark an approved period as paid (idempotent)
#[utoipa::path(
    post,
    path = "/api/v1/payroll/periods/{period_id}/pay",
    request_body = MarkPaidRequest,
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses(
        (status = 200, description = "Period paid", body = PayrollPeriod),
        (status = 422, description = "Period is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Periods"
)]
pub async fn mark_period_paid(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
    Json(body): Json<MarkPaidRequest>,
) -> AppResult<Json<PayrollPeriod>> {
    let period =
        services::payroll::mark_paid(&state.db, &ctx, period_id, body.payment_date).await?;
    Ok(Json(period))
}

// ─── Results, components & slips ──────────────────────────────────────────────

/// List the period's calculated results
#[utoipa::path(
    get,
    path = "/api/v1/payroll/periods/{period_id}/results",
    params(("period_id" = Uuid, Path, description = "Payroll period ID")),
    responses((status = 200, description = "Results", body = Vec<PayrollResult>)),
    security(("bearer_auth" = [])),
    tag = "Payroll Results"
)]
pub async fn list_results(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(period_id): Path<Uuid>,
) -> AppResult<Json<Vec<PayrollResult>>> {
    fetch_period(&state, &ctx, period_id).await?;

    let results = sqlx::query_as::<_, PayrollResult>(
        "SELECT * FROM payroll_results
         WHERE payroll_period_id = $1 AND tenant_id = $2
         ORDER BY employee_name",
    )
    .bind(period_id)
    .bind(ctx.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(results))
}

/// List one employee's results across periods, newest first
#[utoipa::path(
    get,
    path = "/api/v1/payroll/results/employee/{employee_id}",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Results", body = Vec<PayrollResult>)),
    security(("bearer_auth" = [])),
    tag = "Payroll Results"
)]
pub async fn list_results_by_employee(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Vec<PayrollResult>>> {
    let results = sqlx::query_as::<_, PayrollResult>(
        "SELECT * FROM payroll_results
         WHERE employee_id = $1 AND tenant_id = $2
         ORDER BY created_at DESC",
    )
    .bind(employee_id)
    .bind(ctx.tenant_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(results))
}

async fn fetch_result(
    state: &AppState,
    ctx: &TenantContext,
    result_id: Uuid,
) -> AppResult<PayrollResult> {
    let result =
        sqlx::query_as::<_, PayrollResult>("SELECT * FROM payroll_results WHERE id = $1")
            .bind(result_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payroll result {result_id} not found")))?;

    ctx.guard(result.tenant_id)?;
    Ok(result)
}

/// List a result's payslip lines in display order
#[utoipa::path(
    get,
    path = "/api/v1/payroll/results/{result_id}/components",
    params(("result_id" = Uuid, Path, description = "Payroll result ID")),
    responses((status = 200, description = "Components", body = Vec<PayrollComponent>)),
    security(("bearer_auth" = [])),
    tag = "Payroll Results"
)]
pub async fn list_components(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(result_id): Path<Uuid>,
) -> AppResult<Json<Vec<PayrollComponent>>> {
    fetch_result(&state, &ctx, result_id).await?;

    let components = sqlx::query_as::<_, PayrollComponent>(
        "SELECT * FROM payroll_components
         WHERE payroll_result_id = $1
         ORDER BY sequence",
    )
    .bind(result_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(components))
}

/// Register the generated payslip document for a result
#[utoipa::path(
    post,
    path = "/api/v1/payroll/results/{result_id}/slip",
    request_body = RegisterSlipRequest,
    params(("result_id" = Uuid, Path, description = "Payroll result ID")),
    responses(
        (status = 201, description = "Slip metadata registered", body = PayrollSlip),
        (status = 409, description = "A slip is already registered for this result"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Results"
)]
pub async fn register_slip(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(result_id): Path<Uuid>,
    Json(body): Json<RegisterSlipRequest>,
) -> AppResult<(StatusCode, Json<PayrollSlip>)> {
    fetch_result(&state, &ctx, result_id).await?;

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM payroll_slips WHERE payroll_result_id = $1",
    )
    .bind(result_id)
    .fetch_optional(&state.db)
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "a payslip document is already registered for this result".to_string(),
        ));
    }

    let slip = sqlx::query_as::<_, PayrollSlip>(
        "INSERT INTO payroll_slips (
            id, tenant_id, payroll_result_id, file_path, content_hash,
            file_size, generated_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(result_id)
    .bind(body.file_path)
    .bind(body.content_hash)
    .bind(body.file_size)
    .bind(ctx.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(slip)))
}

/// Get the registered payslip document metadata for a result
#[utoipa::path(
    get,
    path = "/api/v1/payroll/results/{result_id}/slip",
    params(("result_id" = Uuid, Path, description = "Payroll result ID")),
    responses(
        (status = 200, description = "Slip metadata", body = PayrollSlip),
        (status = 404, description = "No slip registered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll Results"
)]
pub async fn get_slip(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(result_id): Path<Uuid>,
) -> AppResult<Json<PayrollSlip>> {
    fetch_result(&state, &ctx, result_id).await?;

    let slip = sqlx::query_as::<_, PayrollSlip>(
        "SELECT * FROM payroll_slips WHERE payroll_result_id = $1",
    )
    .bind(result_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("No payslip registered for result {result_id}"))
    })?;

    Ok(Json(slip))
}
