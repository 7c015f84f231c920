// src/handlers/commission.rs

//! Commission recording, review and settlement endpoints. The multi-row
//! attach flow lives in `services::settlement`; reads stay inline.

use crate::{
    errors::{AppError, AppResult},
    models::{AttachCommissionsRequest, Commission, CommissionListQuery, RecordCommissionRequest},
    services,
    state::AppState,
    tenant::TenantContext,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Record the commission for a finalized sale or service-order line item
#[utoipa::path(
    post,
    path = "/api/v1/commissions",
    request_body = RecordCommissionRequest,
    responses(
        (status = 201, description = "Commission recorded", body = Commission),
        (status = 400, description = "Invalid line snapshot"),
        (status = 409, description = "A commission already exists for this line item"),
    ),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn record_commission(
    ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<RecordCommissionRequest>,
) -> AppResult<(StatusCode, Json<Commission>)> {
    let commission = services::settlement::record(&state.db, &ctx, &body).await?;
    Ok((StatusCode::CREATED, Json(commission)))
}

/// List the tenant's commissions with optional filters
#[utoipa::path(
    get,
    path = "/api/v1/commissions",
    params(CommissionListQuery),
    responses((status = 200, description = "Commissions", body = Vec<Commission>)),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn list_commissions(
    ctx: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<CommissionListQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    let commissions = sqlx::query_as::<_, Commission>(
        "SELECT * FROM commissions
         WHERE tenant_id = $1
           AND ($2::commission_status IS NULL OR status = $2)
           AND ($3::uuid IS NULL OR user_id = $3)
           AND ($4::date IS NULL OR created_at::date >= $4)
           AND ($5::date IS NULL OR created_at::date <= $5)
         ORDER BY created_at DESC",
    )
    .bind(ctx.tenant_id)
    .bind(query.status)
    .bind(query.user_id)
    .bind(query.from)
    .bind(query.to)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(commissions))
}

/// Get one commission
#[utoipa::path(
    get,
    path = "/api/v1/commissions/{commission_id}",
    params(("commission_id" = Uuid, Path, description = "Commission ID")),
    responses(
        (status = 200, description = "Commission detail", body = Commission),
        (status = 404, description = "Commission not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn get_commission(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
) -> AppResult<Json<Commission>> {
    let commission =
        sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = $1")
            .bind(commission_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Commission {commission_id} not found")))?;

    ctx.guard(commission.tenant_id)?;
    Ok(Json(commission))
}

/// Approve a pending commission after review
#[utoipa::path(
    post,
    path = "/api/v1/commissions/{commission_id}/approve",
    params(("commission_id" = Uuid, Path, description = "Commission ID")),
    responses(
        (status = 200, description = "Commission approved", body = Commission),
        (status = 422, description = "Commission is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn approve_commission(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
) -> AppResult<Json<Commission>> {
    let commission = services::settlement::approve(&state.db, &ctx, commission_id).await?;
    Ok(Json(commission))
}

/// Cancel a pending or approved commission
#[utoipa::path(
    post,
    path = "/api/v1/commissions/{commission_id}/cancel",
    params(("commission_id" = Uuid, Path, description = "Commission ID")),
    responses(
        (status = 200, description = "Commission cancelled", body = Commission),
        (status = 409, description = "Commission is attached to a payroll period"),
        (status = 422, description = "Commission cannot be cancelled from its status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn cancel_commission(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
) -> AppResult<Json<Commission>> {
    let commission = services::settlement::cancel(&state.db, &ctx, commission_id).await?;
    Ok(Json(commission))
}

/// Attach approved commissions to an approved-or-paid payroll period
#[utoipa::path(
    post,
    path = "/api/v1/commissions/attach",
    request_body = AttachCommissionsRequest,
    responses(
        (status = 200, description = "Commissions attached", body = Vec<Commission>),
        (status = 409, description = "A commission is already attached"),
        (status = 422, description = "Period or commission in the wrong status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Commissions"
)]
pub async fn attach_commissions(
    ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<AttachCommissionsRequest>,
) -> AppResult<Json<Vec<Commission>>> {
    let attached = services::settlement::attach_to_period(&state.db, &ctx, &body).await?;
    Ok(Json(attached))
}
