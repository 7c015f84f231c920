// src/handlers/performance.rs

//! Sales goals and vendor performance scorecards.

use crate::{
    errors::{AppError, AppResult},
    models::{SalesGoal, SetSalesGoalRequest, VendorPerformance},
    services,
    state::AppState,
    tenant::TenantContext,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal_macros::dec;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct GoalListQuery {
    pub user_id: Option<Uuid>,
    pub goal_year: Option<i32>,
}

/// Set (or replace) a salesperson's monthly target
#[utoipa::path(
    put,
    path = "/api/v1/sales-goals",
    request_body = SetSalesGoalRequest,
    responses(
        (status = 200, description = "Goal saved", body = SalesGoal),
        (status = 400, description = "Invalid goal"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn set_sales_goal(
    ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<SetSalesGoalRequest>,
) -> AppResult<Json<SalesGoal>> {
    if !(1..=12).contains(&body.goal_month) {
        return Err(AppError::Validation(format!(
            "{} is not a valid month",
            body.goal_month
        )));
    }
    if body.target_amount < dec!(0) || body.bonus_commission_percent < dec!(0) {
        return Err(AppError::Validation(
            "target and bonus percent cannot be negative".to_string(),
        ));
    }

    let goal = sqlx::query_as::<_, SalesGoal>(
        "INSERT INTO sales_goals (
            id, tenant_id, user_id, goal_year, goal_month,
            target_amount, bonus_commission_percent
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (tenant_id, user_id, goal_year, goal_month) DO UPDATE SET
            target_amount = EXCLUDED.target_amount,
            bonus_commission_percent = EXCLUDED.bonus_commission_percent
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.tenant_id)
    .bind(body.user_id)
    .bind(body.goal_year)
    .bind(body.goal_month)
    .bind(body.target_amount)
    .bind(body.bonus_commission_percent)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(goal))
}

/// List the tenant's sales goals, optionally narrowed to one user or year
#[utoipa::path(
    get,
    path = "/api/v1/sales-goals",
    params(GoalListQuery),
    responses((status = 200, description = "Goals", body = Vec<SalesGoal>)),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn list_sales_goals(
    ctx: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<GoalListQuery>,
) -> AppResult<Json<Vec<SalesGoal>>> {
    let goals = sqlx::query_as::<_, SalesGoal>(
        "SELECT * FROM sales_goals
         WHERE tenant_id = $1
           AND ($2::uuid IS NULL OR user_id = $2)
           AND ($3::int IS NULL OR goal_year = $3)
         ORDER BY goal_year DESC, goal_month DESC",
    )
    .bind(ctx.tenant_id)
    .bind(query.user_id)
    .bind(query.goal_year)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(goals))
}

/// Recompute and return a salesperson's scorecard for one month
#[utoipa::path(
    post,
    path = "/api/v1/performance/{user_id}/{year}/{month}",
    params(
        ("user_id" = Uuid, Path, description = "Salesperson user ID"),
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = i32, Path, description = "Month 1-12"),
    ),
    responses(
        (status = 200, description = "Scorecard", body = VendorPerformance),
        (status = 400, description = "Invalid month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn recompute_performance(
    ctx: TenantContext,
    State(state): State<AppState>,
    Path((user_id, year, month)): Path<(Uuid, i32, i32)>,
) -> AppResult<Json<VendorPerformance>> {
    let performance =
        services::performance::recompute(&state.db, &ctx, user_id, year, month).await?;
    Ok(Json(performance))
}
