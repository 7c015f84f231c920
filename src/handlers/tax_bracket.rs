// src/handlers/tax_bracket.rs

//! Administrative configuration of the statutory bracket tables.
//!
//! Brackets are append-only: a statutory change closes the open window and
//! inserts fresh rows. They are platform-wide, not tenant-scoped, but every
//! operation still requires an authenticated caller.

use crate::{
    domain::tax::{BracketSet, TaxBracket, TaxType},
    errors::{AppError, AppResult},
    models::{CloseBracketWindowRequest, CreateBracketRequest},
    state::AppState,
    tenant::TenantContext,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BracketListQuery {
    pub tax_type: Option<TaxType>,
    /// When given, only the window effective on this date is returned and it
    /// is validated for contiguity.
    pub as_of: Option<NaiveDate>,
}

/// Insert a new bracket row
#[utoipa::path(
    post,
    path = "/api/v1/tax-brackets",
    request_body = CreateBracketRequest,
    responses(
        (status = 201, description = "Bracket created", body = TaxBracket),
        (status = 400, description = "Invalid bracket shape"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tax Brackets"
)]
pub async fn create_bracket(
    _ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<CreateBracketRequest>,
) -> AppResult<(StatusCode, Json<TaxBracket>)> {
    if body.rate < dec!(0) || body.rate > dec!(1) {
        return Err(AppError::Validation(
            "rate must be a fraction between 0 and 1".to_string(),
        ));
    }
    if body.range_start < dec!(0) {
        return Err(AppError::Validation(
            "range_start cannot be negative".to_string(),
        ));
    }
    if let Some(end) = body.range_end {
        if end <= body.range_start {
            return Err(AppError::Validation(
                "range_end must be greater than range_start".to_string(),
            ));
        }
    }
    if body.deduction < dec!(0) {
        return Err(AppError::Validation(
            "deduction cannot be negative".to_string(),
        ));
    }

    let bracket = sqlx::query_as::<_, TaxBracket>(
        "INSERT INTO tax_brackets (
            id, tax_type, range_start, range_end, rate, deduction,
            effective_from, effective_to, is_active, sort_order
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, true, $8)
        RETURNING id, tax_type, range_start, range_end, rate, deduction,
                  effective_from, effective_to, is_active, sort_order",
    )
    .bind(Uuid::new_v4())
    .bind(body.tax_type)
    .bind(body.range_start)
    .bind(body.range_end)
    .bind(body.rate)
    .bind(body.deduction)
    .bind(body.effective_from)
    .bind(body.sort_order)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(bracket)))
}

/// List bracket rows, optionally narrowed to one type and effective date
#[utoipa::path(
    get,
    path = "/api/v1/tax-brackets",
    params(BracketListQuery),
    responses((status = 200, description = "Bracket rows", body = Vec<TaxBracket>)),
    security(("bearer_auth" = [])),
    tag = "Tax Brackets"
)]
pub async fn list_brackets(
    _ctx: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<BracketListQuery>,
) -> AppResult<Json<Vec<TaxBracket>>> {
    let rows = sqlx::query_as::<_, TaxBracket>(
        "SELECT id, tax_type, range_start, range_end, rate, deduction,
                effective_from, effective_to, is_active, sort_order
         FROM tax_brackets
         WHERE ($1::tax_type IS NULL OR tax_type = $1)
         ORDER BY tax_type, effective_from, sort_order",
    )
    .bind(query.tax_type)
    .fetch_all(&state.db)
    .await?;

    match (query.tax_type, query.as_of) {
        (Some(tax_type), Some(as_of)) => {
            let set = BracketSet::for_date(rows, tax_type, as_of)?;
            Ok(Json(set.into_brackets()))
        }
        (None, Some(_)) => Err(AppError::Validation(
            "as_of requires tax_type to be given".to_string(),
        )),
        _ => Ok(Json(rows)),
    }
}

/// Close the open window of a tax type ahead of inserting replacement rows
#[utoipa::path(
    post,
    path = "/api/v1/tax-brackets/close-window",
    request_body = CloseBracketWindowRequest,
    responses((status = 200, description = "Number of rows closed")),
    security(("bearer_auth" = [])),
    tag = "Tax Brackets"
)]
pub async fn close_bracket_window(
    _ctx: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<CloseBracketWindowRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query(
        "UPDATE tax_brackets SET effective_to = $2
         WHERE tax_type = $1 AND effective_to IS NULL",
    )
    .bind(body.tax_type)
    .bind(body.effective_to)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "closed_rows": result.rows_affected() })))
}
