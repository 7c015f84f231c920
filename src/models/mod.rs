// src/models/mod.rs

use crate::domain::{
    commission::SourceKind,
    lifecycle::{CommissionStatus, PeriodStatus},
    payroll::ComponentKind,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Payroll Period ───────────────────────────────────────────────────────────

/// Monthly aggregate root. Unique per (tenant, year, month); owns the entries
/// and, once calculated, one result per employee. Totals are always the sum
/// of the owned results.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollPeriod {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reference_year: i32,
    pub reference_month: i32,
    pub status: PeriodStatus,
    pub calculation_date: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub payment_date: Option<NaiveDate>,
    pub total_gross: Decimal,
    pub total_net: Decimal,
    pub total_social_contribution: Decimal,
    pub total_income_withholding: Decimal,
    pub total_employer_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePeriodRequest {
    pub reference_year: i32,
    /// 1–12
    pub reference_month: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkPaidRequest {
    /// Defaults to today when omitted.
    pub payment_date: Option<NaiveDate>,
}

// ─── Payroll Entry ────────────────────────────────────────────────────────────

/// Per-employee manual adjustments, editable only while the period is Draft.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub payroll_period_id: Uuid,
    pub employee_id: Uuid,
    pub absence_days: i32,
    pub justified_absence_days: i32,
    pub overtime_hours: Decimal,
    pub lateness_hours: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertEntryRequest {
    pub employee_id: Uuid,
    #[serde(default)]
    pub absence_days: i32,
    #[serde(default)]
    pub justified_absence_days: i32,
    #[serde(default)]
    pub overtime_hours: Decimal,
    #[serde(default)]
    pub lateness_hours: Decimal,
    pub notes: Option<String>,
}

// ─── Payroll Result & Components ──────────────────────────────────────────────

/// Immutable payslip snapshot for one employee in one period. Recalculation
/// replaces the row wholesale; nothing patches it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollResult {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub payroll_period_id: Uuid,
    pub employee_id: Uuid,
    pub payroll_entry_id: Option<Uuid>,
    pub employee_name: String,
    pub employee_tax_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub dependents: i32,
    pub base_salary: Decimal,
    pub gross_amount: Decimal,
    pub total_deductions: Decimal,
    pub total_contributions: Decimal,
    pub net_amount: Decimal,
    pub social_contribution_amount: Decimal,
    pub income_withholding_amount: Decimal,
    pub additional_employer_cost: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// One ordered payslip line; the sequence reconstructs the slip line-by-line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollComponent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub payroll_result_id: Uuid,
    pub component_type: ComponentKind,
    pub code: String,
    pub description: String,
    pub amount: Decimal,
    pub base_amount: Option<Decimal>,
    pub reference_quantity: Option<Decimal>,
    pub impacts_fgts: bool,
    pub is_taxable: bool,
    pub sequence: i32,
}

/// Metadata of a generated payslip document; the file itself lives in the
/// platform's document store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollSlip {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub payroll_result_id: Uuid,
    pub file_path: String,
    pub content_hash: String,
    pub file_size: i64,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterSlipRequest {
    pub file_path: String,
    pub content_hash: String,
    pub file_size: i64,
}

// ─── Commissions ──────────────────────────────────────────────────────────────

/// Sales and service-order commissions share one shape; `source_kind` tells
/// them apart. Profit and percent are snapshots taken at line finalization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Commission {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub line_item_id: Uuid,
    pub product_id: Option<Uuid>,
    pub user_id: Uuid,
    pub sale_amount: Decimal,
    pub profit_amount: Decimal,
    pub commission_percent: Decimal,
    pub commission_amount: Decimal,
    pub flagged_for_review: bool,
    pub status: CommissionStatus,
    pub paid_date: Option<NaiveDate>,
    pub payroll_period_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordCommissionRequest {
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub line_item_id: Uuid,
    pub product_id: Option<Uuid>,
    /// The salesperson earning the commission.
    pub user_id: Uuid,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub commission_percent: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachCommissionsRequest {
    pub commission_ids: Vec<Uuid>,
    pub payroll_period_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CommissionListQuery {
    pub status: Option<CommissionStatus>,
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ─── Tax brackets (admin) ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBracketRequest {
    pub tax_type: crate::domain::tax::TaxType,
    pub range_start: Decimal,
    pub range_end: Option<Decimal>,
    /// Fraction, e.g. 0.15 for 15%.
    pub rate: Decimal,
    #[serde(default)]
    pub deduction: Decimal,
    pub effective_from: NaiveDate,
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseBracketWindowRequest {
    pub tax_type: crate::domain::tax::TaxType,
    /// Exclusive end date applied to every still-open row of the type.
    pub effective_to: NaiveDate,
}

// ─── Sales goals & vendor performance ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SalesGoal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub goal_year: i32,
    pub goal_month: i32,
    pub target_amount: Decimal,
    pub bonus_commission_percent: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetSalesGoalRequest {
    pub user_id: Uuid,
    pub goal_year: i32,
    pub goal_month: i32,
    pub target_amount: Decimal,
    #[serde(default)]
    pub bonus_commission_percent: Decimal,
}

/// Derived monthly scorecard; recomputed on demand, never a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VendorPerformance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub perf_year: i32,
    pub perf_month: i32,
    pub total_sales_count: i32,
    pub total_sales_amount: Decimal,
    pub total_profit_amount: Decimal,
    pub total_commission_earned: Decimal,
    pub total_commission_paid: Decimal,
    pub total_commission_pending: Decimal,
    pub bonus_commission_earned: Decimal,
    pub goal_target_amount: Option<Decimal>,
    pub goal_achievement_percent: Option<Decimal>,
    pub last_calculated_at: DateTime<Utc>,
}
