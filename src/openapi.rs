// src/openapi.rs

use crate::{
    domain::{
        commission::SourceKind,
        lifecycle::{CommissionStatus, PeriodStatus},
        payroll::ComponentKind,
        tax::{TaxBracket, TaxType},
    },
    models::{
        AttachCommissionsRequest, CloseBracketWindowRequest, Commission, CreateBracketRequest,
        CreatePeriodRequest, MarkPaidRequest, PayrollComponent, PayrollEntry, PayrollPeriod,
        PayrollResult, PayrollSlip, RecordCommissionRequest, RegisterSlipRequest, SalesGoal,
        SetSalesGoalRequest, UpsertEntryRequest, VendorPerformance,
    },
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Settlement Engine API",
        version = "1.0.0",
        description = "Payroll and sales-commission settlement engine for the \
            business-management platform. Covers date-versioned statutory tax \
            brackets, the payroll period lifecycle with immutable result \
            snapshots, commission recording from cost-price snapshots, and \
            vendor performance scorecards. All rows are tenant-scoped.",
        license(name = "MIT")
    ),
    paths(
        // Tax brackets
        crate::handlers::tax_bracket::create_bracket,
        crate::handlers::tax_bracket::list_brackets,
        crate::handlers::tax_bracket::close_bracket_window,
        // Payroll periods
        crate::handlers::period::create_period,
        crate::handlers::period::list_periods,
        crate::handlers::period::get_period,
        crate::handlers::period::upsert_entry,
        crate::handlers::period::list_entries,
        crate::handlers::period::delete_entry,
        crate::handlers::period::calculate_period,
        crate::handlers::period::approve_period,
        crate::handlers::period::mark_period_paid,
        // Payroll results
        crate::handlers::period::list_results,
        crate::handlers::period::list_results_by_employee,
        crate::handlers::period::list_components,
        crate::handlers::period::register_slip,
        crate::handlers::period::get_slip,
        // Commissions
        crate::handlers::commission::record_commission,
        crate::handlers::commission::list_commissions,
        crate::handlers::commission::get_commission,
        crate::handlers::commission::approve_commission,
        crate::handlers::commission::cancel_commission,
        crate::handlers::commission::attach_commissions,
        // Goals & performance
        crate::handlers::performance::set_sales_goal,
        crate::handlers::performance::list_sales_goals,
        crate::handlers::performance::recompute_performance,
    ),
    components(
        schemas(
            TaxType, TaxBracket, CreateBracketRequest, CloseBracketWindowRequest,
            PeriodStatus, PayrollPeriod, CreatePeriodRequest, MarkPaidRequest,
            PayrollEntry, UpsertEntryRequest,
            ComponentKind, PayrollResult, PayrollComponent,
            PayrollSlip, RegisterSlipRequest,
            SourceKind, CommissionStatus, Commission,
            RecordCommissionRequest, AttachCommissionsRequest,
            SalesGoal, SetSalesGoalRequest, VendorPerformance,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Tax Brackets", description = "Date-versioned statutory bracket tables"),
        (name = "Payroll Periods", description = "Create, calculate, approve and pay monthly periods"),
        (name = "Payroll Entries", description = "Per-employee manual adjustments for a draft period"),
        (name = "Payroll Results", description = "Immutable payslip snapshots, components and slip documents"),
        (name = "Commissions", description = "Record, review and settle sales and service commissions"),
        (name = "Performance", description = "Sales goals and vendor scorecards"),
    )
)]
pub struct ApiDoc;
