// src/routes/mod.rs

use crate::{
    handlers::{
        commission::{
            approve_commission, attach_commissions, cancel_commission, get_commission,
            list_commissions, record_commission,
        },
        performance::{list_sales_goals, recompute_performance, set_sales_goal},
        period::{
            approve_period, calculate_period, create_period, delete_entry, get_period, get_slip,
            list_entries, list_periods, list_results, list_results_by_employee, list_components,
            mark_period_paid, register_slip, upsert_entry,
        },
        tax_bracket::{close_bracket_window, create_bracket, list_brackets},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Tax Brackets ─────────────────────────────────────
        .route("/tax-brackets", post(create_bracket).get(list_brackets))
        .route("/tax-brackets/close-window", post(close_bracket_window))
        // ─── Payroll Periods ──────────────────────────────────
        .route("/payroll/periods", post(create_period).get(list_periods))
        .route("/payroll/periods/{period_id}", get(get_period))
        .route(
            "/payroll/periods/{period_id}/entries",
            put(upsert_entry).get(list_entries),
        )
        .route(
            "/payroll/periods/{period_id}/entries/{employee_id}",
            axum::routing::delete(delete_entry),
        )
        .route("/payroll/periods/{period_id}/calculate", post(calculate_period))
        .route("/payroll/periods/{period_id}/approve", post(approve_period))
        .route("/payroll/periods/{period_id}/pay", post(mark_period_paid))
        .route("/payroll/periods/{period_id}/results", get(list_results))
        // ─── Payroll Results ──────────────────────────────────
        .route(
            "/payroll/results/employee/{employee_id}",
            get(list_results_by_employee),
        )
        .route(
            "/payroll/results/{result_id}/components",
            get(list_components),
        )
        .route(
            "/payroll/results/{result_id}/slip",
            post(register_slip).get(get_slip),
        )
        // ─── Commissions ──────────────────────────────────────
        .route(
            "/commissions",
            post(record_commission).get(list_commissions),
        )
        .route("/commissions/attach", post(attach_commissions))
        .route("/commissions/{commission_id}", get(get_commission))
        .route(
            "/commissions/{commission_id}/approve",
            post(approve_commission),
        )
        .route(
            "/commissions/{commission_id}/cancel",
            post(cancel_commission),
        )
        // ─── Goals & Performance ──────────────────────────────
        .route("/sales-goals", put(set_sales_goal).get(list_sales_goals))
        .route(
            "/performance/{user_id}/{year}/{month}",
            post(recompute_performance),
        )
}
