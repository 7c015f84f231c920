//! Pure payroll calculator.
//!
//! Consumes employee compensation records, the period's manual entries and
//! the two resolved bracket sets; produces one immutable result per employee
//! plus its ordered payslip component lines. All identity fields are copied
//! into the result here — later edits to the employee record never alter a
//! historical payslip.

use crate::{
    domain::{round_money, tax::BracketSet},
    errors::{AppError, AppResult},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Statutory monthly divisor for the hourly wage.
const MONTHLY_HOURS: Decimal = dec!(220);
/// Divisor for one day of unjustified absence.
const MONTHLY_DAYS: Decimal = dec!(30);
/// Overtime premium.
const OVERTIME_FACTOR: Decimal = dec!(1.5);
/// Employer-side severance fund charge over fgts-impacting components.
const FGTS_RATE: Decimal = dec!(0.08);
/// Flat withholding-base allowance per dependent.
const DEPENDENT_ALLOWANCE: Decimal = dec!(189.59);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "component_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Earning,
    Deduction,
    Contribution,
}

/// Compensation/identity record consumed from the platform's HR surface.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmployeeProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub full_name: String,
    pub tax_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub dependents: i32,
    pub base_salary: Decimal,
}

/// The manual adjustments of one payroll entry, as the calculator sees them.
#[derive(Debug, Clone)]
pub struct EntryInput {
    pub id: Uuid,
    pub absence_days: i32,
    pub justified_absence_days: i32,
    pub overtime_hours: Decimal,
    pub lateness_hours: Decimal,
}

/// One payslip line, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLine {
    pub kind: ComponentKind,
    pub code: &'static str,
    pub description: String,
    pub amount: Decimal,
    pub base_amount: Option<Decimal>,
    pub reference_quantity: Option<Decimal>,
    pub impacts_fgts: bool,
    pub is_taxable: bool,
    pub sequence: i32,
}

/// Everything the services layer persists as one `payroll_results` row.
#[derive(Debug, Clone)]
pub struct CalculatedResult {
    pub employee: EmployeeProfile,
    pub entry_id: Option<Uuid>,
    pub gross_amount: Decimal,
    pub total_deductions: Decimal,
    pub total_contributions: Decimal,
    pub net_amount: Decimal,
    pub social_contribution_amount: Decimal,
    pub income_withholding_amount: Decimal,
    pub additional_employer_cost: Decimal,
    pub components: Vec<ComponentLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub gross: Decimal,
    pub net: Decimal,
    pub social_contribution: Decimal,
    pub income_withholding: Decimal,
    pub employer_cost: Decimal,
}

fn sum_components(components: &[ComponentLine], kind: ComponentKind, taxable_only: bool) -> Decimal {
    components
        .iter()
        .filter(|c| c.kind == kind && (!taxable_only || c.is_taxable))
        .map(|c| c.amount)
        .sum()
}

fn validate_entry(entry: &EntryInput) -> AppResult<()> {
    if entry.absence_days < 0 || entry.justified_absence_days < 0 {
        return Err(AppError::Validation(format!(
            "entry {}: absence days cannot be negative",
            entry.id
        )));
    }
    if entry.justified_absence_days > entry.absence_days {
        return Err(AppError::Validation(format!(
            "entry {}: justified absence days exceed total absence days",
            entry.id
        )));
    }
    if entry.overtime_hours < Decimal::ZERO || entry.lateness_hours < Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "entry {}: hours cannot be negative",
            entry.id
        )));
    }
    Ok(())
}

/// Calculate one employee's payslip. Pure; every monetary line is rounded
/// half-up to cents as it is created, and all totals derive from the rounded
/// lines so the stored components always reconcile with the stored totals.
pub fn calculate_employee(
    profile: &EmployeeProfile,
    entry: Option<&EntryInput>,
    social_set: &BracketSet,
    withholding_set: &BracketSet,
) -> AppResult<CalculatedResult> {
    if profile.base_salary <= Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "employee {} has no positive base salary",
            profile.id
        )));
    }
    if let Some(entry) = entry {
        validate_entry(entry)?;
    }

    let base = round_money(profile.base_salary);
    let hourly_rate = base / MONTHLY_HOURS;
    let daily_rate = base / MONTHLY_DAYS;

    let mut components: Vec<ComponentLine> = Vec::new();
    let mut sequence = 0;
    let mut push = |components: &mut Vec<ComponentLine>, line: ComponentLine| {
        sequence += 1;
        components.push(ComponentLine { sequence, ..line });
    };

    // Earnings first
    push(
        &mut components,
        ComponentLine {
            kind: ComponentKind::Earning,
            code: "BASE_SALARY",
            description: "Base salary".to_string(),
            amount: base,
            base_amount: None,
            reference_quantity: None,
            impacts_fgts: true,
            is_taxable: true,
            sequence: 0,
        },
    );

    if let Some(entry) = entry {
        if entry.overtime_hours > Decimal::ZERO {
            push(
                &mut components,
                ComponentLine {
                    kind: ComponentKind::Earning,
                    code: "OVERTIME",
                    description: format!("Overtime ({}h at 50% premium)", entry.overtime_hours),
                    amount: round_money(entry.overtime_hours * hourly_rate * OVERTIME_FACTOR),
                    base_amount: Some(round_money(hourly_rate)),
                    reference_quantity: Some(entry.overtime_hours),
                    impacts_fgts: true,
                    is_taxable: true,
                    sequence: 0,
                },
            );
        }

        // Then deductions
        let unjustified = entry.absence_days - entry.justified_absence_days;
        if unjustified > 0 {
            push(
                &mut components,
                ComponentLine {
                    kind: ComponentKind::Deduction,
                    code: "UNJUSTIFIED_ABSENCE",
                    description: format!("Unjustified absence ({unjustified} days)"),
                    amount: round_money(Decimal::from(unjustified) * daily_rate),
                    base_amount: Some(round_money(daily_rate)),
                    reference_quantity: Some(Decimal::from(unjustified)),
                    impacts_fgts: true,
                    is_taxable: true,
                    sequence: 0,
                },
            );
        }
        if entry.lateness_hours > Decimal::ZERO {
            push(
                &mut components,
                ComponentLine {
                    kind: ComponentKind::Deduction,
                    code: "LATENESS",
                    description: format!("Lateness ({}h)", entry.lateness_hours),
                    amount: round_money(entry.lateness_hours * hourly_rate),
                    base_amount: Some(round_money(hourly_rate)),
                    reference_quantity: Some(entry.lateness_hours),
                    impacts_fgts: true,
                    is_taxable: true,
                    sequence: 0,
                },
            );
        }
    }

    let gross = sum_components(&components, ComponentKind::Earning, false);
    let taxable_base = sum_components(&components, ComponentKind::Earning, true)
        - sum_components(&components, ComponentKind::Deduction, true);

    // Contributions last: social first, then income withholding on the base
    // net of the social contribution and the dependent allowance.
    let social = social_set.resolve(taxable_base)?;
    push(
        &mut components,
        ComponentLine {
            kind: ComponentKind::Contribution,
            code: "SOCIAL_CONTRIBUTION",
            description: "Social security contribution".to_string(),
            amount: social,
            base_amount: Some(taxable_base),
            reference_quantity: None,
            impacts_fgts: false,
            is_taxable: false,
            sequence: 0,
        },
    );

    let withholding_base = (taxable_base
        - social
        - Decimal::from(profile.dependents) * DEPENDENT_ALLOWANCE)
        .max(Decimal::ZERO);
    let withholding = withholding_set.resolve(withholding_base)?;
    push(
        &mut components,
        ComponentLine {
            kind: ComponentKind::Contribution,
            code: "INCOME_WITHHOLDING",
            description: "Income tax withholding".to_string(),
            amount: withholding,
            base_amount: Some(withholding_base),
            reference_quantity: None,
            impacts_fgts: false,
            is_taxable: false,
            sequence: 0,
        },
    );

    let total_deductions = sum_components(&components, ComponentKind::Deduction, false);
    let total_contributions = social + withholding;
    let net = gross - total_deductions - total_contributions;

    let fgts_base: Decimal = components
        .iter()
        .filter(|c| c.impacts_fgts)
        .map(|c| match c.kind {
            ComponentKind::Earning => c.amount,
            _ => -c.amount,
        })
        .sum();
    let additional_employer_cost = round_money(fgts_base * FGTS_RATE);

    Ok(CalculatedResult {
        employee: profile.clone(),
        entry_id: entry.map(|e| e.id),
        gross_amount: gross,
        total_deductions,
        total_contributions,
        net_amount: net,
        social_contribution_amount: social,
        income_withholding_amount: withholding,
        additional_employer_cost,
        components,
    })
}

/// Calculate the whole period: exactly one result per eligible employee, plus
/// the period totals as the sum of the per-employee results. Any failure
/// discards everything — the caller commits all results or none.
pub fn calculate_period(
    inputs: &[(EmployeeProfile, Option<EntryInput>)],
    social_set: &BracketSet,
    withholding_set: &BracketSet,
) -> AppResult<(Vec<CalculatedResult>, PeriodTotals)> {
    if inputs.is_empty() {
        return Err(AppError::Configuration(
            "period has no eligible employees".to_string(),
        ));
    }

    let mut results = Vec::with_capacity(inputs.len());
    let mut totals = PeriodTotals::default();

    for (profile, entry) in inputs {
        let result = calculate_employee(profile, entry.as_ref(), social_set, withholding_set)?;
        totals.gross += result.gross_amount;
        totals.net += result.net_amount;
        totals.social_contribution += result.social_contribution_amount;
        totals.income_withholding += result.income_withholding_amount;
        totals.employer_cost += result.gross_amount + result.additional_employer_cost;
        results.push(result);
    }

    Ok((results, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tax::{BracketSet, TaxBracket, TaxType};
    use chrono::NaiveDate;

    fn bracket(
        tax_type: TaxType,
        start: Decimal,
        end: Option<Decimal>,
        rate: Decimal,
        deduction: Decimal,
        sort_order: i32,
    ) -> TaxBracket {
        TaxBracket {
            id: Uuid::new_v4(),
            tax_type,
            range_start: start,
            range_end: end,
            rate,
            deduction,
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_to: None,
            is_active: true,
            sort_order,
        }
    }

    fn sets() -> (BracketSet, BracketSet) {
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let s = TaxType::SocialContribution;
        let social = BracketSet::for_date(
            vec![
                bracket(s, dec!(0.00), Some(dec!(1412.00)), dec!(0.075), dec!(0), 1),
                bracket(s, dec!(1412.01), Some(dec!(2666.68)), dec!(0.09), dec!(0), 2),
                bracket(s, dec!(2666.69), Some(dec!(4000.03)), dec!(0.12), dec!(0), 3),
                bracket(s, dec!(4000.04), None, dec!(0.14), dec!(0), 4),
            ],
            s,
            as_of,
        )
        .unwrap();

        let w = TaxType::IncomeWithholding;
        let withholding = BracketSet::for_date(
            vec![
                bracket(w, dec!(0.00), Some(dec!(2259.20)), dec!(0), dec!(0), 1),
                bracket(w, dec!(2259.21), Some(dec!(2826.65)), dec!(0.075), dec!(169.44), 2),
                bracket(w, dec!(2826.66), Some(dec!(3751.05)), dec!(0.15), dec!(381.44), 3),
                bracket(w, dec!(3751.06), Some(dec!(4664.68)), dec!(0.225), dec!(662.77), 4),
                bracket(w, dec!(4664.69), None, dec!(0.275), dec!(896.00), 5),
            ],
            w,
            as_of,
        )
        .unwrap();

        (social, withholding)
    }

    fn profile(base: Decimal, dependents: i32) -> EmployeeProfile {
        EmployeeProfile {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            full_name: "Ana Souza".to_string(),
            tax_id: "123.456.789-00".to_string(),
            department: Some("Sales".to_string()),
            position: Some("Account Executive".to_string()),
            bank_name: Some("Banco Azul".to_string()),
            bank_account: Some("0001-12345-6".to_string()),
            dependents,
            base_salary: base,
        }
    }

    #[test]
    fn plain_salary_with_dependent() {
        let (social, withholding) = sets();
        let result =
            calculate_employee(&profile(dec!(2000.00), 1), None, &social, &withholding).unwrap();

        assert_eq!(result.gross_amount, dec!(2000.00));
        assert_eq!(result.social_contribution_amount, dec!(180.00));
        // 2000 - 180 - 189.59 = 1630.41 falls in the zero-rate bracket
        assert_eq!(result.income_withholding_amount, dec!(0.00));
        assert_eq!(result.net_amount, dec!(1820.00));
        assert_eq!(result.additional_employer_cost, dec!(160.00));
        // base salary + two contribution lines
        assert_eq!(result.components.len(), 3);
    }

    #[test]
    fn full_adjustment_worked_example() {
        let (social, withholding) = sets();
        let entry = EntryInput {
            id: Uuid::new_v4(),
            absence_days: 2,
            justified_absence_days: 1,
            overtime_hours: dec!(10),
            lateness_hours: dec!(2),
        };
        let result = calculate_employee(
            &profile(dec!(3000.00), 0),
            Some(&entry),
            &social,
            &withholding,
        )
        .unwrap();

        // overtime: 10 * (3000/220) * 1.5 = 204.55
        assert_eq!(result.gross_amount, dec!(3204.55));
        // absence: 1 unjustified day * 100.00; lateness: 2 * 13.64 = 27.27
        assert_eq!(result.total_deductions, dec!(127.27));
        // taxable base 3077.28 at 12%
        assert_eq!(result.social_contribution_amount, dec!(369.27));
        // withholding base 2708.01 -> 7.5% bracket
        assert_eq!(result.income_withholding_amount, dec!(33.66));
        assert_eq!(result.net_amount, dec!(2674.35));
        // fgts base 3077.28 at 8%
        assert_eq!(result.additional_employer_cost, dec!(246.18));
        assert_eq!(result.entry_id, Some(entry.id));
    }

    #[test]
    fn components_are_ordered_earnings_deductions_contributions() {
        let (social, withholding) = sets();
        let entry = EntryInput {
            id: Uuid::new_v4(),
            absence_days: 1,
            justified_absence_days: 0,
            overtime_hours: dec!(5),
            lateness_hours: dec!(1),
        };
        let result = calculate_employee(
            &profile(dec!(3000.00), 0),
            Some(&entry),
            &social,
            &withholding,
        )
        .unwrap();

        let kinds: Vec<ComponentKind> = result.components.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::Earning,
                ComponentKind::Earning,
                ComponentKind::Deduction,
                ComponentKind::Deduction,
                ComponentKind::Contribution,
                ComponentKind::Contribution,
            ]
        );
        let sequences: Vec<i32> = result.components.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn justified_absences_are_not_deducted() {
        let (social, withholding) = sets();
        let entry = EntryInput {
            id: Uuid::new_v4(),
            absence_days: 3,
            justified_absence_days: 3,
            overtime_hours: dec!(0),
            lateness_hours: dec!(0),
        };
        let result = calculate_employee(
            &profile(dec!(2000.00), 0),
            Some(&entry),
            &social,
            &withholding,
        )
        .unwrap();
        assert_eq!(result.total_deductions, dec!(0.00));
    }

    #[test]
    fn negative_hours_are_rejected_before_computation() {
        let (social, withholding) = sets();
        let entry = EntryInput {
            id: Uuid::new_v4(),
            absence_days: 0,
            justified_absence_days: 0,
            overtime_hours: dec!(-1),
            lateness_hours: dec!(0),
        };
        let err = calculate_employee(
            &profile(dec!(2000.00), 0),
            Some(&entry),
            &social,
            &withholding,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn justified_days_exceeding_absences_are_rejected() {
        let (social, withholding) = sets();
        let entry = EntryInput {
            id: Uuid::new_v4(),
            absence_days: 1,
            justified_absence_days: 2,
            overtime_hours: dec!(0),
            lateness_hours: dec!(0),
        };
        assert!(
            calculate_employee(
                &profile(dec!(2000.00), 0),
                Some(&entry),
                &social,
                &withholding,
            )
            .is_err()
        );
    }

    #[test]
    fn period_produces_one_result_per_employee_and_summed_totals() {
        let (social, withholding) = sets();
        let inputs = vec![
            (profile(dec!(2000.00), 1), None),
            (profile(dec!(2000.00), 1), None),
            (profile(dec!(2000.00), 1), None),
        ];
        let (results, totals) = calculate_period(&inputs, &social, &withholding).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(totals.gross, dec!(6000.00));
        assert_eq!(totals.net, dec!(5460.00));
        assert_eq!(totals.social_contribution, dec!(540.00));
        assert_eq!(totals.income_withholding, dec!(0.00));
        assert_eq!(totals.employer_cost, dec!(6480.00));

        let summed: Decimal = results.iter().map(|r| r.net_amount).sum();
        assert_eq!(totals.net, summed);
    }

    #[test]
    fn empty_period_is_a_configuration_error() {
        let (social, withholding) = sets();
        let err = calculate_period(&[], &social, &withholding).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn result_snapshots_identity_at_calculation_time() {
        let (social, withholding) = sets();
        let mut p = profile(dec!(2000.00), 0);
        let result = calculate_employee(&p, None, &social, &withholding).unwrap();

        p.full_name = "Renamed Later".to_string();
        p.base_salary = dec!(9999.00);

        assert_eq!(result.employee.full_name, "Ana Souza");
        assert_eq!(result.employee.base_salary, dec!(2000.00));
    }
}
