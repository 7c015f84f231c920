//! Versioned progressive bracket tables and the tax resolver.
//!
//! A bracket row is never mutated in place: a statutory rate change closes
//! the old window (`effective_to`) and inserts fresh rows. The resolver works
//! on a `BracketSet` — the immutable set active for one `(tax type, date)` —
//! which is resolved once per calculation and passed by value into the
//! payroll calculator.

use crate::{
    domain::round_money,
    errors::{AppError, AppResult},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tax_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    SocialContribution,
    IncomeWithholding,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::SocialContribution => "social_contribution",
            TaxType::IncomeWithholding => "income_withholding",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TaxBracket {
    pub id: Uuid,
    pub tax_type: TaxType,
    pub range_start: Decimal,
    /// `None` = unbounded top bracket.
    pub range_end: Option<Decimal>,
    /// Marginal rate as a fraction, e.g. 0.15 for 15%.
    pub rate: Decimal,
    /// Closed-form constant: subtracting it from `income * rate` yields the
    /// correct cumulative amount without summing lower brackets.
    pub deduction: Decimal,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl TaxBracket {
    fn covers_date(&self, as_of: NaiveDate) -> bool {
        self.is_active
            && self.effective_from <= as_of
            && self.effective_to.map_or(true, |to| as_of < to)
    }

    fn covers_income(&self, income: Decimal) -> bool {
        self.range_start <= income && self.range_end.map_or(true, |end| income <= end)
    }
}

/// The active bracket set for one `(tax_type, as-of date)`, ordered by
/// `sort_order` ascending.
#[derive(Debug, Clone)]
pub struct BracketSet {
    pub tax_type: TaxType,
    pub as_of: NaiveDate,
    brackets: Vec<TaxBracket>,
}

impl BracketSet {
    /// Select the window covering `as_of` from raw bracket rows. An empty
    /// selection means the statutory table was never configured for that
    /// date — a configuration error, not a silent zero.
    pub fn for_date(rows: Vec<TaxBracket>, tax_type: TaxType, as_of: NaiveDate) -> AppResult<Self> {
        let mut brackets: Vec<TaxBracket> = rows
            .into_iter()
            .filter(|b| b.tax_type == tax_type && b.covers_date(as_of))
            .collect();

        if brackets.is_empty() {
            return Err(AppError::Configuration(format!(
                "no active {} brackets effective on {as_of}",
                tax_type.as_str()
            )));
        }

        brackets.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.range_start.cmp(&b.range_start))
        });

        let set = Self {
            tax_type,
            as_of,
            brackets,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn into_brackets(self) -> Vec<TaxBracket> {
        self.brackets
    }

    /// Ranges must be contiguous and non-overlapping within one window:
    /// each bracket starts one cent above the previous end, and only the
    /// last bracket may be unbounded.
    pub fn validate(&self) -> AppResult<()> {
        let cent = Decimal::new(1, 2);
        for pair in self.brackets.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let Some(end) = lower.range_end else {
                return Err(AppError::Configuration(format!(
                    "{} bracket starting at {} is unbounded but not last",
                    self.tax_type.as_str(),
                    lower.range_start
                )));
            };
            if upper.range_start != end + cent {
                return Err(AppError::Configuration(format!(
                    "{} brackets are not contiguous: {} ends at {} but next starts at {}",
                    self.tax_type.as_str(),
                    lower.range_start,
                    end,
                    upper.range_start
                )));
            }
        }
        Ok(())
    }

    /// `resolve(income) = max(0, income * rate - deduction)` against the
    /// single matching bracket: the one with the greatest `range_start` not
    /// exceeding income (ties broken by `sort_order`). Never sums across
    /// lower brackets — the `deduction` constant already compensates.
    pub fn resolve(&self, taxable_income: Decimal) -> AppResult<Decimal> {
        let bracket = self
            .brackets
            .iter()
            .filter(|b| b.covers_income(taxable_income))
            .max_by(|a, b| {
                a.range_start
                    .cmp(&b.range_start)
                    .then(b.sort_order.cmp(&a.sort_order))
            })
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "no {} bracket effective on {} covers income {taxable_income}",
                    self.tax_type.as_str(),
                    self.as_of
                ))
            })?;

        let withheld = taxable_income * bracket.rate - bracket.deduction;
        Ok(round_money(withheld.max(Decimal::ZERO)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

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

    fn withholding_2025() -> Vec<TaxBracket> {
        let t = TaxType::IncomeWithholding;
        vec![
            bracket(t, dec!(0.00), Some(dec!(2259.20)), dec!(0), dec!(0), 1),
            bracket(t, dec!(2259.21), Some(dec!(2826.65)), dec!(0.075), dec!(169.44), 2),
            bracket(t, dec!(2826.66), Some(dec!(3751.05)), dec!(0.15), dec!(381.44), 3),
            bracket(t, dec!(3751.06), Some(dec!(4664.68)), dec!(0.225), dec!(662.77), 4),
            bracket(t, dec!(4664.69), None, dec!(0.275), dec!(896.00), 5),
        ]
    }

    fn social_2025() -> Vec<TaxBracket> {
        let t = TaxType::SocialContribution;
        vec![
            bracket(t, dec!(0.00), Some(dec!(1412.00)), dec!(0.075), dec!(0), 1),
            bracket(t, dec!(1412.01), Some(dec!(2666.68)), dec!(0.09), dec!(0), 2),
            bracket(t, dec!(2666.69), Some(dec!(4000.03)), dec!(0.12), dec!(0), 3),
            bracket(t, dec!(4000.04), None, dec!(0.14), dec!(0), 4),
        ]
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn withholding_statutory_example() {
        let set = BracketSet::for_date(withholding_2025(), TaxType::IncomeWithholding, as_of())
            .unwrap();
        // 3000.00 * 0.15 - 381.44
        assert_eq!(set.resolve(dec!(3000.00)).unwrap(), dec!(68.56));
    }

    #[test]
    fn social_statutory_example() {
        let set =
            BracketSet::for_date(social_2025(), TaxType::SocialContribution, as_of()).unwrap();
        assert_eq!(set.resolve(dec!(1500.00)).unwrap(), dec!(135.00));
    }

    #[test]
    fn zero_rate_bottom_bracket_yields_zero() {
        let set = BracketSet::for_date(withholding_2025(), TaxType::IncomeWithholding, as_of())
            .unwrap();
        assert_eq!(set.resolve(dec!(0)).unwrap(), dec!(0));
        assert_eq!(set.resolve(dec!(2259.20)).unwrap(), dec!(0));
    }

    #[test]
    fn unbounded_top_bracket_covers_large_incomes() {
        let set = BracketSet::for_date(withholding_2025(), TaxType::IncomeWithholding, as_of())
            .unwrap();
        // 100000 * 0.275 - 896.00
        assert_eq!(set.resolve(dec!(100000.00)).unwrap(), dec!(26604.00));
    }

    #[test]
    fn resolver_is_deterministic() {
        let set =
            BracketSet::for_date(social_2025(), TaxType::SocialContribution, as_of()).unwrap();
        let first = set.resolve(dec!(3210.55)).unwrap();
        for _ in 0..10 {
            assert_eq!(set.resolve(dec!(3210.55)).unwrap(), first);
        }
    }

    #[test]
    fn resolver_covers_every_boundary() {
        let set =
            BracketSet::for_date(social_2025(), TaxType::SocialContribution, as_of()).unwrap();
        for income in [
            dec!(0),
            dec!(1412.00),
            dec!(1412.01),
            dec!(2666.68),
            dec!(2666.69),
            dec!(4000.03),
            dec!(4000.04),
        ] {
            assert!(set.resolve(income).is_ok(), "no bracket for {income}");
        }
    }

    #[test]
    fn negative_result_is_clamped_to_zero() {
        let t = TaxType::IncomeWithholding;
        let rows = vec![bracket(t, dec!(0), None, dec!(0.10), dec!(500.00), 1)];
        let set = BracketSet::for_date(rows, t, as_of()).unwrap();
        assert_eq!(set.resolve(dec!(100.00)).unwrap(), dec!(0));
    }

    #[test]
    fn missing_window_is_a_configuration_error() {
        let err = BracketSet::for_date(
            withholding_2025(),
            TaxType::IncomeWithholding,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn wrong_tax_type_is_a_configuration_error() {
        let err =
            BracketSet::for_date(social_2025(), TaxType::IncomeWithholding, as_of()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn income_below_lowest_range_start_is_a_configuration_error() {
        let t = TaxType::SocialContribution;
        let rows = vec![bracket(t, dec!(1000.00), None, dec!(0.10), dec!(0), 1)];
        let set = BracketSet::for_date(rows, t, as_of()).unwrap();
        assert!(matches!(
            set.resolve(dec!(500.00)).unwrap_err(),
            AppError::Configuration(_)
        ));
    }

    #[test]
    fn non_contiguous_ranges_are_rejected() {
        let t = TaxType::SocialContribution;
        let rows = vec![
            bracket(t, dec!(0), Some(dec!(1000.00)), dec!(0.05), dec!(0), 1),
            bracket(t, dec!(1200.00), None, dec!(0.10), dec!(0), 2),
        ];
        let err = BracketSet::for_date(rows, t, as_of()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn unbounded_bracket_in_the_middle_is_rejected() {
        let t = TaxType::SocialContribution;
        let rows = vec![
            bracket(t, dec!(0), None, dec!(0.05), dec!(0), 1),
            bracket(t, dec!(1000.01), None, dec!(0.10), dec!(0), 2),
        ];
        let err = BracketSet::for_date(rows, t, as_of()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn closed_window_rows_are_skipped_for_later_dates() {
        let t = TaxType::SocialContribution;
        let mut old = bracket(t, dec!(0), None, dec!(0.08), dec!(0), 1);
        old.effective_from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        old.effective_to = Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let new = bracket(t, dec!(0), None, dec!(0.09), dec!(0), 1);

        let set = BracketSet::for_date(vec![old.clone(), new], t, as_of()).unwrap();
        assert_eq!(set.resolve(dec!(1000.00)).unwrap(), dec!(90.00));

        // The old window still resolves for dates inside it
        let set = BracketSet::for_date(
            vec![old],
            t,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(set.resolve(dec!(1000.00)).unwrap(), dec!(80.00));
    }
}
