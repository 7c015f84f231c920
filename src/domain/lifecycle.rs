//! Central transition tables for the payroll period and commission
//! lifecycles. Every status change in the services layer goes through
//! `apply`, so an illegal edge cannot be reached from an alternate code path.

use crate::errors::{AppError, AppResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Payroll period ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "period_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Draft,
    Calculating,
    Calculated,
    Approved,
    Paid,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Draft => "draft",
            PeriodStatus::Calculating => "calculating",
            PeriodStatus::Calculated => "calculated",
            PeriodStatus::Approved => "approved",
            PeriodStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodAction {
    StartCalculation,
    FinishCalculation,
    Approve,
    MarkPaid,
}

impl PeriodAction {
    fn as_str(&self) -> &'static str {
        match self {
            PeriodAction::StartCalculation => "start calculation",
            PeriodAction::FinishCalculation => "finish calculation",
            PeriodAction::Approve => "approve",
            PeriodAction::MarkPaid => "mark paid",
        }
    }
}

impl PeriodStatus {
    /// The single transition table. `Calculated -> StartCalculation` is the
    /// recalculation edge; approval freezes the monetary snapshot, so no
    /// calculation action is legal from `Approved` on. `Paid` is terminal.
    pub fn apply(self, action: PeriodAction) -> AppResult<PeriodStatus> {
        use PeriodAction::*;
        use PeriodStatus::*;

        match (self, action) {
            (Draft, StartCalculation) => Ok(Calculating),
            (Calculated, StartCalculation) => Ok(Calculating),
            (Calculating, FinishCalculation) => Ok(Calculated),
            (Calculated, Approve) => Ok(Approved),
            (Approved, MarkPaid) => Ok(Paid),
            (status, action) => Err(AppError::InvalidState(format!(
                "cannot {} a payroll period in status '{}'",
                action.as_str(),
                status.as_str()
            ))),
        }
    }
}

impl PeriodStatus {
    /// Entries are mutable only while the period is still a draft; once a
    /// calculation has run, the stored results must keep agreeing with the
    /// entries that produced them.
    pub fn ensure_entries_mutable(self) -> AppResult<()> {
        if self == PeriodStatus::Draft {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "entries can only be edited while the period is in draft, not '{}'",
                self.as_str()
            )))
        }
    }

    /// Payment plan for the period: `None` when it is already paid (marking
    /// paid again is an idempotent no-op), otherwise the next status and the
    /// date to stamp onto the period and its unstamped results.
    pub fn plan_payment(
        self,
        requested_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<Option<(PeriodStatus, NaiveDate)>> {
        if self == PeriodStatus::Paid {
            return Ok(None);
        }
        let next = self.apply(PeriodAction::MarkPaid)?;
        Ok(Some((next, requested_date.unwrap_or(today))))
    }
}

/// A payment date that was already recorded wins over the one being stamped
/// now; only unset dates take the new value.
pub fn stamped_payment_date(existing: Option<NaiveDate>, payment_date: NaiveDate) -> NaiveDate {
    existing.unwrap_or(payment_date)
}

// ─── Commission ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionAction {
    Approve,
    Settle,
    Cancel,
}

impl CommissionStatus {
    /// `Settle` is reached only by attaching the commission to a paid payroll
    /// period. `Paid` and `Cancelled` are terminal.
    pub fn apply(self, action: CommissionAction) -> AppResult<CommissionStatus> {
        use CommissionAction::*;
        use CommissionStatus::*;

        match (self, action) {
            (Pending, Approve) => Ok(Approved),
            (Approved, Settle) => Ok(Paid),
            (Pending, Cancel) | (Approved, Cancel) => Ok(Cancelled),
            (status, _) => Err(AppError::InvalidState(format!(
                "commission in status '{}' cannot take that action",
                status.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_draft_to_paid() {
        let s = PeriodStatus::Draft;
        let s = s.apply(PeriodAction::StartCalculation).unwrap();
        assert_eq!(s, PeriodStatus::Calculating);
        let s = s.apply(PeriodAction::FinishCalculation).unwrap();
        assert_eq!(s, PeriodStatus::Calculated);
        let s = s.apply(PeriodAction::Approve).unwrap();
        assert_eq!(s, PeriodStatus::Approved);
        let s = s.apply(PeriodAction::MarkPaid).unwrap();
        assert_eq!(s, PeriodStatus::Paid);
    }

    #[test]
    fn recalculation_loops_from_calculated() {
        let s = PeriodStatus::Calculated
            .apply(PeriodAction::StartCalculation)
            .unwrap();
        assert_eq!(s, PeriodStatus::Calculating);
        assert_eq!(
            s.apply(PeriodAction::FinishCalculation).unwrap(),
            PeriodStatus::Calculated
        );
    }

    #[test]
    fn approval_freezes_recalculation() {
        let err = PeriodStatus::Approved
            .apply(PeriodAction::StartCalculation)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn paid_is_terminal() {
        for action in [
            PeriodAction::StartCalculation,
            PeriodAction::FinishCalculation,
            PeriodAction::Approve,
            PeriodAction::MarkPaid,
        ] {
            assert!(PeriodStatus::Paid.apply(action).is_err());
        }
    }

    #[test]
    fn draft_cannot_skip_ahead() {
        assert!(PeriodStatus::Draft.apply(PeriodAction::Approve).is_err());
        assert!(PeriodStatus::Draft.apply(PeriodAction::MarkPaid).is_err());
        assert!(
            PeriodStatus::Calculated
                .apply(PeriodAction::MarkPaid)
                .is_err()
        );
    }

    #[test]
    fn entries_freeze_once_the_period_leaves_draft() {
        assert!(PeriodStatus::Draft.ensure_entries_mutable().is_ok());
        for status in [
            PeriodStatus::Calculating,
            PeriodStatus::Calculated,
            PeriodStatus::Approved,
            PeriodStatus::Paid,
        ] {
            assert!(matches!(
                status.ensure_entries_mutable().unwrap_err(),
                AppError::InvalidState(_)
            ));
        }
    }

    #[test]
    fn marking_a_paid_period_again_is_a_no_op() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        assert_eq!(
            PeriodStatus::Paid.plan_payment(None, today).unwrap(),
            None
        );
        assert_eq!(
            PeriodStatus::Paid
                .plan_payment(Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()), today)
                .unwrap(),
            None
        );
    }

    #[test]
    fn payment_plan_settles_an_approved_period() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        let requested = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(
            PeriodStatus::Approved
                .plan_payment(Some(requested), today)
                .unwrap(),
            Some((PeriodStatus::Paid, requested))
        );
        // date defaults to today when the caller gives none
        assert_eq!(
            PeriodStatus::Approved.plan_payment(None, today).unwrap(),
            Some((PeriodStatus::Paid, today))
        );
    }

    #[test]
    fn payment_plan_rejects_unapproved_periods() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        for status in [
            PeriodStatus::Draft,
            PeriodStatus::Calculating,
            PeriodStatus::Calculated,
        ] {
            assert!(matches!(
                status.plan_payment(None, today).unwrap_err(),
                AppError::InvalidState(_)
            ));
        }
    }

    #[test]
    fn stamping_never_overwrites_a_recorded_payment_date() {
        let recorded = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let stamp = NaiveDate::from_ymd_opt(2025, 7, 5).unwrap();
        assert_eq!(stamped_payment_date(Some(recorded), stamp), recorded);
        assert_eq!(stamped_payment_date(None, stamp), stamp);
    }

    #[test]
    fn commission_lifecycle() {
        let s = CommissionStatus::Pending
            .apply(CommissionAction::Approve)
            .unwrap();
        assert_eq!(s, CommissionStatus::Approved);
        assert_eq!(
            s.apply(CommissionAction::Settle).unwrap(),
            CommissionStatus::Paid
        );
    }

    #[test]
    fn commission_cannot_settle_unapproved() {
        assert!(
            CommissionStatus::Pending
                .apply(CommissionAction::Settle)
                .is_err()
        );
    }

    #[test]
    fn commission_terminal_states() {
        for action in [
            CommissionAction::Approve,
            CommissionAction::Settle,
            CommissionAction::Cancel,
        ] {
            assert!(CommissionStatus::Paid.apply(action).is_err());
            assert!(CommissionStatus::Cancelled.apply(action).is_err());
        }
    }
}
