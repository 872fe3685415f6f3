//! Settlement report assembly.

use acerto_shared::AccountId;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::balance::BalanceAccumulator;
use super::matcher::TransferMatcher;
use super::rounding::BalanceRounding;
use super::types::{NetBalance, SettlementPolicy, SettlementReport, SettlementWarning};
use crate::expense::{ExpenseNormalizer, ExpenseRecord, StoredExpense};

/// Builds settlement reports for one group.
///
/// Runs normalization, accumulation, cent correction and matching, in that
/// order. Never fails: bad or overflowing expenses are skipped and reported
/// as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementReportBuilder {
    policy: SettlementPolicy,
}

impl SettlementReportBuilder {
    /// Creates a builder using `policy`.
    #[must_use]
    pub const fn new(policy: SettlementPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    #[must_use]
    pub const fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Builds a report from stored expenses and the current roster.
    ///
    /// Expenses that fail normalization, or that would overflow the group
    /// balances, are left out with a [`SettlementWarning::SkippedExpense`].
    #[must_use]
    pub fn build(&self, expenses: &[StoredExpense], roster: &[AccountId]) -> SettlementReport {
        let mut warnings = Vec::new();
        let mut accumulator = BalanceAccumulator::new(roster);

        for expense in expenses {
            let applied = ExpenseNormalizer::normalize(expense, roster)
                .and_then(|record| accumulator.apply(&record));
            if let Err(err) = applied {
                warn!(
                    expense_id = %expense.id,
                    group_id = %expense.group_id,
                    error = %err,
                    "Skipping expense in settlement"
                );
                warnings.push(SettlementWarning::SkippedExpense {
                    expense_id: expense.id,
                    reason: err.to_string(),
                });
            }
        }

        self.complete(&accumulator, warnings)
    }

    /// Builds a report from already-normalized records.
    ///
    /// Records that would overflow are left out with a
    /// [`SettlementWarning::SkippedRecord`] naming their position.
    #[must_use]
    pub fn build_from_records(
        &self,
        records: &[ExpenseRecord],
        roster: &[AccountId],
    ) -> SettlementReport {
        let mut warnings = Vec::new();
        let mut accumulator = BalanceAccumulator::new(roster);

        for (position, record) in records.iter().enumerate() {
            if let Err(err) = accumulator.apply(record) {
                warn!(position, error = %err, "Skipping record in settlement");
                warnings.push(SettlementWarning::SkippedRecord {
                    position,
                    reason: err.to_string(),
                });
            }
        }

        self.complete(&accumulator, warnings)
    }

    fn complete(
        &self,
        accumulator: &BalanceAccumulator,
        mut warnings: Vec<SettlementWarning>,
    ) -> SettlementReport {
        let balances = BalanceRounding::reconcile(&accumulator.exact_balances(), &self.policy);
        let mut report = self.assemble(balances);
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        report
    }

    /// Matches rounded balances and checks what is left over.
    #[must_use]
    pub fn assemble(&self, balances: NetBalance) -> SettlementReport {
        let outcome = TransferMatcher::settle(&balances, &self.policy);

        let accounts = balances.len().max(1);
        let tolerance = self.policy.residual_tolerance_per_account() * Decimal::from(accounts);
        let residual = outcome.residual();

        let mut warnings = Vec::new();
        if residual > tolerance {
            warn!(
                %residual,
                %tolerance,
                accounts = balances.len(),
                "Settlement leaves a residual imbalance"
            );
            warnings.push(SettlementWarning::ResidualImbalance {
                residual,
                tolerance,
            });
        }

        debug!(
            accounts = balances.len(),
            transfers = outcome.transfers.len(),
            "Settlement report assembled"
        );

        SettlementReport {
            currency: self.policy.currency(),
            balances,
            transfers: outcome.transfers,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::{ExpenseStatus, RawAmount, RawParticipants, SplitMode};
    use crate::settlement::Transfer;
    use acerto_shared::{Currency, ExpenseId, GroupId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn id(name: &str) -> AccountId {
        AccountId::from(name)
    }

    fn roster(names: &[&str]) -> Vec<AccountId> {
        names.iter().map(|n| id(n)).collect()
    }

    fn record(amount: Decimal, payer: &str, participants: &[&str]) -> ExpenseRecord {
        ExpenseRecord::new(amount, AccountId::parse(payer), roster(participants)).unwrap()
    }

    fn stored(amount: &str, payer: &str, split_mode: SplitMode, participants: &[&str]) -> StoredExpense {
        StoredExpense {
            id: ExpenseId::new(),
            group_id: GroupId::new(),
            description: "Shared".to_string(),
            amount: RawAmount::Text(amount.to_string()),
            payer: Some(payer.to_string()),
            participants: RawParticipants::List(participants.iter().map(|p| (*p).to_string()).collect()),
            split_mode,
            status: ExpenseStatus::Pending,
            created_by: id(payer),
            created_at: Utc::now(),
        }
    }

    fn transfer(from: &str, to: &str, amount: Decimal) -> Transfer {
        Transfer {
            from: id(from),
            to: id(to),
            amount,
        }
    }

    #[test]
    fn test_scenario_two_people_one_expense() {
        let report = SettlementReportBuilder::default().build_from_records(
            &[record(dec!(100), "alice", &["alice", "bob"])],
            &roster(&["alice", "bob"]),
        );

        assert_eq!(report.balances.get(&id("alice")), Some(dec!(50)));
        assert_eq!(report.balances.get(&id("bob")), Some(dec!(-50)));
        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(50))]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_scenario_three_people_two_expenses() {
        let report = SettlementReportBuilder::default().build_from_records(
            &[
                record(dec!(90), "alice", &["alice", "bob", "carol"]),
                record(dec!(30), "bob", &["bob", "carol"]),
            ],
            &roster(&["alice", "bob", "carol"]),
        );

        assert_eq!(report.balances.get(&id("alice")), Some(dec!(60)));
        assert_eq!(report.balances.get(&id("bob")), Some(Decimal::ZERO));
        assert_eq!(report.balances.get(&id("carol")), Some(dec!(-60)));
        assert_eq!(report.transfers, vec![transfer("carol", "alice", dec!(60))]);
    }

    #[test]
    fn test_scenario_empty_participants_never_reaches_accumulator() {
        let expense = stored("25", "alice", SplitMode::Selected, &[]);
        let report = SettlementReportBuilder::default().build(
            std::slice::from_ref(&expense),
            &roster(&["alice", "bob"]),
        );

        assert_eq!(
            report.warnings,
            vec![SettlementWarning::SkippedExpense {
                expense_id: expense.id,
                reason: "Expense must have at least one participant".to_string(),
            }]
        );
        assert!(report.is_settled());
        assert_eq!(report.balances.total_abs(), Decimal::ZERO);
    }

    #[test]
    fn test_scenario_triangular_debt_cancels_out() {
        // a owes b, b owes c, c owes a, 10 each.
        let report = SettlementReportBuilder::default().build_from_records(
            &[
                record(dec!(10), "b", &["a"]),
                record(dec!(10), "c", &["b"]),
                record(dec!(10), "a", &["c"]),
            ],
            &roster(&["a", "b", "c"]),
        );

        for (_, amount) in report.balances.iter() {
            assert_eq!(amount, Decimal::ZERO);
        }
        assert!(report.transfers.is_empty());
    }

    #[test]
    fn test_stored_expenses_resolve_split_modes() {
        let report = SettlementReportBuilder::default().build(
            &[
                stored("90", "alice", SplitMode::All, &[]),
                stored("30.00", "bob", SplitMode::Selected, &["bob", "carol"]),
            ],
            &roster(&["alice", "bob", "carol"]),
        );

        assert_eq!(report.transfers, vec![transfer("carol", "alice", dec!(60))]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_invalid_amount_is_skipped_not_counted() {
        let bad = stored("-15", "alice", SplitMode::All, &[]);
        let report = SettlementReportBuilder::default().build(
            &[bad.clone(), stored("20", "alice", SplitMode::All, &[])],
            &roster(&["alice", "bob"]),
        );

        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(10))]);
        assert!(matches!(
            report.warnings.as_slice(),
            [SettlementWarning::SkippedExpense { expense_id, .. }] if *expense_id == bad.id
        ));
    }

    #[test]
    fn test_uneven_split_is_cent_corrected() {
        let report = SettlementReportBuilder::default().build_from_records(
            &[record(dec!(100), "alice", &["alice", "bob", "carol"])],
            &roster(&["alice", "bob", "carol"]),
        );

        assert_eq!(report.balances.total(), Decimal::ZERO);
        assert_eq!(
            report.transfers,
            vec![
                transfer("bob", "alice", dec!(33.33)),
                transfer("carol", "alice", dec!(33.33)),
            ]
        );
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_payer_is_flagged_as_imbalance() {
        let report = SettlementReportBuilder::default().build_from_records(
            &[
                record(dec!(40), "alice", &["alice", "bob"]),
                record(dec!(30), "", &["alice", "bob"]),
            ],
            &roster(&["alice", "bob"]),
        );

        assert!(report.has_imbalance());
        // Balances are still reported: alice +5, bob -35.
        assert_eq!(report.balances.get(&id("alice")), Some(dec!(5)));
        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(5))]);
    }

    #[test]
    fn test_near_max_expenses_are_skipped_not_fatal() {
        let huge = "40000000000000000000000000000";
        let first = stored(huge, "alice", SplitMode::Selected, &["bob"]);
        let second = stored(huge, "alice", SplitMode::Selected, &["bob"]);
        let report = SettlementReportBuilder::default().build(
            &[first, second, stored("20", "alice", SplitMode::All, &[])],
            &roster(&["alice", "bob"]),
        );

        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(10))]);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().all(|w| matches!(
            w,
            SettlementWarning::SkippedExpense { reason, .. } if reason.starts_with("Invalid amount")
        )));
    }

    #[test]
    fn test_overflowing_record_is_skipped_by_position() {
        let report = SettlementReportBuilder::default().build_from_records(
            &[
                record(dec!(40), "alice", &["bob"]),
                record(Decimal::MAX, "alice", &["bob"]),
            ],
            &roster(&["alice", "bob"]),
        );

        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(40))]);
        assert!(matches!(
            report.warnings.as_slice(),
            [SettlementWarning::SkippedRecord { position: 1, .. }]
        ));
    }

    #[test]
    fn test_assemble_tolerates_small_residual() {
        let balances: NetBalance = [(id("alice"), dec!(10.01)), (id("bob"), dec!(-10))]
            .into_iter()
            .collect();
        let report = SettlementReportBuilder::default().assemble(balances);

        assert_eq!(report.transfers, vec![transfer("bob", "alice", dec!(10))]);
        assert!(!report.has_imbalance());
    }

    #[test]
    fn test_report_uses_policy_currency() {
        let builder = SettlementReportBuilder::new(SettlementPolicy::for_currency(Currency::Jpy));
        let report = builder.build_from_records(
            &[record(dec!(1000), "alice", &["alice", "bob", "carol"])],
            &roster(&["alice", "bob", "carol"]),
        );

        assert_eq!(report.currency, Currency::Jpy);
        assert_eq!(report.balances.total(), Decimal::ZERO);
        for transfer in &report.transfers {
            assert_eq!(transfer.amount, transfer.amount.round());
        }
    }

    #[test]
    fn test_repeated_builds_are_identical() {
        let records = vec![
            record(dec!(12.34), "carol", &["alice", "bob", "carol", "dave"]),
            record(dec!(99.99), "alice", &["bob", "dave"]),
            record(dec!(5), "bob", &["alice"]),
        ];
        let members = roster(&["alice", "bob", "carol", "dave"]);
        let builder = SettlementReportBuilder::default();

        assert_eq!(
            builder.build_from_records(&records, &members),
            builder.build_from_records(&records, &members)
        );
    }
}
