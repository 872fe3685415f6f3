//! Property-based tests for the settlement engine.
//!
//! - Conservation
//! - Order independence
//! - Self-payer neutrality
//! - Transfer correctness
//! - Determinism

use acerto_shared::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::BalanceAccumulator;
use super::report::SettlementReportBuilder;
use super::types::SettlementPolicy;
use crate::expense::ExpenseRecord;

fn member(index: usize) -> AccountId {
    AccountId::from(format!("member{index}").as_str())
}

fn roster(size: usize) -> Vec<AccountId> {
    (0..size).map(member).collect()
}

/// Strategy to generate an expense paid by a roster member (0.01 to 10,000.00).
fn expense(members: usize) -> impl Strategy<Value = ExpenseRecord> {
    (
        1i64..1_000_000i64,
        0..members,
        prop::collection::btree_set(0..members, 1..=members),
    )
        .prop_map(|(cents, payer, participants)| {
            ExpenseRecord::new(
                Decimal::new(cents, 2),
                Some(member(payer)),
                participants.into_iter().map(member).collect(),
            )
            .unwrap()
        })
}

/// Strategy to generate a group size and its expense ledger.
fn ledger() -> impl Strategy<Value = (usize, Vec<ExpenseRecord>)> {
    (2usize..8).prop_flat_map(|members| {
        (
            Just(members),
            prop::collection::vec(expense(members), 0..25),
        )
    })
}

/// Strategy to generate a ledger together with a shuffled copy of it.
fn ledger_with_permutation()
-> impl Strategy<Value = (usize, Vec<ExpenseRecord>, Vec<ExpenseRecord>)> {
    ledger().prop_flat_map(|(members, records)| {
        let shuffled = Just(records.clone()).prop_shuffle();
        (Just(members), Just(records), shuffled)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Balances of a fully paid ledger sum to zero within a unit per account.
    #[test]
    fn prop_accumulated_balances_are_conserved((members, records) in ledger()) {
        let policy = SettlementPolicy::default();
        let balances = BalanceAccumulator::accumulate(&roster(members), &records, &policy);

        let bound = policy.unit() * Decimal::from(balances.len());
        prop_assert!(balances.total().abs() <= bound, "total {} exceeds {}", balances.total(), bound);
    }

    /// After cent correction the report balances sum to exactly zero.
    #[test]
    fn prop_report_balances_sum_to_zero((members, records) in ledger()) {
        let report = SettlementReportBuilder::default().build_from_records(&records, &roster(members));
        prop_assert_eq!(report.balances.total(), Decimal::ZERO);
        prop_assert!(report.warnings.is_empty());
    }

    /// Any permutation of the ledger yields the same balances.
    #[test]
    fn prop_accumulation_is_order_independent(
        (members, records, shuffled) in ledger_with_permutation(),
    ) {
        let policy = SettlementPolicy::default();
        let members = roster(members);

        prop_assert_eq!(
            BalanceAccumulator::accumulate(&members, &records, &policy),
            BalanceAccumulator::accumulate(&members, &shuffled, &policy)
        );

        let builder = SettlementReportBuilder::default();
        prop_assert_eq!(
            builder.build_from_records(&records, &members),
            builder.build_from_records(&shuffled, &members)
        );
    }

    /// Paying for yourself alone changes nothing.
    #[test]
    fn prop_self_payer_is_neutral(cents in 1i64..100_000_000i64, index in 0usize..5) {
        let payer = member(index);
        let record = ExpenseRecord::new(Decimal::new(cents, 2), Some(payer.clone()), vec![payer.clone()]).unwrap();

        let balances = BalanceAccumulator::accumulate(&roster(5), &[record], &SettlementPolicy::default());
        prop_assert_eq!(balances.get(&payer), Some(Decimal::ZERO));
        prop_assert_eq!(balances.total_abs(), Decimal::ZERO);
    }

    /// Applying every suggested transfer leaves each account within a unit of zero.
    #[test]
    fn prop_transfers_settle_every_account((members, records) in ledger()) {
        let report = SettlementReportBuilder::default().build_from_records(&records, &roster(members));
        let unit = SettlementPolicy::default().unit();

        let mut remaining = report.balances.clone();
        for transfer in &report.transfers {
            prop_assert!(transfer.amount > Decimal::ZERO);
            prop_assert_ne!(&transfer.from, &transfer.to);
            remaining.apply_transfer(transfer);
        }
        for (account, amount) in remaining.iter() {
            prop_assert!(amount.abs() <= unit, "{} left with {}", account, amount);
        }
    }

    /// Each reported balance stays within one unit of its exact value.
    #[test]
    fn prop_cent_correction_is_bounded((members, records) in ledger()) {
        let members = roster(members);
        let mut accumulator = BalanceAccumulator::new(&members);
        for record in &records {
            accumulator.apply(record).unwrap();
        }
        let exact = accumulator.exact_balances();
        let report = SettlementReportBuilder::default().build_from_records(&records, &members);

        for (account, amount) in report.balances.iter() {
            prop_assert!((amount - exact[account]).abs() < SettlementPolicy::default().unit());
        }
    }

    /// A group of n accounts never needs more than n - 1 transfers.
    #[test]
    fn prop_transfer_count_is_bounded((members, records) in ledger()) {
        let report = SettlementReportBuilder::default().build_from_records(&records, &roster(members));
        prop_assert!(report.transfers.len() < members.max(1));
    }

    /// Identical input produces identical output.
    #[test]
    fn prop_reports_are_deterministic((members, records) in ledger()) {
        let builder = SettlementReportBuilder::default();
        let members = roster(members);
        prop_assert_eq!(
            builder.build_from_records(&records, &members),
            builder.build_from_records(&records, &members)
        );
    }
}
