//! Net balance accumulation.
//!
//! Every expense credits its payer with the full amount and debits each
//! participant with an equal share. Postings are kept per account and summed
//! in a canonical order, so the result does not depend on the order in which
//! expenses arrive even where decimal precision runs out (`100 / 3`).
//!
//! The accumulator also tracks the absolute volume of everything posted. As
//! long as that volume fits in a `Decimal`, no partial sum over any subset of
//! postings can overflow, which keeps every later total safe.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use acerto_shared::AccountId;
use rust_decimal::Decimal;
use tracing::warn;

use super::types::{NetBalance, SettlementPolicy};
use crate::expense::{ExpenseError, ExpenseRecord};

/// Folds expense records into per-account net positions.
#[derive(Debug, Clone, Default)]
pub struct BalanceAccumulator {
    postings: BTreeMap<AccountId, Vec<Decimal>>,
    volume: Decimal,
}

impl BalanceAccumulator {
    /// Creates an accumulator seeded with a zero balance for every roster member.
    #[must_use]
    pub fn new(roster: &[AccountId]) -> Self {
        let postings = roster
            .iter()
            .map(|account| (account.clone(), Vec::new()))
            .collect();
        Self {
            postings,
            volume: Decimal::ZERO,
        }
    }

    /// Folds one expense in. Accounts outside the roster are added on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ExpenseError::BalanceOverflow`] and leaves the accumulator
    /// untouched if the record would take the posted volume past
    /// `Decimal::MAX`.
    pub fn apply(&mut self, record: &ExpenseRecord) -> Result<(), ExpenseError> {
        let share = record.share();
        let overflow = || ExpenseError::BalanceOverflow(record.amount().to_string());

        let credited = if record.payer().is_some() {
            record.amount()
        } else {
            Decimal::ZERO
        };
        let debited = share
            .checked_mul(Decimal::from(record.participants().len()))
            .ok_or_else(overflow)?;
        self.volume = credited
            .checked_add(debited)
            .and_then(|added| self.volume.checked_add(added))
            .ok_or_else(overflow)?;

        if let Some(payer) = record.payer() {
            self.post(payer, record.amount());
        }
        for participant in record.participants() {
            self.post(participant, -share);
        }
        Ok(())
    }

    fn post(&mut self, account: &AccountId, amount: Decimal) {
        self.postings.entry(account.clone()).or_default().push(amount);
    }

    /// Unrounded balance per account.
    #[must_use]
    pub fn exact_balances(&self) -> BTreeMap<AccountId, Decimal> {
        self.postings
            .iter()
            .map(|(account, postings)| (account.clone(), canonical_sum(postings)))
            .collect()
    }

    /// Balances rounded once, at the end, to the policy's currency scale.
    #[must_use]
    pub fn finish(&self, policy: &SettlementPolicy) -> NetBalance {
        self.exact_balances()
            .into_iter()
            .map(|(account, amount)| (account, policy.round(amount)))
            .collect()
    }

    /// Accumulates `records` over `roster` and rounds the result.
    ///
    /// Records that would overflow are left out with a warning.
    #[must_use]
    pub fn accumulate(
        roster: &[AccountId],
        records: &[ExpenseRecord],
        policy: &SettlementPolicy,
    ) -> NetBalance {
        let mut accumulator = Self::new(roster);
        for record in records {
            if let Err(err) = accumulator.apply(record) {
                warn!(error = %err, "Leaving record out of balances");
            }
        }
        accumulator.finish(policy)
    }
}

/// Sums postings in ascending order (value, then scale).
///
/// Saturates instead of panicking; the volume bound kept by `apply` means
/// it never has to.
fn canonical_sum(postings: &[Decimal]) -> Decimal {
    let mut sorted = postings.to_vec();
    sorted.sort_by(|a, b| match a.cmp(b) {
        Ordering::Equal => a.scale().cmp(&b.scale()),
        other => other,
    });
    sorted
        .into_iter()
        .fold(Decimal::ZERO, Decimal::saturating_add)
}
