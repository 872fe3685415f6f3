//! Cent-level correction of rounded balances.
//!
//! Rounding each balance on its own can leave the table a few minor units off
//! its exact total (three people splitting 100 round to +66.67/-33.33/-33.33).
//! The drift is handed back with the Largest Remainder Method: the accounts
//! whose rounding moved them furthest in the drift's direction give back one
//! unit each. Every account stays within one unit of its exact balance.

use std::collections::BTreeMap;

use acerto_shared::AccountId;
use rust_decimal::prelude::*;

use super::types::{NetBalance, SettlementPolicy};

/// Rounds exact balances so that their total equals the rounded exact total.
pub struct BalanceRounding;

impl BalanceRounding {
    /// Rounds every balance and removes the rounding drift.
    ///
    /// For a conserved ledger the result sums to exactly zero. Ties between
    /// equally good candidates go to the lower account identifier.
    #[must_use]
    pub fn reconcile(
        exact: &BTreeMap<AccountId, Decimal>,
        policy: &SettlementPolicy,
    ) -> NetBalance {
        let unit = policy.unit();
        let mut rounded: BTreeMap<AccountId, Decimal> = exact
            .iter()
            .map(|(account, amount)| (account.clone(), policy.round(*amount)))
            .collect();

        let target = policy.round(exact.values().copied().sum());
        let drift: Decimal = rounded.values().copied().sum::<Decimal>() - target;
        let units = (drift / unit)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0);

        if units == 0 {
            return NetBalance::from(rounded);
        }

        // Rounding error per account: positive when rounding pushed it up.
        let mut candidates: Vec<(AccountId, Decimal)> = exact
            .iter()
            .map(|(account, amount)| {
                let error = rounded.get(account).copied().unwrap_or_default() - *amount;
                (account.clone(), error)
            })
            .collect();

        let step = if units > 0 {
            candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            -unit
        } else {
            candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            unit
        };

        let adjust = usize::try_from(units.unsigned_abs()).unwrap_or(usize::MAX);
        for (account, _) in candidates.into_iter().take(adjust) {
            if let Some(amount) = rounded.get_mut(&account) {
                *amount = policy.round(*amount + step);
            }
        }

        NetBalance::from(rounded)
    }
}
