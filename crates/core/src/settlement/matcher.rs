//! Greedy debtor/creditor matching.
//!
//! The largest debtor pays the largest creditor as much as both allow, then
//! whoever is settled drops out and the walk continues. This is not the
//! global transfer-count minimum in every case, but it reaches it when only a
//! few distinct balance magnitudes are involved, which is the common case.

use acerto_shared::AccountId;
use rust_decimal::Decimal;

use super::types::{NetBalance, SettlementPolicy, Transfer};

/// Result of matching a balance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Suggested payments, in the order they were matched.
    pub transfers: Vec<Transfer>,
    /// Balances left after every transfer is applied.
    pub remaining: NetBalance,
}

impl MatchOutcome {
    /// Total absolute leftover across all accounts.
    #[must_use]
    pub fn residual(&self) -> Decimal {
        self.remaining.total_abs()
    }
}

/// Turns net balances into a short list of transfers.
pub struct TransferMatcher;

impl TransferMatcher {
    /// Matches debtors to creditors, largest first.
    ///
    /// Accounts within the policy's dust of zero are already settled.
    /// Ordering ties fall back to the account identifier, so identical input
    /// always yields the identical transfer list.
    #[must_use]
    pub fn settle(balances: &NetBalance, policy: &SettlementPolicy) -> MatchOutcome {
        let dust = policy.dust();

        let mut creditors = Self::ranked(balances.iter().filter(|(_, amount)| *amount > dust));
        let mut debtors = Self::ranked(
            balances
                .iter()
                .filter(|(_, amount)| *amount < -dust)
                .map(|(account, amount)| (account, amount.abs())),
        );

        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < debtors.len() && j < creditors.len() {
            let pay = policy.round(debtors[i].1.min(creditors[j].1));

            if pay.is_zero() {
                // Both sides are above dust, so this only happens with a
                // dust below half a unit. Drop the pair rather than spin.
                i += 1;
                j += 1;
                continue;
            }

            transfers.push(Transfer {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount: pay,
            });
            debtors[i].1 -= pay;
            creditors[j].1 -= pay;

            if debtors[i].1 <= dust {
                i += 1;
            }
            if creditors[j].1 <= dust {
                j += 1;
            }
        }

        let mut remaining = balances.clone();
        for transfer in &transfers {
            remaining.apply_transfer(transfer);
        }

        MatchOutcome {
            transfers,
            remaining,
        }
    }

    /// Sorts by magnitude descending, then identifier ascending.
    fn ranked<'a>(
        entries: impl Iterator<Item = (&'a AccountId, Decimal)>,
    ) -> Vec<(AccountId, Decimal)> {
        let mut ranked: Vec<(AccountId, Decimal)> = entries
            .map(|(account, amount)| (account.clone(), amount))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balances(entries: &[(&str, Decimal)]) -> NetBalance {
        entries
            .iter()
            .map(|(name, amount)| (AccountId::from(*name), *amount))
            .collect()
    }

    fn transfer(from: &str, to: &str, amount: Decimal) -> Transfer {
        Transfer {
            from: AccountId::from(from),
            to: AccountId::from(to),
            amount,
        }
    }

    #[test]
    fn test_single_pair() {
        let outcome = TransferMatcher::settle(
            &balances(&[("alice", dec!(50)), ("bob", dec!(-50))]),
            &SettlementPolicy::default(),
        );

        assert_eq!(outcome.transfers, vec![transfer("bob", "alice", dec!(50))]);
        assert_eq!(outcome.residual(), Decimal::ZERO);
    }

    #[test]
    fn test_largest_debtor_pays_largest_creditor_first() {
        let outcome = TransferMatcher::settle(
            &balances(&[
                ("alice", dec!(70)),
                ("bob", dec!(30)),
                ("carol", dec!(-60)),
                ("dave", dec!(-40)),
            ]),
            &SettlementPolicy::default(),
        );

        assert_eq!(
            outcome.transfers,
            vec![
                transfer("carol", "alice", dec!(60)),
                transfer("dave", "alice", dec!(10)),
                transfer("dave", "bob", dec!(30)),
            ]
        );
        assert_eq!(outcome.residual(), Decimal::ZERO);
    }

    #[test]
    fn test_both_pointers_advance_on_exact_match() {
        let outcome = TransferMatcher::settle(
            &balances(&[
                ("alice", dec!(25)),
                ("bob", dec!(25)),
                ("carol", dec!(-25)),
                ("dave", dec!(-25)),
            ]),
            &SettlementPolicy::default(),
        );

        // Equal magnitudes rank by identifier.
        assert_eq!(
            outcome.transfers,
            vec![
                transfer("carol", "alice", dec!(25)),
                transfer("dave", "bob", dec!(25)),
            ]
        );
    }

    #[test]
    fn test_dust_balances_are_already_settled() {
        let outcome = TransferMatcher::settle(
            &balances(&[("alice", dec!(0.009)), ("bob", dec!(-0.009))]),
            &SettlementPolicy::default(),
        );

        assert!(outcome.transfers.is_empty());
    }

    #[test]
    fn test_one_cent_is_not_dust() {
        let outcome = TransferMatcher::settle(
            &balances(&[("alice", dec!(0.01)), ("bob", dec!(-0.01))]),
            &SettlementPolicy::default(),
        );

        assert_eq!(outcome.transfers, vec![transfer("bob", "alice", dec!(0.01))]);
    }

    #[test]
    fn test_all_zero_yields_nothing() {
        let outcome = TransferMatcher::settle(
            &balances(&[("alice", dec!(0)), ("bob", dec!(0))]),
            &SettlementPolicy::default(),
        );

        assert!(outcome.transfers.is_empty());
        assert_eq!(outcome.remaining.len(), 2);
    }

    #[test]
    fn test_unbalanced_input_leaves_residual() {
        let outcome = TransferMatcher::settle(
            &balances(&[("alice", dec!(10)), ("bob", dec!(-4))]),
            &SettlementPolicy::default(),
        );

        assert_eq!(outcome.transfers, vec![transfer("bob", "alice", dec!(4))]);
        assert_eq!(outcome.residual(), dec!(6));
        assert_eq!(outcome.remaining.get(&AccountId::from("alice")), Some(dec!(6)));
    }
}
