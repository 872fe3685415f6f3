//! Settlement data types.

use std::collections::BTreeMap;

use acerto_shared::{AccountId, Currency, ExpenseId};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Rounding and tolerance rules for one settlement run.
///
/// Derived from the group currency: balances are rounded to its minor unit,
/// anything at or below 0.9 of a unit counts as settled, and up to two units
/// of leftover per account is tolerated before a report is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementPolicy {
    currency: Currency,
    dust: Decimal,
    residual_tolerance_per_account: Decimal,
}

impl SettlementPolicy {
    /// Policy for `currency` with default tolerances (`0.009` / `0.02` for
    /// cent currencies).
    #[must_use]
    pub fn for_currency(currency: Currency) -> Self {
        let unit = currency.unit();
        Self {
            currency,
            dust: unit * Decimal::new(9, 1),
            residual_tolerance_per_account: unit * Decimal::TWO,
        }
    }

    /// Overrides the per-account residual tolerance. Negative values are clamped to zero.
    #[must_use]
    pub fn with_residual_tolerance(mut self, per_account: Decimal) -> Self {
        self.residual_tolerance_per_account = per_account.max(Decimal::ZERO);
        self
    }

    /// Currency the balances are expressed in.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Decimal places balances are rounded to.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.currency.minor_units()
    }

    /// Smallest currency step.
    #[must_use]
    pub fn unit(&self) -> Decimal {
        self.currency.unit()
    }

    /// Magnitude at or below which a balance counts as settled.
    #[must_use]
    pub const fn dust(&self) -> Decimal {
        self.dust
    }

    /// Leftover tolerated per account.
    #[must_use]
    pub const fn residual_tolerance_per_account(&self) -> Decimal {
        self.residual_tolerance_per_account
    }

    /// Rounds to the currency scale, half away from zero. Never yields `-0`.
    #[must_use]
    pub fn round(&self, value: Decimal) -> Decimal {
        let rounded =
            value.round_dp_with_strategy(self.scale(), RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_zero() {
            Decimal::ZERO
        } else {
            rounded
        }
    }
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self::for_currency(Currency::default())
    }
}

/// Net position per account: positive is owed money, negative owes money.
///
/// Always derived from the expense ledger, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBalance(BTreeMap<AccountId, Decimal>);

impl NetBalance {
    /// Creates an empty balance table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account`, if it appears in the table.
    #[must_use]
    pub fn get(&self, account: &AccountId) -> Option<Decimal> {
        self.0.get(account).copied()
    }

    /// Sets the balance of `account`.
    pub fn insert(&mut self, account: AccountId, amount: Decimal) {
        self.0.insert(account, amount);
    }

    /// Iterates accounts in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, Decimal)> {
        self.0.iter().map(|(account, amount)| (account, *amount))
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no account is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all balances. Zero for a conserved ledger.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// Sum of absolute balances.
    #[must_use]
    pub fn total_abs(&self) -> Decimal {
        self.0.values().map(|amount| amount.abs()).sum()
    }

    /// Applies a payment: the payer's debt and the payee's credit shrink.
    pub fn apply_transfer(&mut self, transfer: &Transfer) {
        *self.0.entry(transfer.from.clone()).or_default() += transfer.amount;
        *self.0.entry(transfer.to.clone()).or_default() -= transfer.amount;
    }
}

impl FromIterator<(AccountId, Decimal)> for NetBalance {
    fn from_iter<T: IntoIterator<Item = (AccountId, Decimal)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<AccountId, Decimal>> for NetBalance {
    fn from(map: BTreeMap<AccountId, Decimal>) -> Self {
        Self(map)
    }
}

/// Amount serialized as a JSON number in major currency units.
#[derive(Serialize)]
struct WireAmount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Serialize for NetBalance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (account, amount) in &self.0 {
            map.serialize_entry(account, &WireAmount(*amount))?;
        }
        map.end()
    }
}

/// A suggested payment from a debtor to a creditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Who pays.
    pub from: AccountId,
    /// Who receives.
    pub to: AccountId,
    /// Positive amount, rounded to the currency scale.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Non-fatal findings attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementWarning {
    /// A stored expense was left out because it failed normalization or
    /// would overflow the balances.
    SkippedExpense {
        /// The expense left out.
        expense_id: ExpenseId,
        /// Why it was rejected.
        reason: String,
    },
    /// A pre-normalized record was left out because it would overflow the balances.
    SkippedRecord {
        /// Index of the record in the input.
        position: usize,
        /// Why it was rejected.
        reason: String,
    },
    /// Balances left after the suggested transfers exceed the tolerance.
    ///
    /// Points at inconsistent upstream data (an expense without a payer, a
    /// roster that changed mid-read) rather than at the matcher.
    ResidualImbalance {
        /// Total absolute leftover across accounts.
        #[serde(with = "rust_decimal::serde::float")]
        residual: Decimal,
        /// Tolerance that was exceeded.
        #[serde(with = "rust_decimal::serde::float")]
        tolerance: Decimal,
    },
}

/// Caller-facing result of a settlement run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    /// Currency of every amount in the report.
    pub currency: Currency,
    /// Net balance per account, including accounts with no activity.
    ///
    /// Cent-corrected so the table sums to zero: an account may sit one
    /// minor unit away from its own half-away-from-zero rounding (100 split
    /// three ways reports the payer at 66.66, not 66.67).
    pub balances: NetBalance,
    /// Suggested payments, in matching order.
    pub transfers: Vec<Transfer>,
    /// Findings that did not stop the report.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SettlementWarning>,
}

impl SettlementReport {
    /// Returns true if nobody needs to pay anybody.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Returns true if the report carries a residual imbalance warning.
    #[must_use]
    pub fn has_imbalance(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, SettlementWarning::ResidualImbalance { .. }))
    }
}
