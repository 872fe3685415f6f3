//! Expense domain types.

use acerto_shared::{AccountId, ExpenseId, GroupId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ExpenseError;

/// How an expense's cost is divided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Equally among everyone on the roster when the report is generated.
    #[default]
    All,
    /// Equally among the explicitly stored participants.
    Selected,
}

/// Payment state of a stored expense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Still counts towards balances.
    #[default]
    Pending,
    /// Paid back outside the app.
    Paid,
}

/// Amount as it was stored: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    /// Numeric value.
    Number(serde_json::Number),
    /// Textual value, e.g. `"12.50"`.
    Text(String),
}

impl From<Decimal> for RawAmount {
    fn from(value: Decimal) -> Self {
        Self::Text(value.to_string())
    }
}

/// Participant list as it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawParticipants {
    /// Structured list of identifiers.
    List(Vec<String>),
    /// Serialized list: JSON array text or comma-separated identifiers.
    Encoded(String),
}

impl Default for RawParticipants {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// An expense as persisted by a storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExpense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Owning group.
    pub group_id: GroupId,
    /// Free-text description ("Dinner", "Groceries").
    pub description: String,
    /// Total amount paid.
    pub amount: RawAmount,
    /// Who fronted the money. Empty or missing means nobody is credited.
    #[serde(default)]
    pub payer: Option<String>,
    /// Stored participants, only consulted for [`SplitMode::Selected`].
    #[serde(default)]
    pub participants: RawParticipants,
    /// How the cost is divided.
    #[serde(default)]
    pub split_mode: SplitMode,
    /// Payment state.
    #[serde(default)]
    pub status: ExpenseStatus,
    /// Who logged the expense.
    pub created_by: AccountId,
    /// When the expense was logged.
    pub created_at: DateTime<Utc>,
}

/// Input for logging a new expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpenseInput {
    /// Target group.
    pub group_id: GroupId,
    /// Free-text description.
    pub description: String,
    /// Total amount paid.
    pub amount: RawAmount,
    /// Who fronted the money.
    #[serde(default)]
    pub payer: Option<String>,
    /// How the cost is divided.
    #[serde(default)]
    pub split_mode: SplitMode,
    /// Participants for [`SplitMode::Selected`].
    #[serde(default)]
    pub participants: RawParticipants,
}

/// The unit the settlement engine consumes.
///
/// Invariants: `amount > 0` and `participants` is non-empty. The payer does not
/// have to be a participant. Participants are taken as given; duplicates are
/// the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    amount: Decimal,
    payer: Option<AccountId>,
    participants: Vec<AccountId>,
}

impl ExpenseRecord {
    /// Creates a record, enforcing the amount and participant invariants.
    pub fn new(
        amount: Decimal,
        payer: Option<AccountId>,
        participants: Vec<AccountId>,
    ) -> Result<Self, ExpenseError> {
        if amount <= Decimal::ZERO {
            return Err(ExpenseError::InvalidAmount(amount.to_string()));
        }
        if participants.is_empty() {
            return Err(ExpenseError::EmptyParticipants);
        }

        Ok(Self {
            amount,
            payer,
            participants,
        })
    }

    /// Total amount of the expense.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Account credited with the full amount, if any.
    #[must_use]
    pub const fn payer(&self) -> Option<&AccountId> {
        self.payer.as_ref()
    }

    /// Accounts sharing the cost equally.
    #[must_use]
    pub fn participants(&self) -> &[AccountId] {
        &self.participants
    }

    /// Each participant's equal share, unrounded.
    #[must_use]
    pub fn share(&self) -> Decimal {
        self.amount / Decimal::from(self.participants.len())
    }
}
