//! Expense validation errors.

use thiserror::Error;

/// Reasons an expense cannot take part in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpenseError {
    /// Amount is not a finite number greater than zero.
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// Nobody shares the cost.
    #[error("Expense must have at least one participant")]
    EmptyParticipants,

    /// Adding the expense would push a balance past the representable range.
    #[error("Expense amount {0} overflows the group balances")]
    BalanceOverflow(String),

    /// Encoded participant list could not be decoded.
    #[error("Malformed participant list: {0}")]
    MalformedParticipants(String),
}

impl From<ExpenseError> for acerto_shared::AppError {
    fn from(err: ExpenseError) -> Self {
        Self::Validation(err.to_string())
    }
}
