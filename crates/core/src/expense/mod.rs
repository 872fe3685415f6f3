//! Expense records and their normalization.
//!
//! Stored expenses arrive in loosely typed shapes (amounts as numbers or
//! strings, participants as lists or encoded text). Normalization turns them
//! into [`ExpenseRecord`]s, the only shape the settlement engine accepts.

pub mod error;
pub mod normalize;
pub mod types;

pub use error::ExpenseError;
pub use normalize::{ExpenseNormalizer, MAX_EXPENSE_AMOUNT};
pub use types::{
    ExpenseRecord, ExpenseStatus, NewExpenseInput, RawAmount, RawParticipants, SplitMode,
    StoredExpense,
};
