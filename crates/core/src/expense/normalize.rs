//! Normalization of stored expenses into engine records.

use std::collections::HashSet;
use std::str::FromStr;

use acerto_shared::AccountId;
use rust_decimal::Decimal;

use super::error::ExpenseError;
use super::types::{ExpenseRecord, RawAmount, RawParticipants, SplitMode, StoredExpense};

/// Largest amount a single expense may carry: one quadrillion currency units.
pub const MAX_EXPENSE_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Turns loosely typed stored expenses into [`ExpenseRecord`]s.
///
/// Pure: nothing here touches storage.
pub struct ExpenseNormalizer;

impl ExpenseNormalizer {
    /// Normalizes a stored expense against the group's current roster.
    ///
    /// [`SplitMode::All`] resolves to the roster as it is now, so members who
    /// joined after the expense was logged share it too.
    pub fn normalize(
        expense: &StoredExpense,
        roster: &[AccountId],
    ) -> Result<ExpenseRecord, ExpenseError> {
        Self::resolve(
            &expense.amount,
            expense.payer.as_deref(),
            expense.split_mode,
            &expense.participants,
            roster,
        )
    }

    /// Normalizes the individual fields of an expense.
    pub fn resolve(
        amount: &RawAmount,
        payer: Option<&str>,
        split_mode: SplitMode,
        participants: &RawParticipants,
        roster: &[AccountId],
    ) -> Result<ExpenseRecord, ExpenseError> {
        let amount = Self::parse_amount(amount)?;
        let participants = match split_mode {
            SplitMode::All => dedup(roster.iter().cloned()),
            SplitMode::Selected => Self::parse_participants(participants)?,
        };
        let payer = payer.and_then(AccountId::parse);

        ExpenseRecord::new(amount, payer, participants)
    }

    /// Parses an amount, rejecting anything that is not finite and positive
    /// or that exceeds [`MAX_EXPENSE_AMOUNT`].
    pub fn parse_amount(raw: &RawAmount) -> Result<Decimal, ExpenseError> {
        let text = match raw {
            RawAmount::Number(n) => n.to_string(),
            RawAmount::Text(s) => s.trim().to_string(),
        };

        let amount = Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| ExpenseError::InvalidAmount(text.clone()))?;

        if amount <= Decimal::ZERO || amount > MAX_EXPENSE_AMOUNT {
            return Err(ExpenseError::InvalidAmount(text));
        }
        Ok(amount.normalize())
    }

    /// Decodes a participant list into trimmed, deduplicated identifiers.
    ///
    /// Blank entries are dropped; the first occurrence of a duplicate wins.
    pub fn parse_participants(raw: &RawParticipants) -> Result<Vec<AccountId>, ExpenseError> {
        let names: Vec<String> = match raw {
            RawParticipants::List(names) => names.clone(),
            RawParticipants::Encoded(text) => {
                let text = text.trim();
                if text.starts_with('[') {
                    serde_json::from_str(text)
                        .map_err(|e| ExpenseError::MalformedParticipants(e.to_string()))?
                } else {
                    text.split(',').map(str::to_string).collect()
                }
            }
        };

        Ok(dedup(names.iter().filter_map(|name| AccountId::parse(name))))
    }
}

fn dedup(ids: impl IntoIterator<Item = AccountId>) -> Vec<AccountId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
