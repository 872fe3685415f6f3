//! Debt netting and settlement.
//!
//! Data flow for one group:
//! - expense records are folded into per-account net balances (`balance`)
//! - balances are rounded to the currency unit with the drift handed back
//!   (`rounding`)
//! - debtors are matched against creditors, largest first (`matcher`)
//! - everything is packaged as a [`SettlementReport`] (`report`)
//!
//! All of it is synchronous and pure.

pub mod balance;
pub mod matcher;
pub mod report;
pub mod rounding;
pub mod types;

#[cfg(test)]
mod props;

pub use balance::BalanceAccumulator;
pub use matcher::{MatchOutcome, TransferMatcher};
pub use report::SettlementReportBuilder;
pub use rounding::BalanceRounding;
pub use types::{NetBalance, SettlementPolicy, SettlementReport, SettlementWarning, Transfer};
