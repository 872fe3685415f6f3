//! Core business logic for AcertÔ.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the [`group::GroupRepository`] port.
//!
//! # Modules
//!
//! - `expense` - Expense types and normalization into engine records
//! - `settlement` - Net balances, cent correction and transfer matching
//! - `group` - Membership, invites, activity log and the group service

pub mod expense;
pub mod group;
pub mod settlement;
