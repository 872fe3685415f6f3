//! Shared types, errors, and configuration for AcertÔ.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision
//! - Typed IDs and the opaque account identifier
//! - Application-wide error types
//! - Configuration management
//! - Tracing initialization
//! - Signed session tokens for resolving the calling account

pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{SessionError, SessionService};
pub use types::{AccountId, Currency, ExpenseId, GroupId, InviteId, Money};
