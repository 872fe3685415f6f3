//! Activity log events.

use std::fmt;

use acerto_shared::{AccountId, GroupId, Money};
use chrono::{DateTime, Utc};

use super::types::ActivityEntry;

/// Something worth recording in a group's activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    /// The group was created.
    GroupCreated {
        /// Group name.
        name: String,
    },
    /// An account joined the roster.
    MemberJoined {
        /// The new member.
        member: AccountId,
    },
    /// An expense was logged.
    ExpenseAdded {
        /// Expense description.
        description: String,
        /// Parsed amount.
        amount: Money,
    },
    /// An expense was paid back outside the app.
    ExpenseMarkedPaid {
        /// Expense description.
        description: String,
    },
    /// An invite was sent.
    InviteCreated {
        /// Who was invited.
        invitee: AccountId,
    },
    /// An invite was accepted.
    InviteAccepted,
}

impl ActivityEvent {
    /// Stamps the event into a log entry.
    #[must_use]
    pub fn into_entry(self, group_id: GroupId, actor: AccountId, at: DateTime<Utc>) -> ActivityEntry {
        ActivityEntry {
            group_id,
            message: self.to_string(),
            actor,
            at,
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupCreated { name } => write!(f, "created the group \"{name}\""),
            Self::MemberJoined { member } => write!(f, "{member} joined the group"),
            Self::ExpenseAdded {
                description,
                amount,
            } => write!(f, "added \"{description}\" ({amount})"),
            Self::ExpenseMarkedPaid { description } => {
                write!(f, "marked \"{description}\" as paid")
            }
            Self::InviteCreated { invitee } => write!(f, "invited {invitee}"),
            Self::InviteAccepted => f.write_str("accepted an invite"),
        }
    }
}
