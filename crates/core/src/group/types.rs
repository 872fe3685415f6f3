//! Group, invite and activity types.

use acerto_shared::{AccountId, Currency, GroupId, InviteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::expense::StoredExpense;

/// A group of people sharing expenses in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,
    /// Display name ("Beach house 2026").
    pub name: String,
    /// Currency every expense in the group is logged in.
    pub currency: Currency,
    /// Who created the group. Always the first member.
    pub created_by: AccountId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an invite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    /// Waiting for the invitee.
    #[default]
    Pending,
    /// Invitee joined the group.
    Accepted,
    /// Passed its expiry before being accepted.
    Expired,
}

/// A tokenized invitation for one account to join a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Invite ID.
    pub id: InviteId,
    /// Group being joined.
    pub group_id: GroupId,
    /// Account the invite is addressed to.
    pub invitee: AccountId,
    /// Opaque token handed to the invitee.
    pub token: String,
    /// Member who sent the invite.
    pub invited_by: AccountId,
    /// Current state.
    pub status: InviteStatus,
    /// When the invite was created.
    pub created_at: DateTime<Utc>,
    /// After this instant the invite can no longer be accepted.
    pub expires_at: DateTime<Utc>,
}

impl Invite {
    /// True once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// One line of a group's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Group the activity happened in.
    pub group_id: GroupId,
    /// Who did it.
    pub actor: AccountId,
    /// Human-readable description.
    pub message: String,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Roster and expenses read together, as of one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSnapshot {
    /// Current members.
    pub members: Vec<AccountId>,
    /// Every expense logged in the group.
    pub expenses: Vec<StoredExpense>,
}
