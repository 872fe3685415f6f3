//! In-memory storage backend for AcertÔ.
//!
//! Each group lives in one `DashMap` entry holding its roster, expenses,
//! invites and activity log, so a snapshot is read under a single entry
//! guard. Invite tokens are indexed separately for lookup across groups.

use std::sync::Arc;

use acerto_core::expense::{ExpenseStatus, StoredExpense};
use acerto_core::group::{
    ActivityEntry, Group, GroupRepository, GroupSnapshot, Invite, InviteStatus,
};
use acerto_shared::{AccountId, AppError, AppResult, ExpenseId, GroupId, InviteId};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

/// Error types for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Group not found.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Expense not found in the group.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    /// Invite not found in the group.
    #[error("Invite not found: {0}")]
    InviteNotFound(InviteId),

    /// A group with this ID already exists.
    #[error("Group already exists: {0}")]
    DuplicateGroup(GroupId),

    /// An expense with this ID already exists.
    #[error("Expense already exists: {0}")]
    DuplicateExpense(ExpenseId),

    /// Another invite already uses this token.
    #[error("Invite token already in use")]
    DuplicateInviteToken,

    /// The expense is no longer in the status the caller expected.
    #[error("Expense {0} is already {1:?}")]
    ExpenseStatusChanged(ExpenseId, ExpenseStatus),

    /// The invite is no longer in the status the caller expected.
    #[error("Invite {0} is already {1:?}")]
    InviteStatusChanged(InviteId, InviteStatus),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::GroupNotFound(_)
            | StoreError::ExpenseNotFound(_)
            | StoreError::InviteNotFound(_) => Self::NotFound(err.to_string()),
            StoreError::DuplicateGroup(_)
            | StoreError::DuplicateExpense(_)
            | StoreError::DuplicateInviteToken
            | StoreError::ExpenseStatusChanged(..)
            | StoreError::InviteStatusChanged(..) => Self::Conflict(err.to_string()),
        }
    }
}

/// Everything stored for one group.
#[derive(Debug, Clone)]
struct GroupState {
    group: Group,
    members: Vec<AccountId>,
    expenses: Vec<StoredExpense>,
    invites: Vec<Invite>,
    activity: Vec<ActivityEntry>,
}

struct Inner {
    groups: DashMap<GroupId, GroupState>,
    invite_tokens: DashMap<String, GroupId>,
}

/// Group repository kept entirely in memory.
///
/// Cheaply cloneable via `Arc`; all clones share the same data.
#[derive(Clone)]
pub struct InMemoryGroupStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGroupStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                groups: DashMap::new(),
                invite_tokens: DashMap::new(),
            }),
        }
    }

    /// Number of stored groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.inner.groups.len()
    }

    fn read<T>(&self, id: GroupId, f: impl FnOnce(&GroupState) -> T) -> Result<T, StoreError> {
        self.inner
            .groups
            .get(&id)
            .map(|state| f(state.value()))
            .ok_or(StoreError::GroupNotFound(id))
    }

    fn write<T>(
        &self,
        id: GroupId,
        f: impl FnOnce(&mut GroupState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .inner
            .groups
            .get_mut(&id)
            .ok_or(StoreError::GroupNotFound(id))?;
        f(state.value_mut())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupStore {
    async fn list_members(&self, group: GroupId) -> AppResult<Vec<AccountId>> {
        Ok(self.read(group, |s| s.members.clone())?)
    }

    async fn list_expenses(&self, group: GroupId) -> AppResult<Vec<StoredExpense>> {
        Ok(self.read(group, |s| s.expenses.clone())?)
    }

    async fn list_invites(&self, group: GroupId) -> AppResult<Vec<Invite>> {
        Ok(self.read(group, |s| s.invites.clone())?)
    }

    async fn snapshot(&self, group: GroupId) -> AppResult<GroupSnapshot> {
        Ok(self.read(group, |s| GroupSnapshot {
            members: s.members.clone(),
            expenses: s.expenses.clone(),
        })?)
    }

    async fn create_group(&self, group: Group) -> AppResult<()> {
        match self.inner.groups.entry(group.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateGroup(group.id).into()),
            Entry::Vacant(slot) => {
                debug!(group_id = %group.id, "Storing group");
                slot.insert(GroupState {
                    members: vec![group.created_by.clone()],
                    group,
                    expenses: Vec::new(),
                    invites: Vec::new(),
                    activity: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn find_group(&self, id: GroupId) -> AppResult<Option<Group>> {
        Ok(self.inner.groups.get(&id).map(|s| s.group.clone()))
    }

    async fn add_member(&self, group: GroupId, account: AccountId) -> AppResult<bool> {
        Ok(self.write(group, |s| {
            if s.members.contains(&account) {
                return Ok(false);
            }
            s.members.push(account);
            Ok(true)
        })?)
    }

    async fn insert_expense(&self, expense: StoredExpense) -> AppResult<()> {
        Ok(self.write(expense.group_id, |s| {
            if s.expenses.iter().any(|e| e.id == expense.id) {
                return Err(StoreError::DuplicateExpense(expense.id));
            }
            s.expenses.push(expense);
            Ok(())
        })?)
    }

    async fn set_expense_status(
        &self,
        group: GroupId,
        expense: ExpenseId,
        from: ExpenseStatus,
        to: ExpenseStatus,
    ) -> AppResult<StoredExpense> {
        Ok(self.write(group, |s| {
            let stored = s
                .expenses
                .iter_mut()
                .find(|e| e.id == expense)
                .ok_or(StoreError::ExpenseNotFound(expense))?;
            if stored.status != from {
                return Err(StoreError::ExpenseStatusChanged(expense, stored.status));
            }
            stored.status = to;
            Ok(stored.clone())
        })?)
    }

    async fn insert_invite(&self, invite: Invite) -> AppResult<()> {
        // Group guard first, then the token index; lookups never hold both.
        Ok(self.write(invite.group_id, |s| {
            match self.inner.invite_tokens.entry(invite.token.clone()) {
                Entry::Occupied(_) => return Err(StoreError::DuplicateInviteToken),
                Entry::Vacant(slot) => {
                    slot.insert(invite.group_id);
                }
            }
            s.invites.push(invite);
            Ok(())
        })?)
    }

    async fn find_invite_by_token(&self, token: &str) -> AppResult<Option<Invite>> {
        let Some(group) = self.inner.invite_tokens.get(token).map(|g| *g) else {
            return Ok(None);
        };
        Ok(self.read(group, |s| {
            s.invites.iter().find(|i| i.token == token).cloned()
        })?)
    }

    async fn set_invite_status(
        &self,
        group: GroupId,
        invite: InviteId,
        from: InviteStatus,
        to: InviteStatus,
    ) -> AppResult<Invite> {
        Ok(self.write(group, |s| {
            let stored = s
                .invites
                .iter_mut()
                .find(|i| i.id == invite)
                .ok_or(StoreError::InviteNotFound(invite))?;
            if stored.status != from {
                return Err(StoreError::InviteStatusChanged(invite, stored.status));
            }
            stored.status = to;
            Ok(stored.clone())
        })?)
    }

    async fn append_activity(&self, entry: ActivityEntry) -> AppResult<()> {
        Ok(self.write(entry.group_id, |s| {
            s.activity.push(entry);
            Ok(())
        })?)
    }

    async fn list_activity(&self, group: GroupId) -> AppResult<Vec<ActivityEntry>> {
        Ok(self.read(group, |s| s.activity.clone())?)
    }
}
