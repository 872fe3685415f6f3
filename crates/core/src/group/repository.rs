//! Persistence port for groups.

use acerto_shared::{AccountId, AppResult, ExpenseId, GroupId, InviteId};
use async_trait::async_trait;

use super::types::{ActivityEntry, Group, GroupSnapshot, Invite, InviteStatus};
use crate::expense::{ExpenseStatus, StoredExpense};

/// Storage for groups, rosters, expenses, invites and activity.
///
/// Implemented by storage backends. Every method that takes a group ID
/// returns [`acerto_shared::AppError::NotFound`] when the group does not exist.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Current roster, in join order.
    async fn list_members(&self, group: GroupId) -> AppResult<Vec<AccountId>>;

    /// Every expense in the group, in insertion order.
    async fn list_expenses(&self, group: GroupId) -> AppResult<Vec<StoredExpense>>;

    /// Every invite ever sent for the group.
    async fn list_invites(&self, group: GroupId) -> AppResult<Vec<Invite>>;

    /// Roster and expenses as of one instant.
    ///
    /// The default reads them one after the other. Backends that can should
    /// override it so that a concurrent write cannot land between the reads.
    async fn snapshot(&self, group: GroupId) -> AppResult<GroupSnapshot> {
        let members = self.list_members(group).await?;
        let expenses = self.list_expenses(group).await?;
        Ok(GroupSnapshot { members, expenses })
    }

    /// Stores a new group with its creator as the only member.
    async fn create_group(&self, group: Group) -> AppResult<()>;

    /// Looks a group up by ID.
    async fn find_group(&self, id: GroupId) -> AppResult<Option<Group>>;

    /// Adds an account to the roster. Returns `false` if it was already there.
    async fn add_member(&self, group: GroupId, account: AccountId) -> AppResult<bool>;

    /// Appends an expense.
    async fn insert_expense(&self, expense: StoredExpense) -> AppResult<()>;

    /// Moves one expense from status `from` to `to` in a single step.
    ///
    /// Returns [`acerto_shared::AppError::Conflict`] without changing anything
    /// when the expense is not currently in `from`.
    async fn set_expense_status(
        &self,
        group: GroupId,
        expense: ExpenseId,
        from: ExpenseStatus,
        to: ExpenseStatus,
    ) -> AppResult<StoredExpense>;

    /// Stores a new invite.
    async fn insert_invite(&self, invite: Invite) -> AppResult<()>;

    /// Looks an invite up by its token, across all groups.
    async fn find_invite_by_token(&self, token: &str) -> AppResult<Option<Invite>>;

    /// Moves one invite from status `from` to `to` in a single step.
    ///
    /// Returns [`acerto_shared::AppError::Conflict`] without changing anything
    /// when the invite is not currently in `from`.
    async fn set_invite_status(
        &self,
        group: GroupId,
        invite: InviteId,
        from: InviteStatus,
        to: InviteStatus,
    ) -> AppResult<Invite>;

    /// Appends an activity entry.
    async fn append_activity(&self, entry: ActivityEntry) -> AppResult<()>;

    /// Activity log, oldest first.
    async fn list_activity(&self, group: GroupId) -> AppResult<Vec<ActivityEntry>>;
}
