//! Group service: membership checks, expense logging, invites and reports.

use std::sync::Arc;

use acerto_shared::config::SettlementConfig;
use acerto_shared::{AccountId, AppError, AppResult, Currency, ExpenseId, GroupId, InviteId, Money};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::activity::ActivityEvent;
use super::repository::GroupRepository;
use super::types::{ActivityEntry, Group, Invite, InviteStatus};
use crate::expense::{
    ExpenseNormalizer, ExpenseStatus, NewExpenseInput, RawParticipants, SplitMode, StoredExpense,
};
use crate::settlement::{SettlementPolicy, SettlementReport, SettlementReportBuilder};

/// Application service over a [`GroupRepository`].
///
/// Every operation takes the already-verified calling account and checks
/// that it belongs to the group before touching anything.
pub struct GroupService<R: GroupRepository> {
    repo: Arc<R>,
    settings: SettlementConfig,
}

impl<R: GroupRepository> GroupService<R> {
    /// Creates a new group service.
    #[must_use]
    pub fn new(repo: Arc<R>, settings: SettlementConfig) -> Self {
        Self { repo, settings }
    }

    /// Creates a group with `caller` as its first member.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name, or a storage error.
    pub async fn create_group(
        &self,
        caller: &AccountId,
        name: &str,
        currency: Option<Currency>,
    ) -> AppResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Group name must not be empty".to_string()));
        }

        let group = Group {
            id: GroupId::new(),
            name: name.to_string(),
            currency: currency.unwrap_or(self.settings.default_currency),
            created_by: caller.clone(),
            created_at: Utc::now(),
        };
        self.repo.create_group(group.clone()).await?;
        self.log(
            group.id,
            caller,
            ActivityEvent::GroupCreated {
                name: group.name.clone(),
            },
        )
        .await?;

        info!(group_id = %group.id, created_by = %caller, "Group created");
        Ok(group)
    }

    /// Validates and stores a new expense.
    ///
    /// An absent payer defaults to the caller. The payer and any selected
    /// participants must be members of the group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Forbidden` if the caller is not a member
    /// - `Validation` for a bad amount, an empty or malformed participant
    ///   list, or a payer/participant outside the roster
    pub async fn record_expense(
        &self,
        caller: &AccountId,
        input: NewExpenseInput,
    ) -> AppResult<StoredExpense> {
        let group = self.require_group(input.group_id).await?;
        let members = self.require_member(group.id, caller).await?;

        let payer = input
            .payer
            .as_deref()
            .and_then(AccountId::parse)
            .unwrap_or_else(|| caller.clone());

        let record = ExpenseNormalizer::resolve(
            &input.amount,
            Some(payer.as_str()),
            input.split_mode,
            &input.participants,
            &members,
        )?;

        if !members.contains(&payer) {
            return Err(AppError::Validation(format!("Payer {payer} is not a group member")));
        }
        if let Some(outsider) = record.participants().iter().find(|p| !members.contains(*p)) {
            return Err(AppError::Validation(format!(
                "Participant {outsider} is not a group member"
            )));
        }

        let participants = match input.split_mode {
            SplitMode::All => RawParticipants::default(),
            SplitMode::Selected => RawParticipants::List(
                record.participants().iter().map(|p| p.as_str().to_string()).collect(),
            ),
        };

        let expense = StoredExpense {
            id: ExpenseId::new(),
            group_id: group.id,
            description: input.description.trim().to_string(),
            amount: record.amount().into(),
            payer: Some(payer.as_str().to_string()),
            participants,
            split_mode: input.split_mode,
            status: ExpenseStatus::Pending,
            created_by: caller.clone(),
            created_at: Utc::now(),
        };
        self.repo.insert_expense(expense.clone()).await?;
        self.log(
            group.id,
            caller,
            ActivityEvent::ExpenseAdded {
                description: expense.description.clone(),
                amount: Money::new(record.amount(), group.currency),
            },
        )
        .await?;

        debug!(
            group_id = %group.id,
            expense_id = %expense.id,
            participants = record.participants().len(),
            "Expense recorded"
        );
        Ok(expense)
    }

    /// Marks an expense as paid back outside the app.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group or expense does not exist
    /// - `Forbidden` if the caller is not a member
    /// - `Conflict` if the expense is already paid
    pub async fn mark_expense_paid(
        &self,
        caller: &AccountId,
        group_id: GroupId,
        expense_id: ExpenseId,
    ) -> AppResult<StoredExpense> {
        self.require_group(group_id).await?;
        self.require_member(group_id, caller).await?;

        let updated = self
            .repo
            .set_expense_status(group_id, expense_id, ExpenseStatus::Pending, ExpenseStatus::Paid)
            .await
            .map_err(|err| match err {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Expense {expense_id} is already paid"))
                }
                other => other,
            })?;
        self.log(
            group_id,
            caller,
            ActivityEvent::ExpenseMarkedPaid {
                description: updated.description.clone(),
            },
        )
        .await?;

        info!(group_id = %group_id, expense_id = %expense_id, "Expense marked paid");
        Ok(updated)
    }

    /// Creates an invite for `invitee`, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Forbidden` if the caller is not a member
    /// - `Validation` if `ttl` is not positive
    /// - `Conflict` if the invitee is already a member
    pub async fn create_invite(
        &self,
        caller: &AccountId,
        group_id: GroupId,
        invitee: AccountId,
        ttl: Duration,
    ) -> AppResult<Invite> {
        self.require_group(group_id).await?;
        let members = self.require_member(group_id, caller).await?;

        if ttl <= Duration::zero() {
            return Err(AppError::Validation("Invite lifetime must be positive".to_string()));
        }
        if members.contains(&invitee) {
            return Err(AppError::Conflict(format!("{invitee} is already a member")));
        }

        let now = Utc::now();
        let invite = Invite {
            id: InviteId::new(),
            group_id,
            invitee: invitee.clone(),
            token: Uuid::new_v4().to_string(),
            invited_by: caller.clone(),
            status: InviteStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
        };
        self.repo.insert_invite(invite.clone()).await?;
        self.log(group_id, caller, ActivityEvent::InviteCreated { invitee })
            .await?;

        info!(group_id = %group_id, invite_id = %invite.id, "Invite created");
        Ok(invite)
    }

    /// Redeems an invite token and adds the caller to the group.
    ///
    /// An expired invite is marked as such before the error is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no invite has this token
    /// - `Forbidden` if the invite is addressed to someone else
    /// - `Conflict` if the invite is no longer pending
    /// - `Expired` if the invite has passed its expiry
    pub async fn accept_invite(
        &self,
        caller: &AccountId,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Group> {
        let invite = self
            .repo
            .find_invite_by_token(token.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Invite".to_string()))?;

        if invite.invitee != *caller {
            warn!(invite_id = %invite.id, caller = %caller, "Invite presented by another account");
            return Err(AppError::Forbidden("Invite is addressed to another account".to_string()));
        }
        if invite.is_expired_at(now) {
            self.claim_invite(&invite, InviteStatus::Expired).await?;
            return Err(AppError::Expired("Invite has expired".to_string()));
        }

        // Only one acceptance can move the invite out of pending.
        self.claim_invite(&invite, InviteStatus::Accepted).await?;

        let group = self.require_group(invite.group_id).await?;
        if self.repo.add_member(group.id, caller.clone()).await? {
            self.log(
                group.id,
                caller,
                ActivityEvent::MemberJoined {
                    member: caller.clone(),
                },
            )
            .await?;
        }
        self.log(group.id, caller, ActivityEvent::InviteAccepted).await?;

        info!(group_id = %group.id, member = %caller, "Invite accepted");
        Ok(group)
    }

    /// Builds the settlement report for a group.
    ///
    /// Reads roster and expenses from one snapshot. Paid expenses are left
    /// out unless `include_paid_expenses` is set.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Forbidden` if the caller is not a member
    pub async fn settlement_report(
        &self,
        caller: &AccountId,
        group_id: GroupId,
    ) -> AppResult<SettlementReport> {
        let group = self.require_group(group_id).await?;
        let snapshot = self.repo.snapshot(group_id).await?;
        Self::ensure_member(&snapshot.members, caller)?;

        let expenses: Vec<StoredExpense> = snapshot
            .expenses
            .into_iter()
            .filter(|e| self.settings.include_paid_expenses || e.status != ExpenseStatus::Paid)
            .collect();

        let policy = SettlementPolicy::for_currency(group.currency)
            .with_residual_tolerance(self.settings.residual_tolerance_per_account);
        let report = SettlementReportBuilder::new(policy).build(&expenses, &snapshot.members);

        debug!(
            group_id = %group_id,
            expenses = expenses.len(),
            transfers = report.transfers.len(),
            warnings = report.warnings.len(),
            "Settlement report built"
        );
        Ok(report)
    }

    /// Activity log of a group, oldest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Forbidden` if the caller is not a member
    pub async fn activity_log(
        &self,
        caller: &AccountId,
        group_id: GroupId,
    ) -> AppResult<Vec<ActivityEntry>> {
        self.require_group(group_id).await?;
        self.require_member(group_id, caller).await?;
        self.repo.list_activity(group_id).await
    }

    /// Current roster of a group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Forbidden` if the caller is not a member
    pub async fn members(&self, caller: &AccountId, group_id: GroupId) -> AppResult<Vec<AccountId>> {
        self.require_group(group_id).await?;
        self.require_member(group_id, caller).await
    }

    /// Moves a pending invite to `to`, or reports why it is no longer pending.
    async fn claim_invite(&self, invite: &Invite, to: InviteStatus) -> AppResult<Invite> {
        self.repo
            .set_invite_status(invite.group_id, invite.id, InviteStatus::Pending, to)
            .await
            .map_err(|err| match err {
                AppError::Conflict(_) => {
                    AppError::Conflict("Invite is no longer pending".to_string())
                }
                other => other,
            })
    }

    async fn require_group(&self, id: GroupId) -> AppResult<Group> {
        self.repo
            .find_group(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {id}")))
    }

    /// Returns the roster if `caller` is on it.
    async fn require_member(&self, group: GroupId, caller: &AccountId) -> AppResult<Vec<AccountId>> {
        let members = self.repo.list_members(group).await?;
        Self::ensure_member(&members, caller)?;
        Ok(members)
    }

    fn ensure_member(members: &[AccountId], caller: &AccountId) -> AppResult<()> {
        if members.contains(caller) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{caller} is not a member of this group")))
        }
    }

    async fn log(&self, group: GroupId, actor: &AccountId, event: ActivityEvent) -> AppResult<()> {
        self.repo
            .append_activity(event.into_entry(group, actor.clone(), Utc::now()))
            .await
    }
}
