//! Groups: roster, invites, activity log and the application service.
//!
//! The service only talks to storage through [`GroupRepository`], so the
//! settlement engine never depends on a particular backend.

mod activity;
mod repository;
mod service;
mod types;

pub use activity::ActivityEvent;
pub use repository::GroupRepository;
pub use service::GroupService;
pub use types::{ActivityEntry, Group, GroupSnapshot, Invite, InviteStatus};
