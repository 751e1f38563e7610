//! Rows stored by the in-memory [`Db`](crate::db::Db).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DocumentId, PersonId, TeamId, UserId, WorkspaceId};

/// Lifecycle state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceStatus {
	/// In use.
	Active,
	/// Soft-deleted.
	Deleted,
}

/// Lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
	/// In use.
	Active,
	/// Archived by a user.
	Archived,
}

/// A workspace row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
	pub id: WorkspaceId,
	pub icon: String,
	pub name: String,
	pub status: WorkspaceStatus,
	/// Externally visible identifier, unique across workspaces.
	pub public_id: String,
	pub version: u32,
	pub icp: String,
	pub strategy: String,
	pub vision: String,
	pub deleted_at: Option<DateTime<Utc>>,
}

/// A user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub name: String,
	pub email: String,
	pub image: Option<String>,
}

/// A document row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub workspace_id: WorkspaceId,
	pub id: DocumentId,
	pub version: u32,
	pub status: DocumentStatus,
	pub created_by_user_id: UserId,
	pub last_modified_at: DateTime<Utc>,
	/// Sequential per workspace.
	pub public_id: i64,
	pub title: String,
	pub owned_by_team_id: Option<TeamId>,
	pub vcs_tag_list: Vec<String>,
	pub archived_at: Option<DateTime<Utc>>,
	pub archived_by_user_id: Option<UserId>,
	pub released_at: Option<DateTime<Utc>>,
	pub owned_by_person_id: Option<PersonId>,
}

/// Any row, as returned by [`Db::select_all`](crate::db::Db::select_all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Row {
	/// A workspace.
	Workspace(Workspace),
	/// A user.
	User(User),
	/// A document.
	Document(Document),
}
