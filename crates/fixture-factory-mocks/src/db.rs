//! In-memory persistence collaborator.
//!
//! [`Db`] stores workspaces, users and documents and enforces the constraints
//! a real schema would: unique ids, documents referencing existing workspaces
//! and users, and rows that cannot be deleted while documents still reference
//! them. The last rule is what makes teardown order observable.
//!
//! A process-scoped instance is managed explicitly with [`init_shared_db`],
//! [`shared_db`] and [`reset_shared_db`].

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;

use crate::ids::{DocumentId, UserId, WorkspaceId};
use crate::models::{Document, Row, User, Workspace};

/// Table names accepted by [`Db::select_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
	/// Workspaces.
	Workspaces,
	/// Users.
	Users,
	/// Documents.
	Documents,
}

impl Table {
	/// Table name as used in error messages.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Workspaces => "workspaces",
			Self::Users => "users",
			Self::Documents => "documents",
		}
	}
}

/// Errors returned by [`Db`].
#[derive(Debug, Error)]
pub enum DbError {
	/// A row with the same key already exists.
	#[error("Duplicate key in {table}: {key}")]
	Duplicate {
		/// Table name.
		table: &'static str,
		/// Conflicting key.
		key: String,
	},

	/// No row with this id.
	#[error("Not found in {table}: {id}")]
	NotFound {
		/// Table name.
		table: &'static str,
		/// Missing id.
		id: String,
	},

	/// A referenced row does not exist.
	#[error("Foreign key violation: {table} row {id} does not exist")]
	ForeignKey {
		/// Referenced table.
		table: &'static str,
		/// Referenced id.
		id: String,
	},

	/// The row is still referenced by documents.
	#[error("Cannot delete {table} row {id}: still referenced by {references} document(s)")]
	InUse {
		/// Table name.
		table: &'static str,
		/// Row id.
		id: String,
		/// Number of referencing documents.
		references: usize,
	},

	/// [`shared_db`] was called before [`init_shared_db`].
	#[error("Shared database is not initialized")]
	NotInitialized,
}

/// Result type alias for [`Db`] operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Default)]
struct Tables {
	workspaces: Vec<Workspace>,
	users: Vec<User>,
	documents: Vec<Document>,
}

impl Tables {
	fn documents_referencing(&self, predicate: impl Fn(&Document) -> bool) -> usize {
		self.documents.iter().filter(|d| predicate(d)).count()
	}
}

/// Cheaply clonable handle over one in-memory store.
///
/// Operations are `async` like a real driver; no lock is held across an
/// await point.
#[derive(Debug, Clone, Default)]
pub struct Db {
	tables: Arc<RwLock<Tables>>,
}

impl Db {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true if both handles point at the same store.
	pub fn same_store(&self, other: &Db) -> bool {
		Arc::ptr_eq(&self.tables, &other.tables)
	}

	/// Every row of `table`, in insertion order.
	pub async fn select_all(&self, table: Table) -> DbResult<Vec<Row>> {
		let tables = self.tables.read();
		Ok(match table {
			Table::Workspaces => tables.workspaces.iter().cloned().map(Row::Workspace).collect(),
			Table::Users => tables.users.iter().cloned().map(Row::User).collect(),
			Table::Documents => tables.documents.iter().cloned().map(Row::Document).collect(),
		})
	}

	/// Inserts a workspace. Ids and public ids are unique.
	pub async fn insert_workspace(&self, workspace: Workspace) -> DbResult<Workspace> {
		let mut tables = self.tables.write();
		if let Some(existing) = tables
			.workspaces
			.iter()
			.find(|w| w.id == workspace.id || w.public_id == workspace.public_id)
		{
			let key = if existing.id == workspace.id {
				workspace.id.to_string()
			} else {
				workspace.public_id.clone()
			};
			return Err(DbError::Duplicate {
				table: Table::Workspaces.as_str(),
				key,
			});
		}
		tables.workspaces.push(workspace.clone());
		tracing::debug!(workspace = %workspace.id, "workspace inserted");
		Ok(workspace)
	}

	/// Deletes a workspace that no document references.
	pub async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> DbResult<()> {
		let mut tables = self.tables.write();
		let references = tables.documents_referencing(|d| &d.workspace_id == workspace_id);
		if references > 0 {
			return Err(DbError::InUse {
				table: Table::Workspaces.as_str(),
				id: workspace_id.to_string(),
				references,
			});
		}
		let index = tables
			.workspaces
			.iter()
			.position(|w| &w.id == workspace_id)
			.ok_or_else(|| DbError::NotFound {
				table: Table::Workspaces.as_str(),
				id: workspace_id.to_string(),
			})?;
		tables.workspaces.remove(index);
		tracing::debug!(workspace = %workspace_id, "workspace deleted");
		Ok(())
	}

	/// Inserts a user.
	pub async fn insert_user(&self, user: User) -> DbResult<User> {
		let mut tables = self.tables.write();
		if tables.users.iter().any(|u| u.id == user.id) {
			return Err(DbError::Duplicate {
				table: Table::Users.as_str(),
				key: user.id.to_string(),
			});
		}
		tables.users.push(user.clone());
		tracing::debug!(user = %user.id, "user inserted");
		Ok(user)
	}

	/// Deletes a user that created no remaining document.
	pub async fn delete_user(&self, user_id: &UserId) -> DbResult<()> {
		let mut tables = self.tables.write();
		let references = tables.documents_referencing(|d| &d.created_by_user_id == user_id);
		if references > 0 {
			return Err(DbError::InUse {
				table: Table::Users.as_str(),
				id: user_id.to_string(),
				references,
			});
		}
		let index = tables
			.users
			.iter()
			.position(|u| &u.id == user_id)
			.ok_or_else(|| DbError::NotFound {
				table: Table::Users.as_str(),
				id: user_id.to_string(),
			})?;
		tables.users.remove(index);
		tracing::debug!(user = %user_id, "user deleted");
		Ok(())
	}

	/// Inserts a document. Its workspace and creator must exist, and its
	/// public id must be unique within the workspace.
	pub async fn insert_document(&self, document: Document) -> DbResult<Document> {
		let mut tables = self.tables.write();
		if !tables.workspaces.iter().any(|w| w.id == document.workspace_id) {
			return Err(DbError::ForeignKey {
				table: Table::Workspaces.as_str(),
				id: document.workspace_id.to_string(),
			});
		}
		if !tables.users.iter().any(|u| u.id == document.created_by_user_id) {
			return Err(DbError::ForeignKey {
				table: Table::Users.as_str(),
				id: document.created_by_user_id.to_string(),
			});
		}
		if let Some(existing) = tables.documents.iter().find(|d| {
			d.id == document.id
				|| (d.workspace_id == document.workspace_id && d.public_id == document.public_id)
		}) {
			let key = if existing.id == document.id {
				document.id.to_string()
			} else {
				format!("{}#{}", document.workspace_id, document.public_id)
			};
			return Err(DbError::Duplicate {
				table: Table::Documents.as_str(),
				key,
			});
		}
		tables.documents.push(document.clone());
		tracing::debug!(document = %document.id, public_id = document.public_id, "document inserted");
		Ok(document)
	}

	/// Deletes a document.
	pub async fn delete_document(&self, document_id: &DocumentId) -> DbResult<()> {
		let mut tables = self.tables.write();
		let index = tables
			.documents
			.iter()
			.position(|d| &d.id == document_id)
			.ok_or_else(|| DbError::NotFound {
				table: Table::Documents.as_str(),
				id: document_id.to_string(),
			})?;
		tables.documents.remove(index);
		tracing::debug!(document = %document_id, "document deleted");
		Ok(())
	}

	/// Next free document public id in `workspace_id`: one past the highest,
	/// or 1 for an empty workspace.
	pub async fn get_next_public_id_for_document(&self, workspace_id: &WorkspaceId) -> DbResult<i64> {
		let tables = self.tables.read();
		if !tables.workspaces.iter().any(|w| &w.id == workspace_id) {
			return Err(DbError::NotFound {
				table: Table::Workspaces.as_str(),
				id: workspace_id.to_string(),
			});
		}
		let highest = tables
			.documents
			.iter()
			.filter(|d| &d.workspace_id == workspace_id)
			.map(|d| d.public_id)
			.max();
		Ok(highest.map_or(1, |id| id + 1))
	}

	/// Row counts per table.
	pub fn counts(&self) -> HashMap<&'static str, usize> {
		let tables = self.tables.read();
		HashMap::from([
			(Table::Workspaces.as_str(), tables.workspaces.len()),
			(Table::Users.as_str(), tables.users.len()),
			(Table::Documents.as_str(), tables.documents.len()),
		])
	}
}

/// Process-scoped store shared by fixtures that do not seed their own.
static SHARED_DB: Lazy<RwLock<Option<Db>>> = Lazy::new(|| RwLock::new(None));

/// Initializes the shared store if needed and returns a handle to it.
pub fn init_shared_db() -> Db {
	SHARED_DB.write().get_or_insert_with(Db::new).clone()
}

/// Returns the shared store.
///
/// # Errors
///
/// [`DbError::NotInitialized`] before [`init_shared_db`] or after
/// [`reset_shared_db`].
pub fn shared_db() -> DbResult<Db> {
	SHARED_DB.read().clone().ok_or(DbError::NotInitialized)
}

/// Drops the shared store. Handles already given out keep working.
///
/// This is primarily useful for testing.
pub fn reset_shared_db() {
	*SHARED_DB.write() = None;
}
