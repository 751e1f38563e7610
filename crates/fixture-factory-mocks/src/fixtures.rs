//! Ready-made fixtures over [`Db`].
//!
//! Register them under the names their fields read:
//!
//! | name        | fixture                     | reads                    |
//! |-------------|-----------------------------|--------------------------|
//! | `db`        | [`use_db`]                  |                          |
//! | `workspace` | [`use_workspace`]           | `db`                     |
//! | `user`      | [`use_user`]                | `db`                     |
//! | `document`  | [`use_document`]            | `db`, `workspace`, `user`|
//!
//! Every `use_create_*` variant reads the same entries as its `use_*`
//! counterpart.

use chrono::Utc;
use fixture_factory_core::{
	BoxError, Created, Field, FixtureFactory, FixtureResult, UseCreateValue, UseValue, create_factory,
};

use crate::db::{Db, init_shared_db};
use crate::ids::{DocumentId, UserId, WorkspaceId, gen_id};
use crate::models::{Document, DocumentStatus, User, Workspace, WorkspaceStatus};

/// The database handle fixture. Uses the process-scoped store.
pub fn db_factory() -> FixtureResult<FixtureFactory<Db>> {
	create_factory("DB").with_value(|_| async { Ok::<_, BoxError>(Created::new(init_shared_db())) })
}

/// Single-instance [`db_factory`].
pub fn use_db() -> FixtureResult<UseValue<Db>> {
	Ok(db_factory()?.use_value())
}

/// Inserts a workspace with a fresh `test:` public id and deletes it at
/// teardown.
///
/// Fields: `db` (context), `name` (default), `public_id` (default, generated
/// per creation).
pub fn workspace_factory() -> FixtureResult<FixtureFactory<Workspace>> {
	create_factory("Workspace")
		.field("db", Field::<Db>::from_context("db"))
		.field("name", Field::<String>::default_value("Worky McWorkspace".to_string()))
		.field(
			"public_id",
			Field::<String>::default_with(|| format!("test:{}", gen_id())),
		)
		.with_value(|fields| async move {
			let db = fields.value::<Db>("db")?;
			let workspace = db
				.insert_workspace(Workspace {
					id: WorkspaceId::generate(),
					icon: "😃".to_string(),
					name: fields.value::<String>("name")?,
					status: WorkspaceStatus::Active,
					public_id: fields.value::<String>("public_id")?,
					version: 1,
					icp: String::new(),
					strategy: String::new(),
					vision: String::new(),
					deleted_at: None,
				})
				.await?;
			let id = workspace.id.clone();
			Ok::<_, BoxError>(
				Created::new(workspace)
					.with_destroy(move || async move { db.delete_workspace(&id).await }),
			)
		})
}

/// Single-instance [`workspace_factory`].
pub fn use_workspace() -> FixtureResult<UseValue<Workspace>> {
	Ok(workspace_factory()?.use_value())
}

/// Repeatable [`workspace_factory`].
pub fn use_create_workspace() -> FixtureResult<UseCreateValue<Workspace>> {
	Ok(workspace_factory()?.use_create_value())
}

/// Inserts a user and deletes it at teardown.
///
/// Fields: `db` (context), `name`, `email` (defaults).
pub fn user_factory() -> FixtureResult<FixtureFactory<User>> {
	create_factory("User")
		.field("db", Field::<Db>::from_context("db"))
		.field("name", Field::<String>::default_value("Test User".to_string()))
		.field("email", Field::<String>::default_value("test@example.com".to_string()))
		.with_value(|fields| async move {
			let db = fields.value::<Db>("db")?;
			let user = db
				.insert_user(User {
					id: UserId::generate(),
					name: fields.value::<String>("name")?,
					email: fields.value::<String>("email")?,
					image: None,
				})
				.await?;
			let id = user.id.clone();
			Ok::<_, BoxError>(
				Created::new(user).with_destroy(move || async move { db.delete_user(&id).await }),
			)
		})
}

/// Single-instance [`user_factory`].
pub fn use_user() -> FixtureResult<UseValue<User>> {
	Ok(user_factory()?.use_value())
}

/// Repeatable [`user_factory`].
pub fn use_create_user() -> FixtureResult<UseCreateValue<User>> {
	Ok(user_factory()?.use_create_value())
}

/// Inserts a document into the test's workspace, created by the test's user,
/// and deletes it at teardown.
///
/// Fields: `db`, `workspace_id`, `user_id` (context), `public_id` (default 1),
/// `title` (default).
pub fn document_factory() -> FixtureResult<FixtureFactory<Document>> {
	create_factory("Document")
		.field("db", Field::<Db>::from_context("db"))
		.field(
			"workspace_id",
			Field::<WorkspaceId>::from_context_with("workspace", |ws: &Workspace| ws.id.clone()),
		)
		.field(
			"user_id",
			Field::<UserId>::from_context_with("user", |user: &User| user.id.clone()),
		)
		.field("public_id", Field::<i64>::default_value(1))
		.field("title", Field::<String>::default_value("Test Document".to_string()))
		.with_value(|fields| async move {
			let db = fields.value::<Db>("db")?;
			let document = db
				.insert_document(Document {
					workspace_id: fields.value::<WorkspaceId>("workspace_id")?,
					id: DocumentId::generate(),
					version: 1,
					status: DocumentStatus::Active,
					created_by_user_id: fields.value::<UserId>("user_id")?,
					last_modified_at: Utc::now(),
					public_id: fields.value::<i64>("public_id")?,
					title: fields.value::<String>("title")?,
					owned_by_team_id: None,
					vcs_tag_list: Vec::new(),
					archived_at: None,
					archived_by_user_id: None,
					released_at: None,
					owned_by_person_id: None,
				})
				.await?;
			let id = document.id.clone();
			Ok::<_, BoxError>(
				Created::new(document).with_destroy(move || async move { db.delete_document(&id).await }),
			)
		})
}

/// Single-instance [`document_factory`].
pub fn use_document() -> FixtureResult<UseValue<Document>> {
	Ok(document_factory()?.use_value())
}

/// Repeatable [`document_factory`].
pub fn use_create_document() -> FixtureResult<UseCreateValue<Document>> {
	Ok(document_factory()?.use_create_value())
}
