//! Mock persistence collaborator for `fixture-factory-core`.
//!
//! An in-memory [`Db`](db::Db) with workspaces, users and documents, and the
//! fixtures that create and clean them up per test.
//!
//! ```
//! use fixture_factory_core::Composition;
//! use fixture_factory_mocks::fixtures::{use_create_document, use_db, use_user, use_workspace};
//!
//! let composition = Composition::builder()
//!     .fixture("db", use_db().unwrap())
//!     .fixture("workspace", use_workspace().unwrap())
//!     .fixture("user", use_user().unwrap())
//!     .fixture("create_document", use_create_document().unwrap())
//!     .build()
//!     .unwrap();
//! assert_eq!(composition.len(), 4);
//! ```

pub mod db;
pub mod fixtures;
pub mod ids;
pub mod models;

pub use db::{Db, DbError, DbResult, Table, init_shared_db, reset_shared_db, shared_db};
pub use ids::{DocumentId, PersonId, TeamId, UserId, WorkspaceId, gen_id};
pub use models::{Document, DocumentStatus, Row, User, Workspace, WorkspaceStatus};
