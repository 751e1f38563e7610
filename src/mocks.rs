//! Mock persistence collaborator.
//!
//! In-memory workspaces, users and documents, plus the fixtures that create
//! and remove them per test.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fixture_factory::mocks::fixtures::{use_db, use_workspace};
//! ```

pub use fixture_factory_mocks::*;
