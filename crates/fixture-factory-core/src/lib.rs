//! Composable, lifecycle-aware test fixtures.
//!
//! A fixture is declared once as a [`FixtureFactory`]: a name, an ordered
//! schema of fields and an async constructor. Fields are either read from the
//! running test's context (other fixtures, or seeded entries) or taken from a
//! default that a test may override. Factories are exposed to tests in two
//! shapes:
//!
//! - **Single instance** ([`FixtureFactory::use_value`]): constructed once per
//!   test, shared by reference, destroyed after the test.
//! - **Repeatable creation** ([`FixtureFactory::use_create_value`]): the test
//!   receives a [`Creator`]; every instance it creates is recorded and
//!   destroyed after the test, newest first.
//!
//! Fixtures are grouped into a [`Composition`]. Declaration order is the only
//! dependency mechanism; setup follows it and teardown reverses it, whatever
//! the outcome of the test body.
//!
//! # Quick Start
//!
//! ```
//! use fixture_factory_core::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let db = create_factory("Db")
//!     .with_value(|_| async { Ok::<_, BoxError>(Created::new("sqlite::memory:".to_string())) })?;
//! let workspace = create_factory("Workspace")
//!     .field("db", Field::<String>::from_context("db"))
//!     .field("public_id", Field::<String>::default_value("test:1".to_string()))
//!     .with_value(|fields| async move {
//!         let public_id = fields.value::<String>("public_id")?;
//!         Ok::<_, BoxError>(
//!             Created::new(public_id).with_destroy(|| async { Ok::<_, BoxError>(()) }),
//!         )
//!     })?;
//!
//! let composition = Composition::builder()
//!     .fixture("db", db.use_value())
//!     .fixture("workspace", workspace.use_value())
//!     .build()?;
//!
//! let outcome = composition
//!     .run(|ctx| async move { ctx.require::<String>("workspace") })
//!     .await?;
//! assert_eq!(*outcome.value, "test:1");
//! assert_eq!(outcome.report.teardown, vec!["workspace", "db"]);
//! # Ok::<_, BoxError>(())
//! # }).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`field`] / [`schema`] - field declarations and ordered schemas
//! - [`resolver`] - turns a schema plus a context into constructor inputs
//! - [`factory`] / [`instance`] - definitions, constructor output, realized instances
//! - [`provider`] / [`ledger`] - the two harness-facing shapes
//! - [`composition`] / [`harness`] - ordering, checks and the reference runner
//! - [`settings`] / [`logging`] - harness configuration and test logging

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod composition;
pub mod context;
pub mod error;
pub mod factory;
pub mod field;
pub mod harness;
pub mod instance;
pub mod ledger;
pub mod logging;
pub mod prelude;
pub mod provider;
pub mod resolver;
pub mod schema;
pub mod settings;

// Re-export commonly used types at crate root
pub use composition::{Composition, CompositionBuilder};
pub use context::{ContextValue, TestContext};
pub use error::{BoxError, FailureCause, FixtureError, FixtureResult};
pub use factory::{FactoryBuilder, FixtureFactory, create_factory};
pub use field::{Field, FieldSpec, SourceKind};
pub use harness::{TestFailure, TestOutcome, TestReport, TestRunner};
pub use instance::{Created, FixtureInstance};
pub use ledger::Ledger;
pub use provider::{
	ActiveFixture, Creator, FixtureMode, FixtureProvider, FixtureTeardown, UseCreateValue, UseValue,
};
pub use resolver::{Overrides, ResolvedFields, resolve, resolve_with_overrides};
pub use schema::FixtureSchema;
pub use settings::{HarnessSettings, SettingsError};
