//! # Test Fixture Factory
//!
//! Composable, lifecycle-aware test fixtures for async Rust.
//!
//! Fixtures are declared once with [`create_factory`], grouped into a
//! [`Composition`] and run around a test body. Setup follows declaration
//! order; teardown reverses it, whatever the body did.
//!
//! ## Feature Flags
//!
//! - `mocks` - in-memory persistence collaborator and ready-made
//!   `db` / `workspace` / `user` / `document` fixtures
//! - `full` - all features enabled
//!
//! ## Quick Example
//!
//! ```rust
//! use fixture_factory::prelude::*;
//!
//! let todo = create_factory("Todo")
//!     .field("completed", Field::<bool>::default_value(false))
//!     .with_value(|fields| async move {
//!         Ok::<_, BoxError>(Created::new(fields.value::<bool>("completed")?))
//!     })
//!     .unwrap();
//!
//! let composition = Composition::builder()
//!     .fixture("todo", todo.use_value())
//!     .build()
//!     .unwrap();
//! assert_eq!(composition.names().collect::<Vec<_>>(), vec!["todo"]);
//! ```

#![warn(missing_docs)]

#[cfg(feature = "mocks")]
pub mod mocks;

pub use fixture_factory_core::*;
