//! Convenience re-exports for common usage.
//!
//! ```
//! use fixture_factory_core::prelude::*;
//! ```

// Error types
pub use crate::error::{BoxError, FailureCause, FixtureError, FixtureResult};

// Definitions
pub use crate::factory::{FixtureFactory, create_factory};
pub use crate::field::Field;
pub use crate::instance::Created;
pub use crate::resolver::{Overrides, ResolvedFields};

// Test-time types
pub use crate::composition::Composition;
pub use crate::context::TestContext;
pub use crate::harness::{TestFailure, TestOutcome, TestReport};
pub use crate::provider::{Creator, FixtureProvider};
pub use crate::settings::HarnessSettings;
