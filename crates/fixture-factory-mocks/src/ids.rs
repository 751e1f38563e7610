//! Typed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a random identifier string.
pub fn gen_id() -> String {
	Uuid::new_v4().simple().to_string()
}

macro_rules! id_type {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			/// A fresh random identifier.
			pub fn generate() -> Self {
				Self(gen_id())
			}

			/// The identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl From<&str> for $name {
			fn from(value: &str) -> Self {
				Self(value.to_string())
			}
		}

		impl From<String> for $name {
			fn from(value: String) -> Self {
				Self(value)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}
	};
}

id_type!(
	/// Identifies a workspace.
	WorkspaceId
);
id_type!(
	/// Identifies a user.
	UserId
);
id_type!(
	/// Identifies a document.
	DocumentId
);
id_type!(
	/// Identifies a team.
	TeamId
);
id_type!(
	/// Identifies a person.
	PersonId
);
