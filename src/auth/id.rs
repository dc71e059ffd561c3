//! Strongly typed identifiers for tenants, applications, and providers.
//!
//! Tenants are interpolated into authority URLs, so [`TenantId`] only accepts the shapes a
//! directory authority understands: a GUID, a domain name, or one of the multi-tenant aliases
//! (`common`, `organizations`, `consumers`). Client and provider identifiers are opaque but must
//! be printable and free of whitespace.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, client, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant, client, provider).
		kind: &'static str,
	},
	/// The identifier contains a character its kind does not allow.
	#[error("{kind} identifier contains the disallowed character {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier (tenant, client, provider).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The tenant is neither a GUID, a domain name, nor a multi-tenant alias.
	#[error("Tenant identifier `{value}` is not a GUID, domain name, or alias.")]
	MalformedTenant {
		/// Rejected input.
		value: String,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant, client, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { TenantId, "Directory tenant an application authenticates against.", "Tenant", validate_tenant }
def_id! { ClientId, "Application (client) identifier registered with the identity provider.", "Client", validate_opaque }
def_id! { ProviderId, "Identifier for an OAuth provider descriptor.", "Provider", validate_opaque }

fn validate_opaque(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if let Some(character) = view.chars().find(|c| c.is_control()) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

// GUIDs, aliases, and domain names all reduce to dot-separated labels of ASCII alphanumerics
// and inner hyphens.
fn validate_tenant(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_opaque(kind, view)?;

	if let Some(character) = view.chars().find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '.')) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}

	let well_formed = view
		.split('.')
		.all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'));

	if !well_formed {
		return Err(IdentifierError::MalformedTenant { value: view.to_owned() });
	}

	Ok(())
}
