//! The crate's single error type. Every fallible operation - PE/metadata parsing, reference
//! resolution, membership computation, query evaluation - reports through this type rather than
//! through a per-layer error enum, matching the coarse-grained `std::io::Error` style the rest
//! of the crate already reads through.

use std::fmt::{Display, Formatter};

use crate::metadata::indices::MetadataToken;

/// Everything that can go wrong while loading or querying an assembly.
#[derive(Debug)]
pub enum LoadError {
	/// The file is not a well-formed PE image, or lacks a CLI header.
	InvalidPe(String),
	/// The CLI metadata itself is malformed: a bad heap offset, an out-of-range coded index
	/// tag, a table row that doesn't fit in the declared row count.
	InvalidMetadata(String),
	/// A token, assembly name, or namespace/type name could not be resolved against the
	/// loader's current universe.
	UnresolvedReference(String),
	/// A query matched more than one candidate where the caller asked for exactly one.
	AmbiguousMatch(String),
	/// An invariant the loader relies on was violated by the caller or by a prior load (for
	/// example, asking a module for its owning assembly before it has been attached to one).
	LogicViolation(String),
	/// Failure to read the underlying file.
	Io(std::io::Error),
}

impl LoadError {
	pub fn invalid_metadata(message: impl Into<String>) -> Self {
		Self::InvalidMetadata(message.into())
	}

	pub fn unresolved_token(token: MetadataToken) -> Self {
		Self::UnresolvedReference(format!("unresolved metadata token {token:?}"))
	}
}

impl Display for LoadError {
	fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
		match self {
			LoadError::InvalidPe(msg) => write!(f, "invalid PE image: {msg}"),
			LoadError::InvalidMetadata(msg) => write!(f, "invalid CLI metadata: {msg}"),
			LoadError::UnresolvedReference(msg) => write!(f, "unresolved reference: {msg}"),
			LoadError::AmbiguousMatch(msg) => write!(f, "ambiguous match: {msg}"),
			LoadError::LogicViolation(msg) => write!(f, "logic violation: {msg}"),
			LoadError::Io(err) => write!(f, "I/O error: {err}"),
		}
	}
}

impl std::error::Error for LoadError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			LoadError::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for LoadError {
	fn from(err: std::io::Error) -> Self {
		LoadError::Io(err)
	}
}

pub type Result<T> = std::result::Result<T, LoadError>;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::table::TableKind;

	#[test]
	fn unresolved_token_message_names_the_table_and_rid() {
		let token = MetadataToken::new(TableKind::TypeRef, 9);
		let err = LoadError::unresolved_token(token);
		assert!(matches!(err, LoadError::UnresolvedReference(_)));
		assert!(err.to_string().contains("TypeRef"));
	}

	#[test]
	fn io_error_round_trips_through_source() {
		let io_err = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
		let err: LoadError = io_err.into();
		assert!(std::error::Error::source(&err).is_some());
	}

	#[test]
	fn non_io_variants_have_no_source() {
		let err = LoadError::invalid_metadata("bad row");
		assert!(std::error::Error::source(&err).is_none());
		assert_eq!(err.to_string(), "invalid CLI metadata: bad row");
	}
}
