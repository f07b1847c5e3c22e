use std::fmt;

use crate::db;
use crate::providers::ProviderError;

/// An error that can occur while moving a loan record through the pipeline
#[derive(Debug, PartialEq)]
pub struct Error {
	kind: ErrorKind,
}

impl Error {
	pub fn new(kind: ErrorKind) -> Error {
		Error { kind }
	}

	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	pub fn not_authorized(msg: impl Into<String>) -> Error {
		Error::new(ErrorKind::NotAuthorized(msg.into()))
	}

	pub fn not_found(msg: impl Into<String>) -> Error {
		Error::new(ErrorKind::NotFound(msg.into()))
	}

	pub fn conflict(msg: impl Into<String>) -> Error {
		Error::new(ErrorKind::Conflict(msg.into()))
	}

	pub fn not_ready(msg: impl Into<String>) -> Error {
		Error::new(ErrorKind::NotReady(msg.into()))
	}
}

/// The kind of an error that can occur.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
	Database(db::Error),
	/// The actor's active role or ownership does not allow the operation
	NotAuthorized(String),
	/// The target record does not exist
	NotFound(String),
	/// A conflicting business state already exists
	Conflict(String),
	/// The record has not cleared the checks the transition requires
	NotReady(String),
	/// A third-party call reported failure
	Provider(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			ErrorKind::Database(e) => write!(f, "db error: {}", e),
			ErrorKind::NotAuthorized(msg) => write!(f, "not authorized: {}", msg),
			ErrorKind::NotFound(msg) => write!(f, "not found: {}", msg),
			ErrorKind::Conflict(msg) => write!(f, "{}", msg),
			ErrorKind::NotReady(msg) => write!(f, "not ready: {}", msg),
			ErrorKind::Provider(msg) => write!(f, "provider error: {}", msg),
		}
	}
}

impl From<db::Error> for Error {
	fn from(e: db::Error) -> Self {
		Error::new(ErrorKind::Database(e))
	}
}

impl From<r2d2::Error> for Error {
	fn from(e: r2d2::Error) -> Self {
		Error::new(ErrorKind::Database(db::Error::from(e)))
	}
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		Error::new(ErrorKind::Database(db::Error::from(e)))
	}
}

impl From<ProviderError> for Error {
	fn from(e: ProviderError) -> Self {
		Error::new(ErrorKind::Provider(e.0))
	}
}
