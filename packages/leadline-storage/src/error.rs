#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
}
impl Error {
	/// Whether a retry against the same store can reasonably succeed.
	/// Callers degrade (fail-open, defer, requeue) on transient errors and
	/// surface permanent ones.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Sqlx(err) => match err {
				sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
				sqlx::Error::Database(db) => {
					// Serialization failures and deadlocks resolve on retry.
					matches!(db.code().as_deref(), Some("40001") | Some("40P01") | Some("55P03"))
				},
				_ => false,
			},
			_ => false,
		}
	}
}
