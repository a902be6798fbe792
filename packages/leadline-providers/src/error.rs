pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Typed provider failures. The dispatcher retries `Transient` and
/// dead-letters the rest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider authentication failed: {message}")]
	Auth { message: String },
	#[error("Provider resource not found: {message}")]
	NotFound { message: String },
	#[error("Transient provider error: {message}")]
	Transient { message: String },
	#[error("Permanent provider rejection: {message}")]
	Permanent { message: String },
}
impl Error {
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient { .. })
	}

	pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			Self::Auth { message: body }
		} else if status == reqwest::StatusCode::NOT_FOUND {
			Self::NotFound { message: body }
		} else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
			Self::Transient { message: format!("{status}: {body}") }
		} else {
			Self::Permanent { message: format!("{status}: {body}") }
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		// Network-level failures are worth retrying; everything else about
		// the request itself is not.
		if err.is_timeout() || err.is_connect() || err.is_request() {
			Self::Transient { message: err.to_string() }
		} else {
			Self::Permanent { message: err.to_string() }
		}
	}
}
