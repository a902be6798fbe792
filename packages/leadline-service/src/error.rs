pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid webhook input: {message}")]
	Validation { message: String },
	#[error("Authentication failed: {message}")]
	Auth { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Rate limited.")]
	RateLimited,
	#[error("Storage error: {message}")]
	Storage { message: String, transient: bool },
	#[error(transparent)]
	Gateway(#[from] leadline_providers::Error),
	#[error("Recipient has opted out or lacks consent.")]
	ConsentDenied,
	#[error("Deferred by quiet hours.")]
	QuietHours,
}
impl Error {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	pub fn is_transient_storage(&self) -> bool {
		matches!(self, Self::Storage { transient: true, .. })
	}
}

impl From<leadline_storage::Error> for Error {
	fn from(err: leadline_storage::Error) -> Self {
		let transient = err.is_transient();

		Self::Storage { message: err.to_string(), transient }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::from(leadline_storage::Error::from(err))
	}
}
