pub mod lookup;
pub mod signature;
pub mod sms;
pub mod twiml;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::Client;

pub(crate) fn client(timeout_ms: u64) -> Result<Client> {
	Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.build()
		.map_err(|err| Error::Transient { message: err.to_string() })
}
