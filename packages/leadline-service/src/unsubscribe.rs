//! One-click opt-out. The HMAC token binds the link to the phone number;
//! an invalid token is an auth failure, not a soft error.

use leadline_domain::token;

use crate::{Error, LeadlineService, Result};

impl LeadlineService {
	/// Returns the confirmation HTML on success.
	pub async fn handle_unsubscribe(&self, phone: &str, provided_token: &str) -> Result<String> {
		if phone.trim().is_empty() || provided_token.trim().is_empty() {
			return Err(Error::validation("Missing phone or token."));
		}
		if !token::verify_unsubscribe_token(
			&self.cfg.telephony.auth_token,
			phone,
			provided_token,
		) {
			return Err(Error::Auth { message: "Invalid unsubscribe token.".to_string() });
		}

		self.process_stop(phone, "One-Click Link").await?;

		Ok("<h1>Unsubscribed</h1><p>You have been successfully removed from our list.</p>"
			.to_string())
	}

	pub fn unsubscribe_token_for(&self, phone: &str) -> String {
		token::unsubscribe_token(&self.cfg.telephony.auth_token, phone)
	}
}
