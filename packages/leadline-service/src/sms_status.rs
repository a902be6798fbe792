//! Delivery-status callback: upgrades or downgrades an outbound row by its
//! provider message id.

use leadline_domain::mask_phone;
use leadline_storage::outbox;

use crate::{LeadlineService, Result};

#[derive(Clone, Debug)]
pub struct SmsStatusRequest {
	pub message_sid: String,
	pub message_status: String,
}

impl LeadlineService {
	/// Always succeeds from the provider's point of view; a malformed or
	/// unknown callback is logged and dropped.
	pub async fn handle_sms_status(&self, req: SmsStatusRequest) -> Result<()> {
		if req.message_sid.trim().is_empty() || req.message_status.trim().is_empty() {
			tracing::warn!("Status callback missing MessageSid or MessageStatus.");

			return Ok(());
		}

		let Some(status) = outbox::map_provider_status(&req.message_status) else {
			tracing::info!(
				status = %req.message_status,
				message_sid = %req.message_sid,
				"Unmapped provider status."
			);

			return Ok(());
		};
		let updated =
			outbox::update_status_by_provider_id(&self.db, &req.message_sid, status).await?;

		if updated {
			tracing::info!(
				message_sid = %req.message_sid,
				status = status.as_str(),
				"Updated outbound delivery status."
			);
		} else {
			tracing::warn!(
				message_sid = %mask_phone(&req.message_sid),
				"No outbound row for provider message id."
			);
		}

		Ok(())
	}
}
