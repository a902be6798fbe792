//! Voicemail completion: a landline caller finished recording. Logs the
//! recording, alerts the operator with the listen link, and hands the
//! recording to the background transcription job.

use leadline_domain::{mask_phone, templates};
use leadline_providers::twiml::VoiceResponse;
use leadline_storage::{
	leads,
	logs,
	models::{Direction, LeadStatus, OutboundKind},
	tenants,
};

use crate::{GateOutcome, Job, LeadlineService, Result, VoiceReply};

#[derive(Clone, Debug)]
pub struct VoicemailRequest {
	pub call_sid: String,
	pub from: String,
	pub to: String,
	pub recording_url: String,
}

impl LeadlineService {
	pub async fn handle_voicemail(&self, req: VoicemailRequest) -> Result<VoiceReply> {
		let empty = VoiceReply { twiml: VoiceResponse::new().render() };
		let gate_key = format!("{}_voicemail", req.call_sid);

		match self.gate_webhook(&gate_key, "voicemail", None).await {
			GateOutcome::Fresh { .. } => {},
			GateOutcome::Duplicate { .. } => {
				tracing::info!(%gate_key, "Duplicate voicemail webhook ignored.");

				return Ok(empty);
			},
			GateOutcome::StoreUnavailable => {
				self.defer_event(crate::DeferredEvent::Voicemail(req.clone()));

				return Ok(empty);
			},
		}

		let Some(tenant) = tenants::by_inbound_number(&self.db, &req.to).await? else {
			tracing::error!(to = %req.to, "Could not resolve tenant for voicemail.");

			return Ok(empty);
		};

		tracing::info!(
			caller = %mask_phone(&req.from),
			recording_url = %req.recording_url,
			"Voicemail received."
		);

		let now = self.now();

		match leads::upsert_contact(&self.db, Some(tenant.id), &req.from, None, now).await {
			Ok((lead_id, _)) => {
				if let Err(err) = logs::append(
					&self.db.pool,
					Some(tenant.id),
					lead_id,
					Direction::Inbound,
					&format!("(Voicemail) {}", req.recording_url),
					Some(&format!("{}_voicemail", req.call_sid)),
					now,
				)
				.await
				{
					tracing::error!(error = %err, "Failed to log voicemail event.");
				}
				if let Err(err) =
					leads::set_status(&self.db, Some(tenant.id), &req.from, LeadStatus::Replied)
						.await
				{
					tracing::error!(error = %err, "Failed to update lead status.");
				}
			},
			Err(err) => {
				tracing::error!(error = %err, "Failed to record lead for voicemail.");
			},
		}

		if !req.recording_url.trim().is_empty() {
			self.jobs.submit(Job::Transcribe {
				recording_url: req.recording_url.clone(),
				call_sid: req.call_sid.clone(),
				caller: req.from.clone(),
				tenant_id: tenant.id,
			});
		}

		let alert = templates::voicemail_operator_alert(&req.recording_url, &req.from);

		if let Err(err) = self
			.enqueue_message(
				Some(&tenant),
				&tenant.operator_number,
				&alert,
				OutboundKind::Internal,
				Some(&format!("{}_vm_alert", req.call_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue voicemail alert.");
		}

		Ok(empty)
	}
}
