//! Dial-status callback: the missed-call branch. An unanswered,
//! busy, failed, or machine-answered operator dial becomes a lead, an
//! implied-consent record, a templated missed-call text, an operator
//! alert, and a scheduled nudge.

use serde_json::json;
use time::Duration;

use leadline_domain::{mask_phone, templates};
use leadline_providers::twiml::VoiceResponse;
use leadline_storage::{
	leads,
	models::{ConsentSource, Tenant},
	tenants,
};

use crate::{GateOutcome, LeadlineService, Result, VoiceReply};

#[derive(Clone, Debug)]
pub struct DialStatusRequest {
	pub call_sid: String,
	pub dial_call_status: String,
	pub answered_by: Option<String>,
	pub from: String,
	pub to: String,
}

/// What actually happened to the operator dial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallDisposition {
	Answered,
	NoAnswer,
	Busy,
	Failed,
	Canceled,
	Machine,
}
impl CallDisposition {
	pub fn parse(dial_call_status: &str, answered_by: Option<&str>) -> Self {
		if let Some(answered_by) = answered_by {
			match answered_by {
				"human" => return Self::Answered,
				"machine_start" | "machine_end_beep" | "machine_end_silence"
				| "machine_end_other" | "fax" => return Self::Machine,
				_ => {},
			}
		}

		match dial_call_status {
			"completed" | "answered" => Self::Answered,
			"busy" => Self::Busy,
			"failed" => Self::Failed,
			"canceled" => Self::Canceled,
			_ => Self::NoAnswer,
		}
	}

	/// Whether the caller never reached a person and the text fallback
	/// should fire.
	pub fn missed(&self) -> bool {
		!matches!(self, Self::Answered)
	}
}

impl LeadlineService {
	pub async fn handle_dial_status(&self, req: DialStatusRequest) -> Result<VoiceReply> {
		let empty = VoiceReply { twiml: VoiceResponse::new().render() };

		if self.cfg.messaging.kill_switch {
			return Ok(empty);
		}

		// Sub-events share the CallSid; the dial status disambiguates.
		let gate_key = format!("{}_status_{}", req.call_sid, req.dial_call_status);

		match self.gate_webhook(&gate_key, "voice_status", None).await {
			GateOutcome::Fresh { .. } => {},
			GateOutcome::Duplicate { .. } => {
				tracing::info!(%gate_key, "Duplicate dial-status webhook ignored.");

				return Ok(empty);
			},
			GateOutcome::StoreUnavailable => {
				self.defer_event(crate::DeferredEvent::DialStatus(req.clone()));

				return Ok(empty);
			},
		}

		let Some(tenant) = self.resolve_callback_tenant(&req.to, &req.from).await? else {
			self.critical_alert(
				"Tenant resolution failed (voice status)",
				&format!(
					"Dial-status callback could not resolve a tenant. To: {}, From: {}, CallSid: \
					 {}",
					req.to, req.from, req.call_sid
				),
			)
			.await;

			return Ok(empty);
		};
		let disposition =
			CallDisposition::parse(&req.dial_call_status, req.answered_by.as_deref());

		tracing::info!(
			tenant = %tenant.name,
			status = %req.dial_call_status,
			answered_by = req.answered_by.as_deref().unwrap_or("unknown"),
			"Dial status received."
		);

		if !disposition.missed() {
			return Ok(empty);
		}

		// Machines get no speech; a human caller hears the handoff line.
		let response = if disposition == CallDisposition::Machine {
			VoiceResponse::new().hangup()
		} else {
			VoiceResponse::new()
				.say(templates::after_hours_mobile_script(&tenant.name))
				.hangup()
		};

		if let Err(err) =
			leads::upsert_contact(&self.db, Some(tenant.id), &req.from, None, self.now()).await
		{
			tracing::error!(error = %err, "Failed to record lead for missed call.");
		}
		if let Err(err) = self
			.record_implied_consent(
				Some(tenant.id),
				&req.from,
				ConsentSource::InboundCall,
				json!({ "CallSid": req.call_sid }),
			)
			.await
		{
			tracing::error!(error = %err, "Failed to record implied consent.");
		}

		self.enqueue_missed_call_texts(
			&tenant,
			&req.from,
			&format!("{}_missed", req.call_sid),
			None,
		)
		.await;

		let delay = Duration::seconds(self.cfg.dispatcher.nudge_delay_secs);

		if let Err(err) = self.schedule_nudge(&tenant, &req.from, delay).await {
			tracing::warn!(
				caller = %mask_phone(&req.from),
				error = %err,
				"Failed to schedule follow-up nudge."
			);
		}

		Ok(VoiceReply { twiml: response.render() })
	}

	/// The dial leg has been observed swapping `To` for the operator's own
	/// number, so resolution falls back through every plausible key.
	async fn resolve_callback_tenant(&self, to: &str, from: &str) -> Result<Option<Tenant>> {
		if let Some(tenant) = tenants::by_inbound_number(&self.db, to).await? {
			return Ok(Some(tenant));
		}
		if let Some(tenant) = tenants::by_inbound_number(&self.db, from).await? {
			return Ok(Some(tenant));
		}
		if let Some(tenant) = tenants::by_operator_number(&self.db, to).await? {
			return Ok(Some(tenant));
		}

		Ok(tenants::by_operator_number(&self.db, from).await?)
	}
}
