//! Inbound-call routing. Chooses between ring-through, after-hours text
//! capture, voicemail, and the emergency press-1 override, and renders the
//! decision as call-control markup.

use serde_json::json;

use leadline_domain::{hours::DayPart, mask_phone, phone, templates};
use leadline_providers::{
	lookup::{LineLookup, LineType},
	twiml::VoiceResponse,
};
use leadline_storage::{
	leads,
	models::{ConsentSource, LeadIntent, OutboundKind, Tenant},
	tenants,
};

use crate::{GateOutcome, LeadlineService, Result};

pub const OPERATOR_DIAL_TIMEOUT_SECS: u32 = 15;
const VOICEMAIL_MAX_SECS: u32 = 60;
const GATHER_TIMEOUT_SECS: u32 = 5;

#[derive(Clone, Debug)]
pub struct VoiceRequest {
	pub from: String,
	pub to: String,
	pub call_sid: String,
	pub digits: Option<String>,
}

#[derive(Clone, Debug)]
pub struct VoiceReply {
	pub twiml: String,
}
impl VoiceReply {
	fn say_and_hangup(text: &str) -> Self {
		Self { twiml: VoiceResponse::new().say(text).hangup().render() }
	}
}

impl LeadlineService {
	pub async fn handle_voice(&self, req: VoiceRequest) -> Result<VoiceReply> {
		if self.cfg.messaging.kill_switch {
			tracing::warn!("Kill switch active. Rejecting incoming call.");

			return Ok(VoiceReply::say_and_hangup(templates::maintenance_script()));
		}

		if let Err(message) = validate_voice_input(&req) {
			self.critical_alert("Invalid voice webhook", &message).await;

			return Ok(VoiceReply::say_and_hangup(templates::system_error_script()));
		}

		// The press-1 gather posts back here with the same CallSid; the
		// digits leg is a sub-event with its own idempotency key.
		let gate_key = match req.digits.as_deref() {
			Some(digits) => format!("{}_digits_{digits}", req.call_sid),
			None => req.call_sid.clone(),
		};

		match self.gate_webhook(&gate_key, "voice", None).await {
			GateOutcome::Fresh { .. } => {},
			GateOutcome::Duplicate { .. } => {
				tracing::info!(%gate_key, "Duplicate voice webhook ignored.");

				return Ok(VoiceReply::say_and_hangup(templates::check_texts_script()));
			},
			GateOutcome::StoreUnavailable => {
				self.defer_event(crate::DeferredEvent::Voice(req.clone()));

				return Ok(VoiceReply::say_and_hangup(templates::check_texts_script()));
			},
		}

		let tenant = match tenants::by_inbound_number(&self.db, &req.to).await {
			Ok(Some(tenant)) => tenant,
			Ok(None) => {
				self.critical_alert(
					"Tenant resolution failed (voice)",
					&format!("No tenant owns {}. CallSid: {}", req.to, req.call_sid),
				)
				.await;

				return Ok(VoiceReply::say_and_hangup(templates::config_error_script()));
			},
			Err(err) => {
				tracing::error!(error = %err, "Tenant lookup failed.");

				return Ok(VoiceReply::say_and_hangup(templates::system_error_script()));
			},
		};

		if self.rate_limit_exceeded(tenant.id).await {
			return Ok(VoiceReply::say_and_hangup("Busy. Please try again later."));
		}

		// AI kill-switch: hand the call straight to the operator.
		if !tenant.ai_active {
			tracing::warn!(
				caller = %mask_phone(&req.from),
				"Assistant paused for tenant. Forwarding call."
			);

			return Ok(VoiceReply {
				twiml: VoiceResponse::new()
					.dial(&tenant.operator_number, OPERATOR_DIAL_TIMEOUT_SECS)
					.render(),
			});
		}

		// Emergency override: the caller pressed 1 at the after-hours
		// gather and comes back through the same endpoint with digits.
		if req.digits.as_deref() == Some("1") && tenant.emergency_mode {
			tracing::warn!(caller = %mask_phone(&req.from), "Emergency override. Connecting.");

			if let Err(err) =
				leads::set_intent(&self.db, Some(tenant.id), &req.from, LeadIntent::Emergency).await
			{
				tracing::warn!(error = %err, "Failed to tag lead intent.");
			}

			return Ok(VoiceReply {
				twiml: VoiceResponse::new()
					.say(templates::connecting_script())
					.dial(&tenant.operator_number, OPERATOR_DIAL_TIMEOUT_SECS)
					.render(),
			});
		}

		let hour = self.local_hour(&tenant.timezone);
		let part = leadline_domain::hours::classify_hour(
			hour,
			tenant.day_start.max(0) as u32,
			tenant.day_end.max(0) as u32,
			tenant.evening_end.max(0) as u32,
		);

		tracing::info!(
			caller = %mask_phone(&req.from),
			tenant = %tenant.name,
			%hour,
			part = part.as_str(),
			"Incoming call."
		);

		match part {
			// Ring the operator; the dial-status callback owns the
			// missed-call branch, including the lead and consent writes.
			DayPart::Daytime | DayPart::Evening => Ok(VoiceReply {
				twiml: VoiceResponse::new()
					.dial_with_action(
						&tenant.operator_number,
						OPERATOR_DIAL_TIMEOUT_SECS,
						"/voice/status",
					)
					.render(),
			}),
			DayPart::Sleep => self.handle_sleep_call(&tenant, &req).await,
		}
	}

	async fn handle_sleep_call(&self, tenant: &Tenant, req: &VoiceRequest) -> Result<VoiceReply> {
		let lookup = if self.cfg.telephony.lookup_enabled {
			match self.gateway.lookup(&self.cfg.telephony, &req.from).await {
				Ok(lookup) => lookup,
				Err(err) => {
					tracing::warn!(
						caller = %mask_phone(&req.from),
						error = %err,
						"Lookup failed. Assuming mobile."
					);

					LineLookup::default()
				},
			}
		} else {
			LineLookup::default()
		};
		let is_landline = lookup.line_type == LineType::Landline;

		if let Err(err) = leads::upsert_contact(
			&self.db,
			Some(tenant.id),
			&req.from,
			lookup.caller_name.as_deref(),
			self.now(),
		)
		.await
		{
			tracing::error!(error = %err, "Failed to record lead for after-hours call.");
		}
		if let Err(err) = self
			.record_implied_consent(
				Some(tenant.id),
				&req.from,
				ConsentSource::InboundCall,
				json!({ "CallSid": req.call_sid, "to_number": req.to }),
			)
			.await
		{
			tracing::error!(error = %err, "Failed to record implied consent.");
		}

		// Emergency mode fronts the branch with the press-1 gather; on
		// timeout the call falls through to the landline or mobile path.
		let mut response = VoiceResponse::new();

		if tenant.emergency_mode {
			response = response.gather(
				1,
				GATHER_TIMEOUT_SECS,
				"/voice",
				templates::emergency_gather_script(&tenant.name),
			);
		}

		let response = if is_landline {
			response
				.say(templates::after_hours_landline_script(&tenant.name))
				.record("/voice/voicemail", VOICEMAIL_MAX_SECS, '#')
		} else {
			response.say(templates::after_hours_mobile_script(&tenant.name)).hangup()
		};

		// Landlines cannot receive texts; they go down the voicemail path.
		if !is_landline && phone::is_plausible_number(&req.from) {
			self.enqueue_missed_call_texts(tenant, &req.from, &req.call_sid, lookup.caller_name)
				.await;
		}

		Ok(VoiceReply { twiml: response.render() })
	}

	/// The missed-call text pair: templated SMS to the caller, click-to-call
	/// alert to the operator. Shared by the sleep branch and the dial-status
	/// callback.
	pub(crate) async fn enqueue_missed_call_texts(
		&self,
		tenant: &Tenant,
		caller: &str,
		external_base: &str,
		caller_name: Option<String>,
	) {
		let sms_body = templates::missed_call_sms(&tenant.name);

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				caller,
				&sms_body,
				OutboundKind::Standard,
				Some(external_base),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue missed-call SMS.");
		}

		let clean_name = caller_name.as_deref().unwrap_or("New Customer");
		let alert = templates::missed_call_operator_alert(&tenant.name, clean_name, caller);

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&tenant.operator_number,
				&alert,
				OutboundKind::Internal,
				Some(&format!("{external_base}:operator")),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue operator alert.");
		}
	}
}

fn validate_voice_input(req: &VoiceRequest) -> std::result::Result<(), String> {
	if req.from.trim().is_empty() {
		return Err("Missing 'From' number.".to_string());
	}
	if req.to.trim().is_empty() {
		return Err("Missing 'To' number.".to_string());
	}
	if req.call_sid.trim().is_empty() {
		return Err("Missing 'CallSid'.".to_string());
	}
	if req.from.trim().len() < 7 {
		return Err(format!("Invalid 'From' number: {}.", mask_phone(&req.from)));
	}

	Ok(())
}
