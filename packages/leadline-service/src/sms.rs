//! Inbound-text routing. A strict priority ladder: provider status echoes,
//! STOP, auto-reply immunity, HELP, START/UNSTOP, the assistant
//! kill-switch, review feedback, then urgency classification. STOP works
//! before any lead-state writes so an opt-out can never be lost to a
//! downstream failure.

use serde_json::json;

use leadline_domain::{
	classify::{self, InboundKind},
	mask_phone, templates,
};
use leadline_providers::twiml;
use leadline_storage::{
	leads, logs,
	models::{ConsentSource, Direction, LeadIntent, LeadStatus, OutboundKind, Tenant},
	tenants,
};

use crate::{GateOutcome, LeadlineService, Result};

/// Provider delivery-lifecycle echoes that must never be answered;
/// replying to one starts an infinite loop with the provider.
const STATUS_ECHOES: &[&str] = &["sent", "delivered", "undelivered", "failed", "queued", "sending"];

#[derive(Clone, Debug)]
pub struct SmsRequest {
	pub from: String,
	pub to: String,
	pub body: String,
	pub message_sid: String,
	pub sms_status: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SmsReply {
	pub twiml: String,
}
impl SmsReply {
	fn empty() -> Self {
		Self { twiml: twiml::empty_message_response() }
	}

	fn message(body: &str) -> Self {
		Self { twiml: twiml::message_response(body) }
	}
}

impl LeadlineService {
	pub async fn handle_sms(&self, req: SmsRequest) -> Result<SmsReply> {
		if self.cfg.messaging.kill_switch {
			tracing::warn!("Kill switch active. Rejecting incoming SMS.");

			return Ok(SmsReply::empty());
		}

		if let Some(status) = req.sms_status.as_deref()
			&& STATUS_ECHOES.contains(&status)
		{
			tracing::info!(%status, message_sid = %req.message_sid, "Ignoring status echo.");

			return Ok(SmsReply::empty());
		}

		if let Err(message) = validate_sms_input(&req) {
			self.critical_alert("Invalid SMS webhook", &message).await;

			return Ok(SmsReply::empty());
		}

		match self.gate_webhook(&req.message_sid, "sms", None).await {
			GateOutcome::Fresh { .. } => {},
			GateOutcome::Duplicate { internal_id } => {
				tracing::info!(
					message_sid = %req.message_sid,
					%internal_id,
					"Duplicate SMS webhook ignored."
				);

				return Ok(SmsReply::empty());
			},
			GateOutcome::StoreUnavailable => {
				self.defer_event(crate::DeferredEvent::Sms(req.clone()));

				return Ok(SmsReply::empty());
			},
		}

		let tenant = match tenants::by_inbound_number(&self.db, &req.to).await {
			Ok(Some(tenant)) => tenant,
			Ok(None) => {
				self.critical_alert(
					"Tenant resolution failed (SMS)",
					&format!("No tenant owns {}. MessageSid: {}", req.to, req.message_sid),
				)
				.await;

				return Ok(SmsReply::empty());
			},
			Err(err) => {
				tracing::error!(error = %err, "Tenant lookup failed.");

				return Ok(SmsReply::empty());
			},
		};

		if self.rate_limit_exceeded(tenant.id).await {
			return Ok(SmsReply::empty());
		}

		tracing::info!(
			from = %mask_phone(&req.from),
			body = %mask_phone(&req.body),
			tenant = %tenant.name,
			"Incoming SMS."
		);

		match classify::classify_inbound(&req.body) {
			InboundKind::StopRequest { keyword } => self.handle_stop(&tenant, &req, keyword).await,
			InboundKind::AutoReply => {
				tracing::warn!(
					from = %mask_phone(&req.from),
					"Auto-reply detected. Killing the response loop."
				);

				let body = format!("(Auto-Reply) {}", req.body);

				self.log_inbound(&tenant, &req.from, &body, &req.message_sid).await;

				Ok(SmsReply::empty())
			},
			kind => {
				// Every non-STOP inbound advances lead state: log, implied
				// consent, replied, and any pending nudge dies.
				self.advance_lead_state(&tenant, &req).await;

				match kind {
					InboundKind::HelpRequest =>
						Ok(SmsReply::message(&templates::help_sms(&tenant.name))),
					InboundKind::Resubscribe => {
						if let Err(err) = self
							.process_resubscribe(
								Some(tenant.id),
								&req.from,
								json!({ "keyword": req.body }),
							)
							.await
						{
							tracing::error!(error = %err, "Failed to process resubscribe.");
						}

						Ok(SmsReply::empty())
					},
					_ if !tenant.ai_active => self.forward_raw(&tenant, &req).await,
					InboundKind::PositiveFeedback => self.handle_positive_feedback(&tenant, &req).await,
					InboundKind::NegativeFeedback => self.handle_negative_feedback(&tenant, &req).await,
					_ => self.handle_standard(&tenant, &req).await,
				}
			},
		}
	}

	async fn handle_stop(
		&self,
		tenant: &Tenant,
		req: &SmsRequest,
		keyword: &'static str,
	) -> Result<SmsReply> {
		tracing::warn!(
			from = %mask_phone(&req.from),
			%keyword,
			"Opt-out requested."
		);

		// Opt-out and revocation commit before the acknowledgement is
		// enqueued; every later enqueue observes the opt-out.
		let _ = self.process_stop(&req.from, &keyword.to_uppercase()).await;

		self.log_inbound(tenant, &req.from, &req.body, &req.message_sid).await;

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&req.from,
				&templates::stop_confirmation_sms(),
				OutboundKind::Compliance,
				Some(&format!("{}_stop_ack", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue opt-out confirmation.");
		}

		Ok(SmsReply::empty())
	}

	async fn forward_raw(&self, tenant: &Tenant, req: &SmsRequest) -> Result<SmsReply> {
		tracing::warn!(
			from = %mask_phone(&req.from),
			"Assistant paused for tenant. Forwarding SMS."
		);

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&tenant.operator_number,
				&templates::forwarded_sms(&req.from, &req.body),
				OutboundKind::Internal,
				Some(&format!("fwd_{}", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to forward message.");
		}

		self.submit_sheet_row(tenant, &req.from, &req.body, "Passthrough", "Manual").await;

		Ok(SmsReply::empty())
	}

	async fn handle_positive_feedback(&self, tenant: &Tenant, req: &SmsRequest) -> Result<SmsReply> {
		let Some(review_link) = tenant.review_link.as_deref() else {
			return Ok(SmsReply::empty());
		};

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&req.from,
				&templates::review_request_sms(&tenant.name, review_link),
				OutboundKind::Standard,
				Some(&format!("{}_review_link", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue review request.");
		}
		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&tenant.operator_number,
				&templates::review_operator_note(&req.from, &req.body),
				OutboundKind::Internal,
				Some(&format!("{}_review_note", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue review note.");
		}

		Ok(SmsReply::empty())
	}

	async fn handle_negative_feedback(&self, tenant: &Tenant, req: &SmsRequest) -> Result<SmsReply> {
		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&req.from,
				&templates::apology_sms(&tenant.name),
				OutboundKind::Standard,
				Some(&format!("{}_apology", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue apology.");
		}
		// Negative feedback is urgent; it skips the debouncer.
		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&tenant.operator_number,
				&templates::negative_feedback_alert(&req.body, &req.from),
				OutboundKind::Internal,
				Some(&format!("{}_neg_alert", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue negative-feedback alert.");
		}

		Ok(SmsReply::empty())
	}

	async fn handle_standard(&self, tenant: &Tenant, req: &SmsRequest) -> Result<SmsReply> {
		let report = classify::classify_urgency(&req.body);

		tracing::info!(
			urgency = report.urgency.as_str(),
			confidence = report.confidence,
			keywords = ?report.keywords_found,
			"Classified inbound message."
		);

		let caller_name = match leads::by_phone(&self.db, tenant.id, &req.from).await {
			Ok(Some(lead)) => lead.name,
			_ => None,
		};
		let clean_name = caller_name.as_deref().unwrap_or("New Customer");

		if report.is_emergency() {
			if let Err(err) =
				leads::set_intent(&self.db, Some(tenant.id), &req.from, LeadIntent::Emergency).await
			{
				tracing::warn!(error = %err, "Failed to tag lead intent.");
			}
			if let Err(err) = self
				.enqueue_message(
					Some(tenant),
					&req.from,
					&templates::emergency_ack_sms(&tenant.name),
					OutboundKind::Standard,
					Some(&format!("{}_emerg_ack", req.message_sid)),
					None,
				)
				.await
			{
				tracing::error!(error = %err, "Failed to queue emergency acknowledgement.");
			}
			// Emergencies bypass the debouncer and page the operator now.
			if let Err(err) = self
				.enqueue_message(
					Some(tenant),
					&tenant.operator_number,
					&templates::emergency_operator_alert(clean_name, &req.body, &req.from),
					OutboundKind::Internal,
					Some(&format!("{}_boss_alert", req.message_sid)),
					None,
				)
				.await
			{
				tracing::error!(error = %err, "Failed to queue emergency alert.");
			}

			self.submit_sheet_row(tenant, &req.from, &req.body, "Emergency", "Emergency").await;

			return Ok(SmsReply::empty());
		}

		let alert = templates::standard_alert_text(&req.body, clean_name, &req.from);

		if let Err(err) = self.buffer_alert(tenant, &req.from, &alert).await {
			tracing::error!(
				error = %err,
				"Failed to buffer alert. Falling back to immediate send."
			);

			let _ = self
				.enqueue_message(
					Some(tenant),
					&tenant.operator_number,
					&alert,
					OutboundKind::Internal,
					Some(&format!("{}_copy", req.message_sid)),
					None,
				)
				.await;
		}

		if let Err(err) = self
			.enqueue_message(
				Some(tenant),
				&req.from,
				&templates::standard_ack_sms(&tenant.name),
				OutboundKind::Standard,
				Some(&format!("{}_ack", req.message_sid)),
				None,
			)
			.await
		{
			tracing::error!(error = %err, "Failed to queue acknowledgement.");
		}

		self.submit_sheet_row(tenant, &req.from, &req.body, "Inquiry", "Inquiry").await;

		Ok(SmsReply::empty())
	}

	/// The common non-STOP bookkeeping: inbound log, implied consent,
	/// lead to `replied`, nudge cancellation. Failures are tolerated; the
	/// reply to the customer matters more than perfect bookkeeping.
	async fn advance_lead_state(&self, tenant: &Tenant, req: &SmsRequest) {
		self.log_inbound(tenant, &req.from, &req.body, &req.message_sid).await;

		if let Err(err) = self
			.record_implied_consent(
				Some(tenant.id),
				&req.from,
				ConsentSource::InboundSms,
				json!({ "MessageSid": req.message_sid, "to_number": req.to }),
			)
			.await
		{
			tracing::error!(error = %err, "Failed to record implied consent.");
		}
		if let Err(err) =
			leads::set_status(&self.db, Some(tenant.id), &req.from, LeadStatus::Replied).await
		{
			tracing::error!(error = %err, "Failed to update lead status.");
		}

		match self.cancel_nudges(&req.from).await {
			Ok(cancelled) if cancelled > 0 => {
				tracing::info!(
					from = %mask_phone(&req.from),
					%cancelled,
					"Cancelled pending nudge. The caller replied."
				);
			},
			Ok(_) => {},
			Err(err) => {
				tracing::warn!(error = %err, "Failed to cancel nudge.");
			},
		}
	}

	async fn log_inbound(&self, tenant: &Tenant, from: &str, body: &str, message_sid: &str) {
		let now = self.now();
		let lead = leads::upsert_contact(&self.db, Some(tenant.id), from, None, now).await;

		match lead {
			Ok((lead_id, _)) => {
				if let Err(err) = logs::append(
					&self.db.pool,
					Some(tenant.id),
					lead_id,
					Direction::Inbound,
					body,
					Some(message_sid),
					now,
				)
				.await
				{
					tracing::error!(error = %err, "Failed to log inbound event.");
				}
			},
			Err(err) => {
				tracing::error!(error = %err, "Failed to upsert lead for inbound log.");
			},
		}
	}

	async fn submit_sheet_row(
		&self,
		tenant: &Tenant,
		phone: &str,
		message: &str,
		intent: &str,
		status: &str,
	) {
		let Some(sheet_id) = tenant.sheet_id.clone() else {
			return;
		};

		self.jobs.submit(crate::Job::SheetAppend {
			sheet_id,
			row: json!({
				"phone": phone,
				"message": message,
				"intent": intent,
				"status": status,
			}),
		});
	}
}

fn validate_sms_input(req: &SmsRequest) -> std::result::Result<(), String> {
	if req.from.trim().is_empty() {
		return Err("Missing 'From' number.".to_string());
	}
	if req.to.trim().is_empty() {
		return Err("Missing 'To' number.".to_string());
	}
	if req.message_sid.trim().is_empty() {
		return Err("Missing 'MessageSid'.".to_string());
	}

	Ok(())
}
