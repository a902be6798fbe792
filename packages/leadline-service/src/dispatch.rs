//! One dispatcher cycle: claim due rows, re-run the safety gate (an
//! opt-out can land between enqueue and send), send with a bounded
//! timeout, finalize. A finalize failure leaves the row `processing`; the
//! stuck branch of the next claim recovers it.

use std::time::Duration as StdDuration;

use leadline_domain::mask_phone;
use leadline_storage::{
	leads, logs,
	models::{
		Direction, LeadStatus, OutboundKind, OutboundMessage, OutboundStatus, Tenant,
	},
	outbox, tenants,
};
use uuid::Uuid;

use crate::{LeadlineService, Rejection, Result};

/// Terminal disposition of one dispatch attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
	Sent { provider_message_id: String },
	Retrying,
	DeadLettered,
	Deferred,
	Rejected(Rejection),
}

impl LeadlineService {
	/// Claims and dispatches one batch. Returns the number of rows
	/// claimed, which the caller's adaptive polling keys off.
	pub async fn process_outbox_once(&self) -> Result<usize> {
		let rows = outbox::claim_due(
			&self.db,
			self.now(),
			self.cfg.dispatcher.stuck_timeout_secs,
			self.cfg.dispatcher.claim_limit,
		)
		.await?;
		let claimed = rows.len();

		if claimed > 0 {
			tracing::info!(%claimed, "Processing outbound queue.");
		}

		for row in rows {
			// A row failure never takes the worker down with it.
			let outcome = self.dispatch_row(&row).await;

			match outcome {
				Ok(outcome) => {
					tracing::debug!(id = %row.id, ?outcome, "Dispatch finished.");
				},
				Err(err) => {
					// The row stays `processing` and the stuck claim will
					// recover it after the timeout.
					tracing::error!(
						id = %row.id,
						error = %err,
						"Dispatch failed before finalize. Stuck-claim recovery will retry."
					);
				},
			}
		}

		Ok(claimed)
	}

	async fn dispatch_row(&self, row: &OutboundMessage) -> Result<DispatchOutcome> {
		let now = self.now();
		let max_retries = self.cfg.dispatcher.max_retries;

		// Rows that somehow exhausted their budget while pending go
		// straight to the dead letter.
		if row.attempts >= max_retries {
			outbox::mark_failed(&self.db, row.id, OutboundStatus::FailedPermanent, row.attempts, now)
				.await?;
			self.dead_letter_alert(row).await;

			return Ok(DispatchOutcome::DeadLettered);
		}

		let tenant = match row.tenant_id {
			Some(tenant_id) => tenants::by_id(&self.db, tenant_id).await?,
			None => None,
		};
		let kind = row.kind();
		let draft = match self
			.authorize_outbound(tenant.as_ref(), &row.to_number, &row.body, kind, true)
			.await?
		{
			Ok(draft) => draft,
			Err(Rejection::QuietHours) => {
				tracing::info!(
					id = %row.id,
					to = %mask_phone(&row.to_number),
					"Holding message for quiet hours."
				);
				outbox::mark_deferred(&self.db, row.id, now).await?;

				return Ok(DispatchOutcome::Deferred);
			},
			Err(rejection) => {
				let status = match rejection {
					Rejection::OptOut => OutboundStatus::FailedOptOut,
					_ => OutboundStatus::FailedSafety,
				};

				tracing::warn!(
					id = %row.id,
					to = %mask_phone(&row.to_number),
					reason = rejection.as_str(),
					"Dropping claimed message."
				);
				outbox::mark_failed(&self.db, row.id, status, row.attempts, now).await?;

				return Ok(DispatchOutcome::Rejected(rejection));
			},
		};

		if draft.body != row.body {
			// Persist the footer so a retry cannot append it twice. Send
			// the mutated body regardless.
			if let Err(err) = outbox::update_body(&self.db, row.id, &draft.body).await {
				tracing::warn!(id = %row.id, error = %err, "Failed to persist body mutation.");
			}
		}

		tracing::info!(
			id = %row.id,
			to = %mask_phone(&row.to_number),
			attempt = row.attempts + 1,
			"Sending outbound message."
		);

		let attempts = row.attempts + 1;

		match self.send_bounded(&row.to_number, &draft.body).await {
			Ok(provider_message_id) => {
				outbox::mark_sent(&self.db, row.id, attempts, &provider_message_id, self.now())
					.await?;
				self.record_delivery(row, tenant.as_ref(), &draft.body).await;

				Ok(DispatchOutcome::Sent { provider_message_id })
			},
			Err(err) if err.is_transient() => {
				if attempts >= max_retries {
					outbox::mark_failed(
						&self.db,
						row.id,
						OutboundStatus::FailedPermanent,
						attempts,
						self.now(),
					)
					.await?;
					self.dead_letter_alert(row).await;

					Ok(DispatchOutcome::DeadLettered)
				} else {
					tracing::warn!(
						id = %row.id,
						error = %err,
						attempt = attempts,
						max = max_retries,
						"Transient send failure. Retry scheduled."
					);
					outbox::mark_retry(&self.db, row.id, attempts, self.now()).await?;

					Ok(DispatchOutcome::Retrying)
				}
			},
			Err(err) => {
				tracing::error!(id = %row.id, error = %err, "Permanent provider rejection.");
				outbox::mark_failed(
					&self.db,
					row.id,
					OutboundStatus::FailedPermanent,
					attempts,
					self.now(),
				)
				.await?;
				self.dead_letter_alert(row).await;

				Ok(DispatchOutcome::DeadLettered)
			},
		}
	}

	/// Safe mode resolves sends locally; real sends get the provider call
	/// wrapped in an outer timeout so a wedged connection reads as a
	/// transient failure.
	async fn send_bounded(&self, to: &str, body: &str) -> leadline_providers::Result<String> {
		if self.cfg.messaging.safe_mode {
			tracing::warn!(to = %mask_phone(to), "Safe mode: send mocked.");

			return Ok(format!("safe_{}", Uuid::new_v4().simple()));
		}

		let budget = StdDuration::from_millis(self.cfg.telephony.timeout_ms + 1_000);

		match tokio::time::timeout(budget, self.gateway.send(&self.cfg.telephony, to, body)).await {
			Ok(result) => result,
			Err(_) => Err(leadline_providers::Error::Transient {
				message: "Gateway send timed out.".to_string(),
			}),
		}
	}

	/// Post-send bookkeeping: conversation log and the lead's advance to
	/// `contacted`. Failures here are logged and absorbed; the message is
	/// already on the wire.
	async fn record_delivery(&self, row: &OutboundMessage, tenant: Option<&Tenant>, body: &str) {
		if row.kind() == OutboundKind::Internal {
			return;
		}

		let now = self.now();
		let lead =
			leads::upsert_contact(&self.db, tenant.map(|t| t.id), &row.to_number, None, now).await;

		match lead {
			Ok((lead_id, _)) => {
				if let Err(err) = logs::append(
					&self.db.pool,
					tenant.map(|t| t.id),
					lead_id,
					Direction::Outbound,
					body,
					Some(&format!("out_{}", row.id)),
					now,
				)
				.await
				{
					tracing::warn!(id = %row.id, error = %err, "Failed to log outbound event.");
				}
			},
			Err(err) => {
				tracing::warn!(id = %row.id, error = %err, "Failed to upsert lead after send.");
			},
		}

		if let Err(err) =
			leads::set_status(&self.db, tenant.map(|t| t.id), &row.to_number, LeadStatus::Contacted)
				.await
		{
			tracing::warn!(id = %row.id, error = %err, "Failed to advance lead status.");
		}
	}

	async fn dead_letter_alert(&self, row: &OutboundMessage) {
		let masked = mask_phone(&row.to_number);

		tracing::error!(
			id = %row.id,
			to = %masked,
			attempts = row.attempts,
			"Message moved to the dead letter."
		);
		self.critical_alert(
			"SMS dead-letter queue",
			&leadline_domain::templates::dead_letter_alert(
				&row.id.to_string(),
				&masked,
				row.attempts,
			),
		)
		.await;
	}
}
