//! Operator-alert debouncing. Rapid-fire texts from one customer coalesce
//! into a single buffered alert that only fires after 30 s of quiet.

use time::Duration;

use leadline_domain::{mask_phone, templates};
use leadline_storage::{
	alert_buffer,
	models::{OutboundKind, Tenant},
	outbox::{self, EnqueueRow, NewOutbound},
};

use crate::{LeadlineService, Result};

impl LeadlineService {
	/// Upserts into the buffer and pushes the quiescence deadline out.
	pub async fn buffer_alert(&self, tenant: &Tenant, customer_phone: &str, text: &str) -> Result<()> {
		let now = self.now();
		let send_at = now + Duration::seconds(self.cfg.dispatcher.alert_debounce_secs);

		alert_buffer::bump(
			&self.db,
			tenant.id,
			customer_phone,
			&tenant.operator_number,
			text,
			send_at,
			now,
		)
		.await?;

		tracing::info!(customer = %mask_phone(customer_phone), "Buffered operator alert.");

		Ok(())
	}

	/// Releases quiescent buffers: one coalesced alert per buffer, then the
	/// buffer row dies. The whole cycle runs in one transaction with the
	/// buffer rows locked, so a concurrent bump on the same key waits and
	/// then opens a fresh buffer.
	pub async fn sweep_alerts(&self) -> Result<usize> {
		let now = self.now();
		let mut tx = self.db.pool.begin().await?;
		let due = alert_buffer::due_for_update(&mut *tx, now).await?;

		if due.is_empty() {
			tx.rollback().await?;

			return Ok(0);
		}

		let mut released = 0;

		for entry in due {
			let body = templates::coalesced_alert(
				&entry.customer_phone,
				entry.message_count,
				&entry.coalesced_text,
			);
			let draft = match self
				.authorize_outbound(None, &entry.operator_phone, &body, OutboundKind::Internal, false)
				.await?
			{
				Ok(draft) => draft,
				Err(rejection) => {
					tracing::warn!(
						operator = %mask_phone(&entry.operator_phone),
						reason = rejection.as_str(),
						"Dropping buffered alert."
					);
					alert_buffer::delete(&mut *tx, entry.id).await?;

					continue;
				},
			};
			// Deterministic per quiescence window, so a crashed sweep that
			// already enqueued cannot double-send after recovery.
			let external_id = format!("buf_{}_{}", entry.id, entry.send_at.unix_timestamp());
			let row = outbox::enqueue(
				&mut *tx,
				NewOutbound {
					tenant_id: Some(entry.tenant_id),
					to_number: &entry.operator_phone,
					body: &draft.body,
					kind: OutboundKind::Internal,
					external_id: Some(&external_id),
					scheduled_for: None,
				},
				now,
			)
			.await?;

			if matches!(row, EnqueueRow::Inserted(_)) {
				released += 1;
			}

			alert_buffer::delete(&mut *tx, entry.id).await?;
		}

		tx.commit().await?;

		if released > 0 {
			tracing::info!(%released, "Released buffered alert groups to the queue.");
		}

		Ok(released)
	}
}
