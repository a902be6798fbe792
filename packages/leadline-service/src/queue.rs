//! Safety-gated enqueue: the single seam between the routers and the
//! durable queue.

use time::OffsetDateTime;
use uuid::Uuid;

use leadline_domain::mask_phone;
use leadline_storage::{
	models::{OutboundKind, Tenant},
	outbox::{self, EnqueueRow, NewOutbound},
};

use crate::{LeadlineService, Rejection, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
	Queued(Uuid),
	/// Same external_id already queued; the prior row wins.
	Deduplicated,
	Rejected(Rejection),
}

impl LeadlineService {
	pub async fn enqueue_message(
		&self,
		tenant: Option<&Tenant>,
		to: &str,
		body: &str,
		kind: OutboundKind,
		external_id: Option<&str>,
		scheduled_for: Option<OffsetDateTime>,
	) -> Result<EnqueueOutcome> {
		// Quiet hours are not enforced here; a row queued at night is held
		// by the dispatcher until the window opens.
		let draft = match self.authorize_outbound(tenant, to, body, kind, false).await? {
			Ok(draft) => draft,
			Err(rejection) => {
				tracing::warn!(
					to = %mask_phone(to),
					reason = rejection.as_str(),
					"Dropping outbound draft."
				);

				return Ok(EnqueueOutcome::Rejected(rejection));
			},
		};
		let row = outbox::enqueue(
			&self.db.pool,
			NewOutbound {
				tenant_id: tenant.map(|t| t.id),
				to_number: to,
				body: &draft.body,
				kind,
				external_id,
				scheduled_for,
			},
			self.now(),
		)
		.await?;

		Ok(match row {
			EnqueueRow::Inserted(id) => {
				if scheduled_for.is_some() {
					tracing::info!(to = %mask_phone(to), %id, "Scheduled outbound message.");
				} else {
					tracing::info!(to = %mask_phone(to), %id, "Queued outbound message.");
				}

				EnqueueOutcome::Queued(id)
			},
			EnqueueRow::Duplicate => {
				tracing::info!(
					to = %mask_phone(to),
					external_id = external_id.unwrap_or_default(),
					"Skipped duplicate outbound message."
				);

				EnqueueOutcome::Deduplicated
			},
		})
	}
}
