//! Scheduled follow-up ("nudge"): a delayed outbound keyed by the caller,
//! cancelled by any inbound non-STOP reply.

use time::Duration;

use leadline_domain::templates;
use leadline_storage::{models::OutboundKind, models::Tenant, outbox};

use crate::{EnqueueOutcome, LeadlineService, Result};

fn nudge_key(caller: &str) -> String {
	format!("nudge_{caller}")
}

impl LeadlineService {
	/// Queues the follow-up for `now + delay`. The external id keys the
	/// nudge to the caller, so scheduling twice is a no-op and
	/// cancellation can find it.
	pub async fn schedule_nudge(
		&self,
		tenant: &Tenant,
		caller: &str,
		delay: Duration,
	) -> Result<EnqueueOutcome> {
		let body = templates::nudge_sms(&tenant.name);
		let scheduled_for = self.now() + delay;

		self.enqueue_message(
			Some(tenant),
			caller,
			&body,
			OutboundKind::Standard,
			Some(&nudge_key(caller)),
			Some(scheduled_for),
		)
		.await
	}

	/// Cancels every outstanding nudge for the caller. Returns the number
	/// of rows cancelled.
	pub async fn cancel_nudges(&self, caller: &str) -> Result<u64> {
		Ok(outbox::cancel_matching(&self.db.pool, &nudge_key(caller)).await?)
	}
}
