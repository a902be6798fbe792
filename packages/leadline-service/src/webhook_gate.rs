//! Webhook idempotency guard. The webhook_events insert is the
//! happens-before for every side effect keyed on a provider id; the moka
//! cache is a fast duplicate path and the only answer left when the store
//! is down.

use uuid::Uuid;

use leadline_storage::webhooks::{self, RecordOutcome};

use crate::LeadlineService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
	/// First sighting; side effects for this provider id may proceed.
	Fresh { internal_id: Uuid },
	Duplicate { internal_id: Uuid },
	/// The store could not answer. The caller responds success to the
	/// provider and pushes the raw event onto the deferred replay queue;
	/// replay re-enters this gate once the store is back.
	StoreUnavailable,
}

impl LeadlineService {
	pub(crate) async fn gate_webhook(
		&self,
		provider_id: &str,
		kind: &str,
		tenant_id: Option<Uuid>,
	) -> GateOutcome {
		if let Some(internal_id) = self.webhook_cache.get(provider_id).await {
			return GateOutcome::Duplicate { internal_id };
		}

		let internal_id = Uuid::new_v4();
		let recorded =
			webhooks::record(&self.db, provider_id, kind, tenant_id, internal_id, self.now()).await;

		match recorded {
			Ok(RecordOutcome::Recorded) => {
				self.webhook_cache.insert(provider_id.to_string(), internal_id).await;

				GateOutcome::Fresh { internal_id }
			},
			Ok(RecordOutcome::Duplicate(existing)) => {
				self.webhook_cache.insert(provider_id.to_string(), existing).await;

				GateOutcome::Duplicate { internal_id: existing }
			},
			Err(err) => {
				tracing::warn!(
					%provider_id,
					error = %err,
					"Idempotency ledger unavailable. Deferring webhook."
				);

				GateOutcome::StoreUnavailable
			},
		}
	}
}
