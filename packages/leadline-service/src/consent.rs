//! Consent ledger operations plus the combined STOP path. Ordering is
//! load-bearing: the opt-out write and the global revocation both commit
//! before the caller may enqueue the STOP acknowledgement, so every later
//! enqueue observes the opt-out.

use serde_json::Value;
use uuid::Uuid;

use leadline_domain::mask_phone;
use leadline_storage::{
	consent::{self, NewConsent},
	leads,
	models::{ConsentKind, ConsentSource},
};

use crate::{LeadlineService, Result};

impl LeadlineService {
	/// Implied grant, written automatically on inbound calls and texts.
	pub async fn record_implied_consent(
		&self,
		tenant_id: Option<Uuid>,
		phone: &str,
		source: ConsentSource,
		metadata: Value,
	) -> Result<Uuid> {
		self.record_consent(tenant_id, phone, ConsentKind::Implied, source, metadata).await
	}

	/// Express grant; only START/UNSTOP and form submissions produce these.
	pub async fn record_express_consent(
		&self,
		tenant_id: Option<Uuid>,
		phone: &str,
		source: ConsentSource,
		metadata: Value,
	) -> Result<Uuid> {
		self.record_consent(tenant_id, phone, ConsentKind::Express, source, metadata).await
	}

	async fn record_consent(
		&self,
		tenant_id: Option<Uuid>,
		phone: &str,
		kind: ConsentKind,
		source: ConsentSource,
		metadata: Value,
	) -> Result<Uuid> {
		let now = self.now();
		let (lead_id, _) = leads::upsert_contact(&self.db, tenant_id, phone, None, now).await?;
		let id = consent::record(
			&self.db.pool,
			NewConsent { lead_id, tenant_id, phone, kind, source, metadata },
			now,
		)
		.await?;

		tracing::info!(
			phone = %mask_phone(phone),
			kind = kind.as_str(),
			source = source.as_str(),
			"Consent recorded."
		);

		Ok(id)
	}

	/// The full opt-out: permanent lead flag (cross-tenant), queued-message
	/// cancellation, global consent revocation, cache poisoning. Raises a
	/// critical alert on failure; a lost STOP is a compliance incident.
	pub async fn process_stop(&self, phone: &str, reason: &str) -> Result<()> {
		let now = self.now();
		let result: Result<()> = async {
			leads::set_opt_out(&self.db, phone, true, now).await?;
			consent::revoke_all(&self.db.pool, phone, reason, now).await?;

			Ok(())
		}
		.await;

		if let Err(err) = &result {
			self.critical_alert(
				"Opt-out processing failed",
				&format!("Failed to opt out {}: {err}", mask_phone(phone)),
			)
			.await;
		}

		self.opt_out_cache.insert(phone.to_string(), true).await;

		tracing::warn!(phone = %mask_phone(phone), %reason, "Opt-out processed.");

		result
	}

	/// START/UNSTOP: clears the opt-out flag and records an express grant.
	pub async fn process_resubscribe(
		&self,
		tenant_id: Option<Uuid>,
		phone: &str,
		metadata: Value,
	) -> Result<()> {
		leads::set_opt_out(&self.db, phone, false, self.now()).await?;
		self.opt_out_cache.insert(phone.to_string(), false).await;
		self.record_express_consent(tenant_id, phone, ConsentSource::InboundSms, metadata).await?;

		Ok(())
	}
}
