//! Read-only dashboard queries plus the assistant toggle. The UI itself
//! lives elsewhere; these are the endpoints it consumes.

use uuid::Uuid;

use leadline_storage::{
	leads, logs, outbox,
	models::{ActivityEntry, Lead, OutboundMessage},
	stats::{self, FunnelStats, RevenueStats},
	tenants,
};

use crate::{Error, LeadlineService, Result};

const DEFAULT_FEED_LIMIT: i64 = 50;

impl LeadlineService {
	pub async fn dashboard_activity(&self, tenant_id: Uuid) -> Result<Vec<ActivityEntry>> {
		Ok(logs::recent(&self.db, tenant_id, DEFAULT_FEED_LIMIT).await?)
	}

	pub async fn dashboard_funnel(&self, tenant_id: Uuid) -> Result<FunnelStats> {
		Ok(stats::funnel(&self.db, tenant_id).await?)
	}

	pub async fn dashboard_revenue(&self, tenant_id: Uuid) -> Result<RevenueStats> {
		if tenants::by_id(&self.db, tenant_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("Tenant {tenant_id} not found.") });
		}

		Ok(stats::revenue(&self.db, tenant_id).await?)
	}

	pub async fn dashboard_leads(&self, tenant_id: Uuid) -> Result<Vec<Lead>> {
		Ok(leads::list_recent(&self.db, tenant_id, DEFAULT_FEED_LIMIT).await?)
	}

	pub async fn dashboard_queue(&self) -> Result<Vec<OutboundMessage>> {
		Ok(outbox::recent(&self.db, DEFAULT_FEED_LIMIT).await?)
	}

	/// The global pause: `ai_active = false` forwards calls and texts to
	/// the operator untouched.
	pub async fn set_ai_active(&self, tenant_id: Uuid, active: bool) -> Result<()> {
		if !tenants::set_ai_active(&self.db, tenant_id, active).await? {
			return Err(Error::NotFound { message: format!("Tenant {tenant_id} not found.") });
		}

		tracing::info!(%tenant_id, %active, "Assistant toggle updated.");

		Ok(())
	}
}
