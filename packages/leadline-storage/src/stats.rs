//! Simple counters consumed by the dashboard and the queue-health
//! watchdog. Read-only.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::LeadStatus};

#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct FunnelStats {
	pub new: i64,
	pub contacted: i64,
	pub replied: i64,
	pub booked: i64,
	pub lost: i64,
	pub total: i64,
}

#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct RevenueStats {
	pub emergency_leads: i64,
	pub average_job_value: i64,
	pub revenue_saved: i64,
}

pub async fn funnel(db: &Db, tenant_id: Uuid) -> Result<FunnelStats> {
	let rows: Vec<(String, i64)> = sqlx::query_as(
		"SELECT status, COUNT(*) FROM leads WHERE tenant_id = $1 GROUP BY status",
	)
	.bind(tenant_id)
	.fetch_all(&db.pool)
	.await?;
	let mut stats = FunnelStats::default();

	for (status, count) in rows {
		match LeadStatus::parse(&status) {
			Some(LeadStatus::New) => stats.new = count,
			Some(LeadStatus::Contacted) => stats.contacted = count,
			Some(LeadStatus::Replied) => stats.replied = count,
			Some(LeadStatus::Booked) => stats.booked = count,
			Some(LeadStatus::Lost) => stats.lost = count,
			None => continue,
		}

		stats.total += count;
	}

	Ok(stats)
}

/// Revenue estimate = emergency-lead count x the tenant's average job
/// value.
pub async fn revenue(db: &Db, tenant_id: Uuid) -> Result<RevenueStats> {
	let (average_job_value,): (i64,) =
		sqlx::query_as("SELECT average_job_value FROM tenants WHERE id = $1")
			.bind(tenant_id)
			.fetch_one(&db.pool)
			.await?;
	let (emergency_leads,): (i64,) = sqlx::query_as(
		"SELECT COUNT(*) FROM leads WHERE tenant_id = $1 AND intent = 'emergency'",
	)
	.bind(tenant_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(RevenueStats {
		emergency_leads,
		average_job_value,
		revenue_saved: emergency_leads * average_job_value,
	})
}

/// Pending rows older than `cutoff`; a growing count means the dispatchers
/// are wedged or the provider is down.
pub async fn stuck_pending_count(db: &Db, cutoff: OffsetDateTime) -> Result<i64> {
	let (count,): (i64,) = sqlx::query_as(
		"SELECT COUNT(*) FROM sms_outbox WHERE status = 'pending' AND created_at < $1",
	)
	.bind(cutoff)
	.fetch_one(&db.pool)
	.await?;

	Ok(count)
}

pub async fn recent_failure_count(db: &Db, since: OffsetDateTime) -> Result<i64> {
	let (count,): (i64,) = sqlx::query_as(
		"SELECT COUNT(*) FROM sms_outbox WHERE status LIKE 'failed%' AND last_attempt_at > $1",
	)
	.bind(since)
	.fetch_one(&db.pool)
	.await?;

	Ok(count)
}

pub async fn leads_created_since(db: &Db, since: OffsetDateTime) -> Result<i64> {
	let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads WHERE created_at > $1")
		.bind(since)
		.fetch_one(&db.pool)
		.await?;

	Ok(count)
}
