use time::OffsetDateTime;
use uuid::Uuid;

use sqlx::PgExecutor;

use crate::{
	Result,
	db::Db,
	models::{ActivityEntry, Direction},
};

/// Appends a conversation event for a lead. The unique external_id makes
/// the append idempotent under webhook replays.
pub async fn append<'e, E>(
	executor: E,
	tenant_id: Option<Uuid>,
	lead_id: Uuid,
	direction: Direction,
	body: &str,
	external_id: Option<&str>,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO conversation_logs (id, tenant_id, lead_id, direction, body, external_id, created_at)
VALUES ($1,$2,$3,$4,$5,$6,$7)
ON CONFLICT (external_id) DO NOTHING",
	)
	.bind(Uuid::new_v4())
	.bind(tenant_id)
	.bind(lead_id)
	.bind(direction.as_str())
	.bind(body)
	.bind(external_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

/// Recent activity for the dashboard feed, newest first.
pub async fn recent(db: &Db, tenant_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>> {
	let rows = sqlx::query_as::<_, ActivityEntry>(
		"\
SELECT c.id, c.direction, c.body, c.created_at, l.phone AS lead_phone, l.intent AS lead_intent
FROM conversation_logs c
JOIN leads l ON c.lead_id = l.id
WHERE c.tenant_id = $1
ORDER BY c.created_at DESC
LIMIT $2",
	)
	.bind(tenant_id)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
