use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
	/// This provider_id had not been seen; the insert established the
	/// happens-before for all side effects keyed on it.
	Recorded,
	/// Already processed; carries the original internal id.
	Duplicate(Uuid),
}

/// Insert-first idempotency. The unique index on provider_id is the
/// arbiter; losing the race is reported as `Duplicate`.
pub async fn record(
	db: &Db,
	provider_id: &str,
	kind: &str,
	tenant_id: Option<Uuid>,
	internal_id: Uuid,
	now: OffsetDateTime,
) -> Result<RecordOutcome> {
	let inserted: Option<(Uuid,)> = sqlx::query_as(
		"\
INSERT INTO webhook_events (id, provider_id, kind, tenant_id, processed_at, internal_id)
VALUES ($1,$2,$3,$4,$5,$6)
ON CONFLICT (provider_id) DO NOTHING
RETURNING id",
	)
	.bind(Uuid::new_v4())
	.bind(provider_id)
	.bind(kind)
	.bind(tenant_id)
	.bind(now)
	.bind(internal_id)
	.fetch_optional(&db.pool)
	.await?;

	if inserted.is_some() {
		return Ok(RecordOutcome::Recorded);
	}

	let existing: Option<(Uuid,)> =
		sqlx::query_as("SELECT internal_id FROM webhook_events WHERE provider_id = $1")
			.bind(provider_id)
			.fetch_optional(&db.pool)
			.await?;

	// The row vanished between the conflict and the read only if someone
	// truncated the table; treat it as a duplicate of an unknown event.
	Ok(RecordOutcome::Duplicate(existing.map(|(id,)| id).unwrap_or(internal_id)))
}

pub async fn find(db: &Db, provider_id: &str) -> Result<Option<Uuid>> {
	let row: Option<(Uuid,)> =
		sqlx::query_as("SELECT internal_id FROM webhook_events WHERE provider_id = $1")
			.bind(provider_id)
			.fetch_optional(&db.pool)
			.await?;

	Ok(row.map(|(id,)| id))
}

/// Rows only need to outlast the provider's retry window.
pub async fn purge_older_than(db: &Db, cutoff: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
		.bind(cutoff)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}
