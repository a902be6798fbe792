//! Operator-alert coalescing buffer. At most one open buffer exists per
//! (tenant, customer); every inbound bump appends the text and pushes
//! `send_at` out, so the sweep only fires after a quiescence window.

use time::OffsetDateTime;
use uuid::Uuid;

use sqlx::PgExecutor;

use crate::{Result, db::Db, models::AlertBufferEntry};

/// Upserts the buffer row for `(tenant, customer)`. The upsert is a single
/// statement, so bumps serialize against each other and against a sweep
/// holding the row lock.
pub async fn bump(
	db: &Db,
	tenant_id: Uuid,
	customer_phone: &str,
	operator_phone: &str,
	text: &str,
	send_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO alert_buffer (tenant_id, customer_phone, operator_phone, coalesced_text, \
		 message_count, send_at, created_at)
VALUES ($1,$2,$3,$4,1,$5,$6)
ON CONFLICT (tenant_id, customer_phone) DO UPDATE
SET coalesced_text = alert_buffer.coalesced_text || E'\\n' || EXCLUDED.coalesced_text,
	message_count = alert_buffer.message_count + 1,
	send_at = EXCLUDED.send_at",
	)
	.bind(tenant_id)
	.bind(customer_phone)
	.bind(operator_phone)
	.bind(text)
	.bind(send_at)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Selects quiescent buffers inside the sweep transaction, row-locked so
/// concurrent sweepers skip them and concurrent bumps block until the
/// sweep commits.
pub async fn due_for_update<'e, E>(
	executor: E,
	now: OffsetDateTime,
) -> Result<Vec<AlertBufferEntry>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, AlertBufferEntry>(
		"SELECT * FROM alert_buffer WHERE send_at <= $1 ORDER BY send_at ASC FOR UPDATE SKIP \
		 LOCKED",
	)
	.bind(now)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("DELETE FROM alert_buffer WHERE id = $1").bind(id).execute(executor).await?;

	Ok(())
}

pub async fn pending_count(db: &Db) -> Result<i64> {
	let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alert_buffer")
		.fetch_one(&db.pool)
		.await?;

	Ok(count)
}
