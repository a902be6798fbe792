//! The durable outbound queue. Rows move `pending -> processing -> {sent,
//! pending (retry), failed_permanent, failed_optout, failed_safety,
//! cancelled}`; a `processing` row whose lock has aged past the stuck
//! timeout is claimable again, which is what recovers a worker that died
//! between claim and finalize.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use sqlx::PgExecutor;

use crate::{
	Result,
	db::Db,
	models::{OutboundKind, OutboundMessage, OutboundStatus},
};

const CLAIM_QUERY: &str = "\
UPDATE sms_outbox
SET status = 'processing', locked_at = $1
WHERE id IN (
	SELECT id
	FROM sms_outbox
	WHERE (
		status = 'pending'
			AND (scheduled_for IS NULL OR scheduled_for <= $1)
			AND (
				attempts = 0
					OR (attempts = 1 AND last_attempt_at <= $2)
					OR (attempts = 2 AND last_attempt_at <= $3)
					OR (attempts = 3 AND last_attempt_at <= $4)
					OR (attempts = 4 AND last_attempt_at <= $5)
					OR (attempts >= 5 AND last_attempt_at <= $6)
			)
	) OR (
		status = 'processing' AND (locked_at IS NULL OR locked_at <= $7)
	)
	ORDER BY created_at ASC, id ASC
	LIMIT $8
	FOR UPDATE SKIP LOCKED
)
RETURNING *";

#[derive(Clone, Debug)]
pub struct NewOutbound<'a> {
	pub tenant_id: Option<Uuid>,
	pub to_number: &'a str,
	pub body: &'a str,
	pub kind: OutboundKind,
	pub external_id: Option<&'a str>,
	pub scheduled_for: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueRow {
	Inserted(Uuid),
	/// The external_id already exists; the prior row is left unchanged.
	Duplicate,
}

/// Exponential backoff, in seconds since `last_attempt_at`, indexed by the
/// row's current attempt count.
pub fn backoff_secs(attempts: i32) -> i64 {
	match attempts {
		i32::MIN..=0 => 0,
		1 => 5,
		2 => 30,
		3 => 120,
		4 => 600,
		_ => 1_800,
	}
}

pub async fn enqueue<'e, E>(
	executor: E,
	new: NewOutbound<'_>,
	now: OffsetDateTime,
) -> Result<EnqueueRow>
where
	E: PgExecutor<'e>,
{
	let row: Option<(Uuid,)> = sqlx::query_as(
		"\
INSERT INTO sms_outbox (id, tenant_id, external_id, to_number, body, kind, status, created_at, \
		 scheduled_for)
VALUES ($1,$2,$3,$4,$5,$6,'pending',$7,$8)
ON CONFLICT (external_id) DO NOTHING
RETURNING id",
	)
	.bind(Uuid::new_v4())
	.bind(new.tenant_id)
	.bind(new.external_id)
	.bind(new.to_number)
	.bind(new.body)
	.bind(new.kind.as_str())
	.bind(now)
	.bind(new.scheduled_for)
	.fetch_optional(executor)
	.await?;

	Ok(match row {
		Some((id,)) => EnqueueRow::Inserted(id),
		None => EnqueueRow::Duplicate,
	})
}

/// Atomically claims up to `limit` due rows for exclusive handling. The
/// claim covers backoff-due pending rows plus stuck processing rows whose
/// lock is older than `stuck_timeout_secs`. `FOR UPDATE SKIP LOCKED`
/// guarantees no two dispatchers ever claim the same row.
pub async fn claim_due(
	db: &Db,
	now: OffsetDateTime,
	stuck_timeout_secs: i64,
	limit: i64,
) -> Result<Vec<OutboundMessage>> {
	let rows = sqlx::query_as::<_, OutboundMessage>(CLAIM_QUERY)
		.bind(now)
		.bind(now - Duration::seconds(backoff_secs(1)))
		.bind(now - Duration::seconds(backoff_secs(2)))
		.bind(now - Duration::seconds(backoff_secs(3)))
		.bind(now - Duration::seconds(backoff_secs(4)))
		.bind(now - Duration::seconds(backoff_secs(5)))
		.bind(now - Duration::seconds(stuck_timeout_secs))
		.bind(limit)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

pub async fn mark_sent(
	db: &Db,
	id: Uuid,
	attempts: i32,
	provider_message_id: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE sms_outbox
SET status = 'sent', attempts = $1, last_attempt_at = $2, sent_at = $2, provider_message_id = $3
WHERE id = $4",
	)
	.bind(attempts)
	.bind(now)
	.bind(provider_message_id)
	.bind(id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Returns the row to `pending` with an incremented attempt count; the
/// claim predicate holds it back until its backoff window elapses.
pub async fn mark_retry(db: &Db, id: Uuid, attempts: i32, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"UPDATE sms_outbox SET status = 'pending', attempts = $1, last_attempt_at = $2 WHERE id = \
		 $3",
	)
	.bind(attempts)
	.bind(now)
	.bind(id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Quiet-hours hold: back to `pending` with a fresh `last_attempt_at` but
/// the attempt count untouched, so deferrals never consume the retry
/// budget.
pub async fn mark_deferred(db: &Db, id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE sms_outbox SET status = 'pending', last_attempt_at = $1 WHERE id = $2")
		.bind(now)
		.bind(id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_failed(
	db: &Db,
	id: Uuid,
	status: OutboundStatus,
	attempts: i32,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"UPDATE sms_outbox SET status = $1, attempts = $2, last_attempt_at = $3 WHERE id = $4",
	)
	.bind(status.as_str())
	.bind(attempts)
	.bind(now)
	.bind(id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Persists a safety-gate body mutation (the compliance footer) so a retry
/// cannot append the footer twice.
pub async fn update_body(db: &Db, id: Uuid, body: &str) -> Result<()> {
	sqlx::query("UPDATE sms_outbox SET body = $1 WHERE id = $2")
		.bind(body)
		.bind(id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

/// Cancels every non-terminal row whose external_id starts with `prefix`.
pub async fn cancel_matching<'e, E>(executor: E, prefix: &str) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
	let result = sqlx::query(
		"\
UPDATE sms_outbox
SET status = 'cancelled'
WHERE external_id LIKE $1 ESCAPE '\\' AND status IN ('pending', 'processing')",
	)
	.bind(pattern)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Drops every queued message to a recipient after an opt-out. Part of the
/// opt-out transaction in `leads::set_opt_out`.
pub async fn fail_queued_for_recipient<'e, E>(executor: E, to_number: &str) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE sms_outbox
SET status = 'failed_optout'
WHERE to_number = $1 AND status IN ('pending', 'processing')",
	)
	.bind(to_number)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Maps a provider delivery-lifecycle status onto the internal one.
pub fn map_provider_status(provider_status: &str) -> Option<OutboundStatus> {
	match provider_status.to_lowercase().as_str() {
		"delivered" | "received" => Some(OutboundStatus::Delivered),
		"undelivered" | "failed" => Some(OutboundStatus::Failed),
		"sent" => Some(OutboundStatus::Sent),
		"queued" | "sending" | "receiving" => Some(OutboundStatus::Pending),
		_ => None,
	}
}

pub async fn update_status_by_provider_id(
	db: &Db,
	provider_message_id: &str,
	status: OutboundStatus,
) -> Result<bool> {
	let result = sqlx::query("UPDATE sms_outbox SET status = $1 WHERE provider_message_id = $2")
		.bind(status.as_str())
		.bind(provider_message_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn by_external_id(db: &Db, external_id: &str) -> Result<Option<OutboundMessage>> {
	let row =
		sqlx::query_as::<_, OutboundMessage>("SELECT * FROM sms_outbox WHERE external_id = $1")
			.bind(external_id)
			.fetch_optional(&db.pool)
			.await?;

	Ok(row)
}

pub async fn recent(db: &Db, limit: i64) -> Result<Vec<OutboundMessage>> {
	let rows = sqlx::query_as::<_, OutboundMessage>(
		"SELECT * FROM sms_outbox ORDER BY created_at DESC LIMIT $1",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
