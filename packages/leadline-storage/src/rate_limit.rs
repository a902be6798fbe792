use time::{Duration, OffsetDateTime};

use crate::{Result, db::Db};

/// Fixed-window counter. One atomic upsert either opens a fresh window at
/// (1, now + window) or increments the live one; the returned count is
/// compared against the limit. Callers fail open on storage errors.
pub async fn hit(
	db: &Db,
	key: &str,
	limit: i64,
	window_secs: i64,
	now: OffsetDateTime,
) -> Result<bool> {
	let next_reset = now + Duration::seconds(window_secs);
	let (count,): (i64,) = sqlx::query_as(
		"\
INSERT INTO rate_limits (key, count, reset_at)
VALUES ($1, 1, $2)
ON CONFLICT (key) DO UPDATE
SET count = CASE WHEN rate_limits.reset_at <= $3 THEN 1 ELSE rate_limits.count + 1 END,
	reset_at = CASE WHEN rate_limits.reset_at <= $3 THEN $2 ELSE rate_limits.reset_at END
RETURNING count",
	)
	.bind(key)
	.bind(next_reset)
	.bind(now)
	.fetch_one(&db.pool)
	.await?;

	Ok(count <= limit)
}
