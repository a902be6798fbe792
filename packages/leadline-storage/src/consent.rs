//! Append-only consent ledger. Implied grants expire after two years;
//! express grants never expire. Revocation is global across tenants and
//! never deletes rows; the trail is the audit artifact.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use sqlx::PgExecutor;

use crate::{
	Result,
	db::Db,
	models::{ConsentKind, ConsentRecord, ConsentSource},
};

const IMPLIED_CONSENT_TTL_DAYS: i64 = 730;

#[derive(Clone, Debug)]
pub struct NewConsent<'a> {
	pub lead_id: Uuid,
	pub tenant_id: Option<Uuid>,
	pub phone: &'a str,
	pub kind: ConsentKind,
	pub source: ConsentSource,
	pub metadata: Value,
}

pub async fn record<'e, E>(executor: E, new: NewConsent<'_>, now: OffsetDateTime) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let id = Uuid::new_v4();
	let expires_at = match new.kind {
		ConsentKind::Implied => Some(now + Duration::days(IMPLIED_CONSENT_TTL_DAYS)),
		ConsentKind::Express => None,
	};

	sqlx::query(
		"\
INSERT INTO consent_records (id, lead_id, tenant_id, phone, kind, source, consented_at, \
		 expires_at, metadata)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
	)
	.bind(id)
	.bind(new.lead_id)
	.bind(new.tenant_id)
	.bind(new.phone)
	.bind(new.kind.as_str())
	.bind(new.source.as_str())
	.bind(now)
	.bind(expires_at)
	.bind(new.metadata)
	.execute(executor)
	.await?;

	Ok(id)
}

/// A phone is consented at `now` iff some record is unrevoked and
/// unexpired. The check is global; revocation under one tenant blocks all.
pub async fn is_valid(db: &Db, phone: &str, now: OffsetDateTime) -> Result<bool> {
	let row: Option<(Uuid,)> = sqlx::query_as(
		"\
SELECT id
FROM consent_records
WHERE phone = $1 AND revoked_at IS NULL AND (expires_at IS NULL OR expires_at > $2)
LIMIT 1",
	)
	.bind(phone)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row.is_some())
}

/// Stamps `revoked_at` on every live record for the phone, atomically and
/// across tenants. Returns the number of records revoked.
pub async fn revoke_all<'e, E>(
	executor: E,
	phone: &str,
	reason: &str,
	now: OffsetDateTime,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE consent_records
SET revoked_at = $1, revocation_reason = $2
WHERE phone = $3 AND revoked_at IS NULL",
	)
	.bind(now)
	.bind(reason)
	.bind(phone)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Full consent history for a phone, oldest first.
pub async fn audit_trail(db: &Db, phone: &str) -> Result<Vec<ConsentRecord>> {
	let rows = sqlx::query_as::<_, ConsentRecord>(
		"SELECT * FROM consent_records WHERE phone = $1 ORDER BY consented_at ASC",
	)
	.bind(phone)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
