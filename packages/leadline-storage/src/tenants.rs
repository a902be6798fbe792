use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::Tenant};

/// Admin-side tenant provisioning input.
#[derive(Clone, Debug)]
pub struct NewTenant<'a> {
	pub name: &'a str,
	pub inbound_number: &'a str,
	pub operator_number: &'a str,
	pub timezone: &'a str,
	pub day_start: i32,
	pub day_end: i32,
	pub evening_end: i32,
	pub average_job_value: i64,
	pub review_link: Option<&'a str>,
	pub sheet_id: Option<&'a str>,
}

pub async fn create(db: &Db, new: NewTenant<'_>, now: OffsetDateTime) -> Result<Tenant> {
	let tenant = sqlx::query_as::<_, Tenant>(
		"\
INSERT INTO tenants (id, name, inbound_number, operator_number, timezone, day_start, day_end, \
		 evening_end, average_job_value, review_link, sheet_id, created_at)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
RETURNING *",
	)
	.bind(Uuid::new_v4())
	.bind(new.name)
	.bind(new.inbound_number)
	.bind(new.operator_number)
	.bind(new.timezone)
	.bind(new.day_start)
	.bind(new.day_end)
	.bind(new.evening_end)
	.bind(new.average_job_value)
	.bind(new.review_link)
	.bind(new.sheet_id)
	.bind(now)
	.fetch_one(&db.pool)
	.await?;

	Ok(tenant)
}

pub async fn by_inbound_number(db: &Db, number: &str) -> Result<Option<Tenant>> {
	let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE inbound_number = $1")
		.bind(number)
		.fetch_optional(&db.pool)
		.await?;

	Ok(tenant)
}

/// Dial-status callbacks have been observed carrying the operator's own
/// number in `To`; this is the fallback resolver for that leg.
pub async fn by_operator_number(db: &Db, number: &str) -> Result<Option<Tenant>> {
	let tenant =
		sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE operator_number = $1 LIMIT 1")
			.bind(number)
			.fetch_optional(&db.pool)
			.await?;

	Ok(tenant)
}

pub async fn by_id(db: &Db, id: Uuid) -> Result<Option<Tenant>> {
	let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
		.bind(id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(tenant)
}

pub async fn set_ai_active(db: &Db, id: Uuid, active: bool) -> Result<bool> {
	let result = sqlx::query("UPDATE tenants SET ai_active = $1 WHERE id = $2")
		.bind(active)
		.bind(id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn set_emergency_mode(db: &Db, id: Uuid, enabled: bool) -> Result<bool> {
	let result = sqlx::query("UPDATE tenants SET emergency_mode = $1 WHERE id = $2")
		.bind(enabled)
		.bind(id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}
