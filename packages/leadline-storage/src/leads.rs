use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{Lead, LeadIntent, LeadStatus},
	outbox,
};

/// Creates the lead for `(tenant, phone)` or refreshes `last_contact_at`.
/// A brand-new lead inherits any opt-out the phone carries under another
/// tenant; opt-out is global. Returns the lead id and its current status.
pub async fn upsert_contact(
	db: &Db,
	tenant_id: Option<Uuid>,
	phone: &str,
	name: Option<&str>,
	now: OffsetDateTime,
) -> Result<(Uuid, LeadStatus)> {
	let mut tx = db.pool.begin().await?;
	let existing: Option<(Uuid, String)> = sqlx::query_as(
		"SELECT id, status FROM leads WHERE phone = $1 AND tenant_id IS NOT DISTINCT FROM $2",
	)
	.bind(phone)
	.bind(tenant_id)
	.fetch_optional(&mut *tx)
	.await?;

	let result = if let Some((lead_id, status)) = existing {
		sqlx::query(
			"UPDATE leads SET last_contact_at = $1, name = COALESCE(name, $2) WHERE id = $3",
		)
		.bind(now)
		.bind(name)
		.bind(lead_id)
		.execute(&mut *tx)
		.await?;

		(lead_id, LeadStatus::parse(&status).unwrap_or(LeadStatus::New))
	} else {
		let lead_id = Uuid::new_v4();
		let inherited_opt_out: Option<(i32,)> =
			sqlx::query_as("SELECT 1 FROM leads WHERE phone = $1 AND opt_out LIMIT 1")
				.bind(phone)
				.fetch_optional(&mut *tx)
				.await?;

		sqlx::query(
			"\
INSERT INTO leads (id, tenant_id, phone, name, status, opt_out, created_at, last_contact_at)
VALUES ($1,$2,$3,$4,'new',$5,$6,$6)",
		)
		.bind(lead_id)
		.bind(tenant_id)
		.bind(phone)
		.bind(name)
		.bind(inherited_opt_out.is_some())
		.bind(now)
		.execute(&mut *tx)
		.await?;

		(lead_id, LeadStatus::New)
	};

	tx.commit().await?;

	Ok(result)
}

pub async fn by_phone(db: &Db, tenant_id: Uuid, phone: &str) -> Result<Option<Lead>> {
	let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE phone = $1 AND tenant_id = $2")
		.bind(phone)
		.bind(tenant_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(lead)
}

/// Advances the funnel status. Refuses to touch opted-out leads and never
/// regresses from `booked`; only the admin surface may do that.
pub async fn set_status(
	db: &Db,
	tenant_id: Option<Uuid>,
	phone: &str,
	new_status: LeadStatus,
) -> Result<bool> {
	let mut tx = db.pool.begin().await?;
	let row: Option<(String, bool)> = sqlx::query_as(
		"SELECT status, opt_out FROM leads WHERE phone = $1 AND tenant_id IS NOT DISTINCT FROM \
		 $2 FOR UPDATE",
	)
	.bind(phone)
	.bind(tenant_id)
	.fetch_optional(&mut *tx)
	.await?;
	let Some((current, opt_out)) = row else {
		tx.rollback().await?;

		return Ok(false);
	};

	if opt_out
		|| (LeadStatus::parse(&current) == Some(LeadStatus::Booked)
			&& new_status != LeadStatus::Booked)
	{
		tx.rollback().await?;

		return Ok(false);
	}

	sqlx::query("UPDATE leads SET status = $1 WHERE phone = $2 AND tenant_id IS NOT DISTINCT FROM $3")
		.bind(new_status.as_str())
		.bind(phone)
		.bind(tenant_id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(true)
}

pub async fn set_intent(
	db: &Db,
	tenant_id: Option<Uuid>,
	phone: &str,
	intent: LeadIntent,
) -> Result<bool> {
	let result = sqlx::query(
		"UPDATE leads SET intent = $1 WHERE phone = $2 AND tenant_id IS NOT DISTINCT FROM $3",
	)
	.bind(intent.as_str())
	.bind(phone)
	.bind(tenant_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Sets or clears the opt-out flag for a phone across every tenant.
/// Opting out also drops every queued message to the number in the same
/// transaction, so nothing already enqueued can still go out.
pub async fn set_opt_out(db: &Db, phone: &str, opted_out: bool, now: OffsetDateTime) -> Result<()> {
	let mut tx = db.pool.begin().await?;
	let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM leads WHERE phone = $1 LIMIT 1")
		.bind(phone)
		.fetch_optional(&mut *tx)
		.await?;

	if exists.is_none() {
		// An unsubscribe can arrive for a phone that never became a lead;
		// a tenantless row still records the permanent block.
		sqlx::query(
			"\
INSERT INTO leads (id, tenant_id, phone, status, opt_out, created_at, last_contact_at)
VALUES ($1,NULL,$2,'new',$3,$4,$4)",
		)
		.bind(Uuid::new_v4())
		.bind(phone)
		.bind(opted_out)
		.bind(now)
		.execute(&mut *tx)
		.await?;
	}

	sqlx::query("UPDATE leads SET opt_out = $1 WHERE phone = $2")
		.bind(opted_out)
		.bind(phone)
		.execute(&mut *tx)
		.await?;

	if opted_out {
		outbox::fail_queued_for_recipient(&mut *tx, phone).await?;
	}

	tx.commit().await?;

	Ok(())
}

/// Global opt-out check; true if the phone is blocked under any tenant.
pub async fn is_opted_out(db: &Db, phone: &str) -> Result<bool> {
	let row: Option<(i32,)> =
		sqlx::query_as("SELECT 1 FROM leads WHERE phone = $1 AND opt_out LIMIT 1")
			.bind(phone)
			.fetch_optional(&db.pool)
			.await?;

	Ok(row.is_some())
}

pub async fn list_recent(db: &Db, tenant_id: Uuid, limit: i64) -> Result<Vec<Lead>> {
	let rows = sqlx::query_as::<_, Lead>(
		"SELECT * FROM leads WHERE tenant_id = $1 ORDER BY last_contact_at DESC LIMIT $2",
	)
	.bind(tenant_id)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
