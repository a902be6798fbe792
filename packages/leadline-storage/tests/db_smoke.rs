use time::OffsetDateTime;

use leadline_storage::{
	db::Db,
	leads,
	models::LeadStatus,
	tenants::{self, NewTenant},
};
use leadline_testkit::TestDatabase;

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = leadline_config::Postgres {
		dsn: test_db.dsn().to_string(),
		pool_max_conns: 5,
		acquire_timeout_secs: 10,
	};

	Db::connect(&cfg).await.expect("Failed to connect.")
}

fn sample_tenant() -> NewTenant<'static> {
	NewTenant {
		name: "Apex Plumbing",
		inbound_number: "+15005550000",
		operator_number: "+15005550123",
		timezone: "America/Los_Angeles",
		day_start: 7,
		day_end: 17,
		evening_end: 19,
		average_job_value: 350,
		review_link: None,
		sheet_id: None,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = leadline_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("First bootstrap failed.");
	db.ensure_schema().await.expect("Second bootstrap failed.");

	let tenant = tenants::create(&db, sample_tenant(), OffsetDateTime::now_utc())
		.await
		.expect("Failed to create tenant.");
	let resolved = tenants::by_inbound_number(&db, "+15005550000")
		.await
		.expect("Lookup failed.")
		.expect("Tenant missing.");

	assert_eq!(resolved.id, tenant.id);
	assert!(resolved.ai_active);

	// The inbound number is the tenant key; a second claim must fail.
	let duplicate = tenants::create(&db, sample_tenant(), OffsetDateTime::now_utc()).await;

	assert!(duplicate.is_err());

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn lead_status_guards_hold() {
	let Some(base_dsn) = leadline_testkit::env_dsn() else {
		eprintln!("Skipping lead_status_guards_hold; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("Bootstrap failed.");

	let tenant = tenants::create(&db, sample_tenant(), OffsetDateTime::now_utc())
		.await
		.expect("Failed to create tenant.");
	let now = OffsetDateTime::now_utc();
	let (lead_id, status) = leads::upsert_contact(&db, Some(tenant.id), "+14155550111", None, now)
		.await
		.expect("Upsert failed.");

	assert_eq!(status, LeadStatus::New);

	// Second contact refreshes, never duplicates.
	let (second_id, _) = leads::upsert_contact(&db, Some(tenant.id), "+14155550111", None, now)
		.await
		.expect("Second upsert failed.");

	assert_eq!(lead_id, second_id);

	assert!(
		leads::set_status(&db, Some(tenant.id), "+14155550111", LeadStatus::Booked)
			.await
			.expect("Status update failed.")
	);
	// Booked never regresses through the pipeline.
	assert!(
		!leads::set_status(&db, Some(tenant.id), "+14155550111", LeadStatus::Replied)
			.await
			.expect("Status update failed.")
	);

	// Opt-out freezes status entirely and is inherited by new tenants.
	leads::set_opt_out(&db, "+14155550111", true, now).await.expect("Opt-out failed.");

	assert!(
		!leads::set_status(&db, Some(tenant.id), "+14155550111", LeadStatus::Booked)
			.await
			.expect("Status update failed.")
	);
	assert!(leads::is_opted_out(&db, "+14155550111").await.expect("Opt-out check failed."));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
