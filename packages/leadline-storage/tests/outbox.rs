use time::{Duration, OffsetDateTime};

use leadline_storage::{
	db::Db,
	models::{OutboundKind, OutboundStatus},
	outbox::{self, EnqueueRow, NewOutbound},
};
use leadline_testkit::TestDatabase;

async fn fresh_db(test_db: &TestDatabase) -> Db {
	let cfg = leadline_config::Postgres {
		dsn: test_db.dsn().to_string(),
		pool_max_conns: 5,
		acquire_timeout_secs: 10,
	};
	let db = Db::connect(&cfg).await.expect("Failed to connect.");

	db.ensure_schema().await.expect("Bootstrap failed.");

	db
}

fn draft<'a>(to_number: &'a str, external_id: Option<&'a str>) -> NewOutbound<'a> {
	NewOutbound {
		tenant_id: None,
		to_number,
		body: "Queue probe.",
		kind: OutboundKind::Internal,
		external_id,
		scheduled_for: None,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn external_id_deduplicates() {
	let Some(base_dsn) = leadline_testkit::env_dsn() else {
		eprintln!("Skipping external_id_deduplicates; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = fresh_db(&test_db).await;
	let now = OffsetDateTime::now_utc();

	let first = outbox::enqueue(&db.pool, draft("+15551230000", Some("probe_1")), now)
		.await
		.expect("Enqueue failed.");
	let second = outbox::enqueue(&db.pool, draft("+15551230000", Some("probe_1")), now)
		.await
		.expect("Enqueue failed.");

	assert!(matches!(first, EnqueueRow::Inserted(_)));
	assert_eq!(second, EnqueueRow::Duplicate);

	// Rows without an external id never deduplicate against each other.
	let third = outbox::enqueue(&db.pool, draft("+15551230000", None), now)
		.await
		.expect("Enqueue failed.");
	let fourth = outbox::enqueue(&db.pool, draft("+15551230000", None), now)
		.await
		.expect("Enqueue failed.");

	assert!(matches!(third, EnqueueRow::Inserted(_)));
	assert!(matches!(fourth, EnqueueRow::Inserted(_)));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn claim_respects_schedule_backoff_and_order() {
	let Some(base_dsn) = leadline_testkit::env_dsn() else {
		eprintln!("Skipping claim test; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = fresh_db(&test_db).await;
	let now = OffsetDateTime::now_utc();

	// Oldest first.
	outbox::enqueue(&db.pool, draft("+15551230001", Some("older")), now - Duration::seconds(20))
		.await
		.expect("Enqueue failed.");
	outbox::enqueue(&db.pool, draft("+15551230002", Some("newer")), now - Duration::seconds(10))
		.await
		.expect("Enqueue failed.");

	// Scheduled in the future: invisible to the claim.
	let mut future = draft("+15551230003", Some("later"));

	future.scheduled_for = Some(now + Duration::seconds(3_600));

	outbox::enqueue(&db.pool, future, now).await.expect("Enqueue failed.");

	let claimed = outbox::claim_due(&db, now, 300, 10).await.expect("Claim failed.");
	let ids: Vec<_> = claimed.iter().map(|row| row.external_id.clone()).collect();

	assert_eq!(ids, vec![Some("older".to_string()), Some("newer".to_string())]);

	for row in &claimed {
		assert_eq!(row.status, "processing");
	}

	// A retried row stays invisible until its backoff window elapses.
	let retried = &claimed[0];

	outbox::mark_retry(&db, retried.id, 1, now).await.expect("Retry failed.");
	outbox::mark_sent(&db, claimed[1].id, 1, "SMX", now).await.expect("Finalize failed.");

	let immediately = outbox::claim_due(&db, now, 300, 10).await.expect("Claim failed.");

	assert!(immediately.is_empty());

	let after_backoff = outbox::claim_due(&db, now + Duration::seconds(6), 300, 10)
		.await
		.expect("Claim failed.");

	assert_eq!(after_backoff.len(), 1);
	assert_eq!(after_backoff[0].external_id.as_deref(), Some("older"));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn cancellation_hits_only_matching_live_rows() {
	let Some(base_dsn) = leadline_testkit::env_dsn() else {
		eprintln!("Skipping cancellation test; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = fresh_db(&test_db).await;
	let now = OffsetDateTime::now_utc();

	outbox::enqueue(&db.pool, draft("+15551230001", Some("nudge_+15551230001")), now)
		.await
		.expect("Enqueue failed.");
	outbox::enqueue(&db.pool, draft("+15551230002", Some("nudge_+15551230002")), now)
		.await
		.expect("Enqueue failed.");

	let cancelled = outbox::cancel_matching(&db.pool, "nudge_+15551230001")
		.await
		.expect("Cancel failed.");

	assert_eq!(cancelled, 1);

	let survivor = outbox::by_external_id(&db, "nudge_+15551230002")
		.await
		.expect("Lookup failed.")
		.expect("Row missing.");

	assert_eq!(survivor.status(), Some(OutboundStatus::Pending));

	// Terminal rows are out of reach.
	let again = outbox::cancel_matching(&db.pool, "nudge_+15551230001")
		.await
		.expect("Cancel failed.");

	assert_eq!(again, 0);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
