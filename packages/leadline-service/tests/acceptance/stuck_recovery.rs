//! Self-healing claim: a row left `processing` by a dead worker is
//! reclaimed once its lock outlives the stuck timeout.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use leadline_storage::{
	models::OutboundKind,
	outbox::{self, NewOutbound},
};

use super::suite::{self, StubGateway, TENANT_OPERATOR};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn stuck_processing_row_is_reclaimed_and_delivered() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping stuck_recovery; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service =
		suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway.clone()).await;
	let tenant = suite::seed_tenant(&service).await;
	let now = OffsetDateTime::now_utc();

	outbox::enqueue(
		&service.db.pool,
		NewOutbound {
			tenant_id: Some(tenant.id),
			to_number: TENANT_OPERATOR,
			body: "Orphaned by a dead worker.",
			kind: OutboundKind::Internal,
			external_id: Some("stuck_probe"),
			scheduled_for: None,
		},
		now,
	)
	.await
	.expect("Failed to seed row.");

	// Simulate the dead worker: claimed ten minutes ago, never finalized.
	sqlx::query(
		"UPDATE sms_outbox SET status = 'processing', locked_at = $1 WHERE external_id = \
		 'stuck_probe'",
	)
	.bind(now - Duration::minutes(10))
	.execute(&service.db.pool)
	.await
	.expect("Failed to orphan row.");

	// Default stuck timeout is five minutes; one cycle must reclaim it.
	let claimed = service.process_outbox_once().await.expect("Dispatch failed.");

	assert_eq!(claimed, 1);

	let row: (String, i32, Option<String>) = sqlx::query_as(
		"SELECT status, attempts, provider_message_id FROM sms_outbox WHERE external_id = \
		 'stuck_probe'",
	)
	.fetch_one(&service.db.pool)
	.await
	.expect("Row missing.");

	assert_eq!(row.0, "sent");
	assert_eq!(row.1, 1);
	assert!(row.2.is_some());
	assert_eq!(gateway.sent_count(), 1);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
