//! No double-send under contention: three dispatchers drain one hundred
//! pending rows through a slow gateway, and every row is sent exactly
//! once.

use std::{collections::HashSet, sync::Arc, time::Duration};

use time::OffsetDateTime;

use leadline_storage::{
	models::OutboundKind,
	outbox::{self, NewOutbound},
};

use super::suite::{self, StubGateway};

const SEEDED_ROWS: usize = 100;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn contending_workers_send_each_row_exactly_once() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping claim_contention; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::with_send_delay(Duration::from_millis(50)));
	let service =
		suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway.clone()).await;
	let tenant = suite::seed_tenant(&service).await;
	let now = OffsetDateTime::now_utc();

	for index in 0..SEEDED_ROWS {
		outbox::enqueue(
			&service.db.pool,
			NewOutbound {
				tenant_id: Some(tenant.id),
				to_number: &format!("+1600555{index:04}"),
				body: "Dispatch contention probe.",
				kind: OutboundKind::Internal,
				external_id: Some(&format!("contention_{index}")),
				scheduled_for: None,
			},
			now,
		)
		.await
		.expect("Failed to seed row.");
	}

	let mut workers = tokio::task::JoinSet::new();

	for _ in 0..3 {
		let service = service.clone();

		workers.spawn(async move {
			loop {
				let claimed = service.process_outbox_once().await.expect("Dispatch failed.");

				if claimed == 0 {
					break;
				}
			}
		});
	}

	while let Some(result) = workers.join_next().await {
		result.expect("Worker panicked.");
	}

	assert_eq!(
		suite::count_rows(&service, "SELECT COUNT(*) FROM sms_outbox WHERE status = 'sent'").await,
		SEEDED_ROWS as i64
	);
	assert_eq!(gateway.sent_count(), SEEDED_ROWS);
	assert_eq!(
		suite::count_rows(&service, "SELECT COUNT(*) FROM sms_outbox WHERE attempts > 1").await,
		0
	);

	// Provider ids are unique across rows: no double-send slipped through.
	let ids: Vec<(String,)> = sqlx::query_as(
		"SELECT provider_message_id FROM sms_outbox WHERE provider_message_id IS NOT NULL",
	)
	.fetch_all(&service.db.pool)
	.await
	.expect("Failed to read provider ids.");
	let unique: HashSet<_> = ids.iter().map(|(id,)| id.as_str()).collect();

	assert_eq!(unique.len(), SEEDED_ROWS);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
