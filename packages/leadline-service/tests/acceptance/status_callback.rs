//! Delivery-status correlation: the provider message id recorded at send
//! time is the key the status callback upgrades by.

use std::sync::Arc;

use time::OffsetDateTime;

use leadline_service::SmsStatusRequest;
use leadline_storage::{
	models::OutboundKind,
	outbox::{self, NewOutbound},
};

use super::suite::{self, StubGateway, TENANT_OPERATOR};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn delivery_callback_upgrades_sent_row() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping status_callback; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service =
		suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway.clone()).await;
	let tenant = suite::seed_tenant(&service).await;

	outbox::enqueue(
		&service.db.pool,
		NewOutbound {
			tenant_id: Some(tenant.id),
			to_number: TENANT_OPERATOR,
			body: "Delivery probe.",
			kind: OutboundKind::Internal,
			external_id: Some("delivery_probe"),
			scheduled_for: None,
		},
		OffsetDateTime::now_utc(),
	)
	.await
	.expect("Failed to seed row.");

	assert_eq!(service.process_outbox_once().await.expect("Dispatch failed."), 1);

	let (provider_message_id,): (String,) = sqlx::query_as(
		"SELECT provider_message_id FROM sms_outbox WHERE external_id = 'delivery_probe'",
	)
	.fetch_one(&service.db.pool)
	.await
	.expect("Provider id missing after send.");

	service
		.handle_sms_status(SmsStatusRequest {
			message_sid: provider_message_id,
			message_status: "delivered".to_string(),
		})
		.await
		.expect("Status callback failed.");

	let (status,): (String,) =
		sqlx::query_as("SELECT status FROM sms_outbox WHERE external_id = 'delivery_probe'")
			.fetch_one(&service.db.pool)
			.await
			.expect("Row missing.");

	assert_eq!(status, "delivered");

	// Unknown provider ids are a logged no-op, not an error.
	service
		.handle_sms_status(SmsStatusRequest {
			message_sid: "SM_NEVER_SEEN".to_string(),
			message_status: "failed".to_string(),
		})
		.await
		.expect("Unknown callback must not fail.");

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
