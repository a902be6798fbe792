use std::sync::Arc;

use leadline_service::{DialStatusRequest, SmsRequest};

use super::suite::{self, CALLER, StubGateway, TENANT_INBOUND};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn reply_cancels_nudge_and_buffers_alert() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping reply_cancels_nudge; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service = suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway).await;
	let tenant = suite::seed_tenant(&service).await;

	// A missed call schedules the nudge.
	service
		.handle_dial_status(DialStatusRequest {
			call_sid: "CA1".to_string(),
			dial_call_status: "no-answer".to_string(),
			answered_by: None,
			from: CALLER.to_string(),
			to: TENANT_INBOUND.to_string(),
		})
		.await
		.expect("Dial-status handler failed.");

	let nudge_status: (String,) = sqlx::query_as(
		"SELECT status FROM sms_outbox WHERE external_id = 'nudge_+14155550111'",
	)
	.fetch_one(&service.db.pool)
	.await
	.expect("Nudge row missing.");

	assert_eq!(nudge_status.0, "pending");

	// The caller replies before the nudge fires.
	service
		.handle_sms(SmsRequest {
			from: CALLER.to_string(),
			to: TENANT_INBOUND.to_string(),
			body: "need quote".to_string(),
			message_sid: "SM1".to_string(),
			sms_status: None,
		})
		.await
		.expect("SMS handler failed.");

	let nudge_status: (String,) = sqlx::query_as(
		"SELECT status FROM sms_outbox WHERE external_id = 'nudge_+14155550111'",
	)
	.fetch_one(&service.db.pool)
	.await
	.expect("Nudge row missing.");

	assert_eq!(nudge_status.0, "cancelled");

	let lead_status: (String,) =
		sqlx::query_as("SELECT status FROM leads WHERE phone = $1 AND tenant_id = $2")
			.bind(CALLER)
			.bind(tenant.id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Lead missing.");

	assert_eq!(lead_status.0, "replied");

	// The operator alert sits in the debounce buffer, not the queue.
	let buffered: (i32, String) = sqlx::query_as(
		"SELECT message_count, coalesced_text FROM alert_buffer WHERE customer_phone = $1",
	)
	.bind(CALLER)
	.fetch_one(&service.db.pool)
	.await
	.expect("Alert buffer row missing.");

	assert_eq!(buffered.0, 1);
	assert!(buffered.1.contains("need quote"));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
