use std::sync::Arc;

use leadline_service::{EnqueueOutcome, Rejection, SmsRequest};
use leadline_storage::{models::OutboundKind, tenants};

use super::suite::{self, StubGateway, TENANT_INBOUND};

const OPTING_OUT: &str = "+14155550222";

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn stop_blocks_every_subsequent_enqueue() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping stop_opt_out; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service =
		suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway.clone()).await;
	let tenant = suite::seed_tenant(&service).await;

	service
		.handle_sms(SmsRequest {
			from: OPTING_OUT.to_string(),
			to: TENANT_INBOUND.to_string(),
			body: "STOP".to_string(),
			message_sid: "SM2".to_string(),
			sms_status: None,
		})
		.await
		.expect("SMS handler failed.");

	let lead: (bool,) = sqlx::query_as("SELECT opt_out FROM leads WHERE phone = $1")
		.bind(OPTING_OUT)
		.fetch_one(&service.db.pool)
		.await
		.expect("Lead missing.");

	assert!(lead.0);
	assert_eq!(
		suite::count_rows(
			&service,
			"SELECT COUNT(*) FROM consent_records WHERE phone = '+14155550222' AND revoked_at IS \
			 NULL",
		)
		.await,
		0
	);

	// The confirmation is queued despite the opt-out and actually sends.
	let ack: (String, String) =
		sqlx::query_as("SELECT status, kind FROM sms_outbox WHERE external_id = 'SM2_stop_ack'")
			.fetch_one(&service.db.pool)
			.await
			.expect("Confirmation row missing.");

	assert_eq!(ack.0, "pending");
	assert_eq!(ack.1, "compliance");

	while service.process_outbox_once().await.expect("Dispatch failed.") > 0 {}

	let ack: (String,) =
		sqlx::query_as("SELECT status FROM sms_outbox WHERE external_id = 'SM2_stop_ack'")
			.fetch_one(&service.db.pool)
			.await
			.expect("Confirmation row missing.");

	assert_eq!(ack.0, "sent");
	assert_eq!(gateway.sent_to(OPTING_OUT).len(), 1);

	// Anything else aimed at the number is rejected before it hits a row.
	let tenant = tenants::by_id(&service.db, tenant.id)
		.await
		.expect("Tenant lookup failed.")
		.expect("Tenant vanished.");
	let outcome = service
		.enqueue_message(Some(&tenant), OPTING_OUT, "hello", OutboundKind::Standard, None, None)
		.await
		.expect("Enqueue failed.");

	assert_eq!(outcome, EnqueueOutcome::Rejected(Rejection::OptOut));
	assert_eq!(
		suite::count_rows(
			&service,
			"SELECT COUNT(*) FROM sms_outbox WHERE to_number = '+14155550222' AND status = \
			 'pending'",
		)
		.await,
		0
	);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
