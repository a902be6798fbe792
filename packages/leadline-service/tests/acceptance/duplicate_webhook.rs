use std::sync::Arc;

use leadline_service::{DialStatusRequest, VoiceRequest};

use super::suite::{self, CALLER, StubGateway, TENANT_INBOUND};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn duplicate_webhooks_produce_no_new_side_effects() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping duplicate_webhook; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service = suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway).await;

	suite::seed_tenant(&service).await;

	let voice = VoiceRequest {
		from: CALLER.to_string(),
		to: TENANT_INBOUND.to_string(),
		call_sid: "CA1".to_string(),
		digits: None,
	};
	let status = DialStatusRequest {
		call_sid: "CA1".to_string(),
		dial_call_status: "no-answer".to_string(),
		answered_by: None,
		from: CALLER.to_string(),
		to: TENANT_INBOUND.to_string(),
	};

	service.handle_voice(voice.clone()).await.expect("First voice webhook failed.");
	service.handle_dial_status(status.clone()).await.expect("First dial-status failed.");

	let leads = suite::count_rows(&service, "SELECT COUNT(*) FROM leads").await;
	let outbound = suite::count_rows(&service, "SELECT COUNT(*) FROM sms_outbox").await;
	let consent = suite::count_rows(&service, "SELECT COUNT(*) FROM consent_records").await;

	// The provider redelivers both webhooks.
	let replayed = service.handle_voice(voice).await.expect("Replayed voice webhook failed.");

	service.handle_dial_status(status).await.expect("Replayed dial-status failed.");

	// Still a valid voice response, and nothing new underneath.
	assert!(replayed.twiml.starts_with("<?xml"));
	assert_eq!(suite::count_rows(&service, "SELECT COUNT(*) FROM leads").await, leads);
	assert_eq!(suite::count_rows(&service, "SELECT COUNT(*) FROM sms_outbox").await, outbound);
	assert_eq!(suite::count_rows(&service, "SELECT COUNT(*) FROM consent_records").await, consent);
	assert_eq!(
		suite::count_rows(
			&service,
			"SELECT COUNT(*) FROM webhook_events WHERE provider_id = 'CA1'"
		)
		.await,
		1
	);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
