use std::sync::Arc;

use leadline_service::{DialStatusRequest, VoiceRequest};

use super::suite::{self, CALLER, StubGateway, TENANT_INBOUND, TENANT_OPERATOR};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn missed_call_happy_path() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping missed_call_happy_path; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service = suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway).await;
	let tenant = suite::seed_tenant(&service).await;

	// Business hours: the call rings the operator with a status callback.
	let reply = service
		.handle_voice(VoiceRequest {
			from: CALLER.to_string(),
			to: TENANT_INBOUND.to_string(),
			call_sid: "CA1".to_string(),
			digits: None,
		})
		.await
		.expect("Voice handler failed.");

	assert!(reply.twiml.contains("<Dial"));
	assert!(reply.twiml.contains(TENANT_OPERATOR));
	assert!(reply.twiml.contains("/voice/status"));

	// The operator never picks up.
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

	let lead: (String, bool) = sqlx::query_as(
		"SELECT status, opt_out FROM leads WHERE phone = $1 AND tenant_id = $2",
	)
	.bind(CALLER)
	.bind(tenant.id)
	.fetch_one(&service.db.pool)
	.await
	.expect("Lead missing.");

	assert_eq!(lead.0, "new");
	assert!(!lead.1);

	let consent_count = suite::count_rows(
		&service,
		"SELECT COUNT(*) FROM consent_records WHERE phone = '+14155550111' AND kind = 'implied'",
	)
	.await;

	assert_eq!(consent_count, 1);

	let caller_rows = suite::outbox_rows_to(&service, CALLER).await;
	let missed = caller_rows
		.iter()
		.find(|(_, _, _, _, external_id)| external_id.as_deref() == Some("CA1_missed"))
		.expect("Missed-call SMS not queued.");

	assert_eq!(missed.1, "pending");
	assert!(missed.2.contains("Apex Plumbing"));
	assert!(missed.2.contains("Reply STOP"));

	let operator_rows = suite::outbox_rows_to(&service, TENANT_OPERATOR).await;
	let alert = operator_rows
		.iter()
		.find(|(_, _, _, _, external_id)| external_id.as_deref() == Some("CA1_missed:operator"))
		.expect("Operator alert not queued.");

	assert_eq!(alert.1, "pending");
	assert!(alert.2.contains(CALLER));

	// The follow-up nudge sits roughly two minutes out.
	let nudge: (String, time::OffsetDateTime) = sqlx::query_as(
		"SELECT status, scheduled_for FROM sms_outbox WHERE external_id = 'nudge_+14155550111'",
	)
	.fetch_one(&service.db.pool)
	.await
	.expect("Nudge row missing.");
	let delta = nudge.1 - time::OffsetDateTime::now_utc();

	assert_eq!(nudge.0, "pending");
	assert!(delta > time::Duration::seconds(100) && delta <= time::Duration::seconds(121));

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
