//! Alert coalescing: rapid-fire texts from one caller collapse into a
//! single buffered alert that fires once after the quiescence window and
//! deletes its buffer.

use std::sync::Arc;

use super::suite::{self, CALLER, StubGateway, TENANT_OPERATOR};

#[tokio::test]
#[ignore = "Requires external Postgres. Set LEADLINE_PG_DSN to run."]
async fn sweep_emits_one_coalesced_alert_per_window() {
	let Some(test_db) = suite::test_db().await else {
		eprintln!("Skipping debouncer; set LEADLINE_PG_DSN to run this test.");

		return;
	};
	let gateway = Arc::new(StubGateway::new());
	let service = suite::build_service(suite::test_config(test_db.dsn().to_string()), gateway).await;
	let tenant = suite::seed_tenant(&service).await;

	for body in ["water heater is out", "also the sink drips", "when can you come?"] {
		service.buffer_alert(&tenant, CALLER, body).await.expect("Buffer bump failed.");
	}

	// One buffer row, three coalesced messages, deadline pushed out.
	let buffered: (i64, i32) = sqlx::query_as(
		"SELECT COUNT(*), MAX(message_count) FROM alert_buffer WHERE customer_phone = $1",
	)
	.bind(CALLER)
	.fetch_one(&service.db.pool)
	.await
	.expect("Failed to read buffer.");

	assert_eq!(buffered, (1, 3));

	// Nothing fires while the window is still open.
	assert_eq!(service.sweep_alerts().await.expect("Sweep failed."), 0);

	// Force quiescence and sweep.
	sqlx::query("UPDATE alert_buffer SET send_at = now() - INTERVAL '1 second'")
		.execute(&service.db.pool)
		.await
		.expect("Failed to expire buffer.");

	assert_eq!(service.sweep_alerts().await.expect("Sweep failed."), 1);
	assert_eq!(
		suite::count_rows(&service, "SELECT COUNT(*) FROM alert_buffer").await,
		0,
		"Buffer must be deleted after release."
	);

	let alerts = suite::outbox_rows_to(&service, TENANT_OPERATOR).await;

	assert_eq!(alerts.len(), 1);
	assert!(alerts[0].2.contains("sent 3 messages"));
	assert!(alerts[0].2.contains("water heater is out"));
	assert!(alerts[0].2.contains("when can you come?"));

	// A second sweep finds nothing; exactly one alert per window.
	assert_eq!(service.sweep_alerts().await.expect("Sweep failed."), 0);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
