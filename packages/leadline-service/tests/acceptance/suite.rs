//! Shared harness for the acceptance suites: a stub telephony gateway, a
//! config factory, and a per-test database. Suites require an external
//! Postgres; set LEADLINE_PG_DSN to run them.

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use time::OffsetDateTime;
use uuid::Uuid;

use leadline_config::{Config, Dispatcher, Messaging, Postgres, Service, Storage, Telephony};
use leadline_providers::lookup::{LineLookup, LineType};
use leadline_service::{BoxFuture, LeadlineService, TelephonyGateway};
use leadline_storage::{
	db::Db,
	models::Tenant,
	tenants::{self, NewTenant},
};
use leadline_testkit::TestDatabase;

pub const TENANT_INBOUND: &str = "+15005550000";
pub const TENANT_OPERATOR: &str = "+15005550123";
pub const CALLER: &str = "+14155550111";

#[derive(Clone, Debug)]
pub struct SentMessage {
	pub to: String,
	pub body: String,
	pub provider_message_id: String,
}

/// In-process provider fake. Records every accepted send, hands out
/// sequential provider ids, and can be scripted to fail or dawdle.
pub struct StubGateway {
	pub sent: Mutex<Vec<SentMessage>>,
	sequence: AtomicUsize,
	/// Number of initial sends that fail with a transient error.
	pub transient_failures: AtomicUsize,
	/// Artificial per-send latency, for contention tests.
	pub send_delay: Duration,
	pub line_type: LineType,
}
impl StubGateway {
	pub fn new() -> Self {
		Self {
			sent: Mutex::new(Vec::new()),
			sequence: AtomicUsize::new(0),
			transient_failures: AtomicUsize::new(0),
			send_delay: Duration::ZERO,
			line_type: LineType::Mobile,
		}
	}

	pub fn with_send_delay(delay: Duration) -> Self {
		Self { send_delay: delay, ..Self::new() }
	}

	pub fn sent_to(&self, number: &str) -> Vec<SentMessage> {
		self.sent
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.filter(|message| message.to == number)
			.cloned()
			.collect()
	}

	pub fn sent_count(&self) -> usize {
		self.sent.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
impl TelephonyGateway for StubGateway {
	fn send<'a>(
		&'a self,
		_cfg: &'a leadline_config::Telephony,
		to: &'a str,
		body: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<String>> {
		Box::pin(async move {
			if self.send_delay > Duration::ZERO {
				tokio::time::sleep(self.send_delay).await;
			}

			let remaining = self.transient_failures.load(Ordering::SeqCst);

			if remaining > 0
				&& self
					.transient_failures
					.compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
					.is_ok()
			{
				return Err(leadline_providers::Error::Transient {
					message: "Scripted transient failure.".to_string(),
				});
			}

			let provider_message_id =
				format!("SMSTUB{}", self.sequence.fetch_add(1, Ordering::SeqCst));

			self.sent.lock().unwrap_or_else(|err| err.into_inner()).push(SentMessage {
				to: to.to_string(),
				body: body.to_string(),
				provider_message_id: provider_message_id.clone(),
			});

			Ok(provider_message_id)
		})
	}

	fn lookup<'a>(
		&'a self,
		_cfg: &'a leadline_config::Telephony,
		_number: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<LineLookup>> {
		Box::pin(async move { Ok(LineLookup { line_type: self.line_type, caller_name: None }) })
	}
}

pub fn test_config(dsn: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn, pool_max_conns: 5, acquire_timeout_secs: 10 },
		},
		telephony: Telephony {
			api_base: "http://127.0.0.1:1".to_string(),
			account_sid: "ACTEST".to_string(),
			auth_token: "test-token".to_string(),
			from_number: "+15005550006".to_string(),
			timeout_ms: 1_000,
			lookup_enabled: true,
			verify_signatures: false,
		},
		messaging: Messaging {
			admin_number: None,
			default_timezone: "America/Los_Angeles".to_string(),
			safe_mode: false,
			kill_switch: false,
			// The suites run at arbitrary wall-clock times; a real quiet
			// window would make them flaky.
			quiet_hours_start: 0,
			quiet_hours_end: 24,
			rate_limit_per_minute: 10_000,
		},
		dispatcher: Dispatcher::default(),
	}
}

pub async fn test_db() -> Option<TestDatabase> {
	let base_dsn = leadline_testkit::env_dsn()?;
	let db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");

	Some(db)
}

pub async fn build_service(cfg: Config, gateway: Arc<StubGateway>) -> Arc<LeadlineService> {
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect.");

	db.ensure_schema().await.expect("Failed to apply schema.");

	let (service, _receiver) = LeadlineService::with_gateway(cfg, db, gateway);

	Arc::new(service)
}

/// The literal tenant from the end-to-end scenarios. Business hours are
/// wide open so routing lands in the daytime branch regardless of when
/// the suite runs.
pub async fn seed_tenant(service: &LeadlineService) -> Tenant {
	tenants::create(
		&service.db,
		NewTenant {
			name: "Apex Plumbing",
			inbound_number: TENANT_INBOUND,
			operator_number: TENANT_OPERATOR,
			timezone: "America/Los_Angeles",
			day_start: 0,
			day_end: 24,
			evening_end: 24,
			average_job_value: 350,
			review_link: None,
			sheet_id: None,
		},
		OffsetDateTime::now_utc(),
	)
	.await
	.expect("Failed to seed tenant.")
}

pub async fn outbox_rows_to(
	service: &LeadlineService,
	to_number: &str,
) -> Vec<(Uuid, String, String, i32, Option<String>)> {
	sqlx::query_as(
		"\
SELECT id, status, body, attempts, external_id
FROM sms_outbox
WHERE to_number = $1
ORDER BY created_at ASC",
	)
	.bind(to_number)
	.fetch_all(&service.db.pool)
	.await
	.expect("Failed to read outbox rows.")
}

pub async fn count_rows(service: &LeadlineService, query: &str) -> i64 {
	let (count,): (i64,) = sqlx::query_as(query)
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to count rows.");

	count
}
