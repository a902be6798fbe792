pub mod alerts;
pub mod consent;
pub mod dashboard;
pub mod deferred;
pub mod dispatch;
pub mod jobs;
pub mod nudge;
pub mod queue;
pub mod safety;
pub mod sms;
pub mod sms_status;
pub mod unsubscribe;
pub mod voice;
pub mod voice_status;
pub mod voicemail;
pub mod webhook_gate;

mod error;

pub use self::{
	deferred::DeferredEvent,
	dispatch::DispatchOutcome,
	error::{Error, Result},
	jobs::{Job, JobQueue, SheetWriter, Transcriber},
	queue::EnqueueOutcome,
	safety::Rejection,
	sms::{SmsReply, SmsRequest},
	sms_status::SmsStatusRequest,
	voice::{VoiceReply, VoiceRequest},
	voice_status::{CallDisposition, DialStatusRequest},
	voicemail::VoicemailRequest,
	webhook_gate::GateOutcome,
};

use std::{future::Future, pin::Pin, sync::Arc};

use moka::future::Cache;
use time::OffsetDateTime;
use uuid::Uuid;

use leadline_config::Config;
use leadline_domain::mask_phone;
use leadline_providers::lookup::LineLookup;
use leadline_storage::{db::Db, models::OutboundKind};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bounded caches backing the idempotency guard and the opt-out gate when
/// the store is unavailable. Eventually consistent; the store stays the
/// source of truth for consequential writes.
const WEBHOOK_CACHE_CAPACITY: u64 = 10_000;
const OPT_OUT_CACHE_CAPACITY: u64 = 10_000;

/// The only seam that talks to the telephony provider. Everything else in
/// the pipeline is testable against an in-process fake of this trait.
pub trait TelephonyGateway
where
	Self: Send + Sync,
{
	fn send<'a>(
		&'a self,
		cfg: &'a leadline_config::Telephony,
		to: &'a str,
		body: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<String>>;

	fn lookup<'a>(
		&'a self,
		cfg: &'a leadline_config::Telephony,
		number: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<LineLookup>>;
}

struct DefaultGateway;
impl TelephonyGateway for DefaultGateway {
	fn send<'a>(
		&'a self,
		cfg: &'a leadline_config::Telephony,
		to: &'a str,
		body: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<String>> {
		Box::pin(leadline_providers::sms::send(cfg, to, body))
	}

	fn lookup<'a>(
		&'a self,
		cfg: &'a leadline_config::Telephony,
		number: &'a str,
	) -> BoxFuture<'a, leadline_providers::Result<LineLookup>> {
		Box::pin(leadline_providers::lookup::lookup(cfg, number))
	}
}

pub struct LeadlineService {
	pub cfg: Config,
	pub db: Db,
	pub gateway: Arc<dyn TelephonyGateway>,
	pub jobs: JobQueue,
	pub(crate) deferred: deferred::DeferredQueue,
	pub(crate) webhook_cache: Cache<String, Uuid>,
	pub(crate) opt_out_cache: Cache<String, bool>,
}
impl LeadlineService {
	pub fn new(cfg: Config, db: Db) -> (Self, jobs::JobReceiver) {
		Self::with_gateway(cfg, db, Arc::new(DefaultGateway))
	}

	pub fn with_gateway(
		cfg: Config,
		db: Db,
		gateway: Arc<dyn TelephonyGateway>,
	) -> (Self, jobs::JobReceiver) {
		let (jobs, receiver) = JobQueue::bounded(jobs::DEFAULT_JOB_CAPACITY);
		let service = Self {
			cfg,
			db,
			gateway,
			jobs,
			deferred: deferred::DeferredQueue::bounded(deferred::DEFAULT_DEFERRED_CAPACITY),
			webhook_cache: Cache::new(WEBHOOK_CACHE_CAPACITY),
			opt_out_cache: Cache::new(OPT_OUT_CACHE_CAPACITY),
		};

		(service, receiver)
	}

	pub(crate) fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	/// Tenant-local hour, honoring the configured default timezone.
	pub(crate) fn local_hour(&self, tz_name: &str) -> u32 {
		leadline_domain::hours::local_hour(
			chrono::Utc::now(),
			tz_name,
			&self.cfg.messaging.default_timezone,
		)
	}

	/// Fixed-window tenant gate, 60 s windows. Fails open: an inbound lead
	/// is worth more than a precise counter during a store outage.
	pub(crate) async fn rate_limit_exceeded(&self, tenant_id: Uuid) -> bool {
		let key = format!("tenant:{tenant_id}");
		let allowed = leadline_storage::rate_limit::hit(
			&self.db,
			&key,
			self.cfg.messaging.rate_limit_per_minute,
			60,
			OffsetDateTime::now_utc(),
		)
		.await;

		match allowed {
			Ok(allowed) => {
				if !allowed {
					tracing::warn!(%tenant_id, "Tenant rate limit exceeded.");
				}

				!allowed
			},
			Err(err) => {
				tracing::warn!(error = %err, "Rate limit check failed. Allowing request.");

				false
			},
		}
	}

	/// Out-of-band critical alert: a loud log line plus, when an admin
	/// number is configured, an internal SMS through the normal queue.
	/// Best-effort; never propagates failures into the calling handler.
	pub async fn critical_alert(&self, title: &str, details: &str) {
		tracing::error!(%title, details = %mask_phone(details), "Critical alert raised.");

		let Some(admin_number) = self.cfg.messaging.admin_number.clone() else {
			return;
		};
		let body = format!("CRITICAL ALERT: {title}\n\n{details}");

		if let Err(err) = self
			.enqueue_message(None, &admin_number, &body, OutboundKind::Internal, None, None)
			.await
		{
			tracing::error!(error = %err, "Failed to queue critical alert.");
		}
	}
}
