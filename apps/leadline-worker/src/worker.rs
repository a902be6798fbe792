//! Dispatcher pool: N cooperating workers claiming from the shared queue.
//! The atomic claim is the only coordination between them; each worker
//! also sweeps the alert buffer between claims and one watchdog task
//! keeps an eye on queue health.

use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use time::Duration as TimeDuration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use leadline_service::LeadlineService;
use leadline_storage::{stats, webhooks};

const KILL_SWITCH_PAUSE_SECS: u64 = 10;
const ERROR_BACKOFF_MS: u64 = 10_000;
const WATCHDOG_INTERVAL_SECS: u64 = 60;
const WATCHDOG_STUCK_AGE_MINS: i64 = 5;
const WATCHDOG_STUCK_ALERT_THRESHOLD: i64 = 10;
const WATCHDOG_FAILURE_ALERT_THRESHOLD: i64 = 5;
const WEBHOOK_PURGE_INTERVAL_SECS: u64 = 3_600;
/// Far past any provider's webhook retry window.
const WEBHOOK_RETENTION_DAYS: i64 = 14;

pub async fn run_pool(service: Arc<LeadlineService>) -> color_eyre::Result<()> {
	let workers = service.cfg.dispatcher.workers;
	let mut set = JoinSet::new();

	info!(%workers, "Dispatcher pool starting.");

	for worker_id in 0..workers {
		set.spawn(dispatch_loop(service.clone(), worker_id));
	}

	set.spawn(watchdog_loop(service.clone()));

	// Loops never return; a finished task means something went badly.
	while let Some(result) = set.join_next().await {
		if let Err(err) = result {
			error!(error = %err, "Worker task aborted.");
		}
	}

	Err(color_eyre::eyre::eyre!("All dispatcher tasks exited."))
}

async fn dispatch_loop(service: Arc<LeadlineService>, worker_id: u32) {
	let floor = service.cfg.dispatcher.poll_floor_ms;
	let cap = service.cfg.dispatcher.poll_cap_ms;
	let sweep_interval = Duration::from_secs(service.cfg.dispatcher.alert_sweep_interval_secs);
	let mut poll_ms = floor;
	let mut last_sweep = Instant::now();

	info!(%worker_id, "Dispatcher started.");

	loop {
		if service.cfg.messaging.kill_switch {
			warn!(%worker_id, "Dispatcher paused. Kill switch is on.");
			tokio::time::sleep(Duration::from_secs(KILL_SWITCH_PAUSE_SECS)).await;

			continue;
		}

		if last_sweep.elapsed() >= sweep_interval {
			if let Err(err) = service.sweep_alerts().await {
				error!(%worker_id, error = %err, "Alert sweep failed.");
			}

			last_sweep = Instant::now();
		}

		match service.process_outbox_once().await {
			Ok(claimed) if claimed > 0 => {
				// Active queue: reset the poll interval and come right back.
				poll_ms = floor;
			},
			Ok(_) => {
				// Idle: exponential poll backoff, capped so a freshly
				// queued message never waits long.
				poll_ms = ((poll_ms as f64 * 1.5) as u64).clamp(floor, cap);
			},
			Err(err) => {
				error!(%worker_id, error = %err, "Dispatcher cycle failed.");

				poll_ms = ERROR_BACKOFF_MS;
			},
		}

		tokio::time::sleep(Duration::from_millis(poll_ms)).await;
	}
}

/// Queue-health telemetry: stuck pending rows and the recent failure
/// rate. Log-only; the numbers feed whatever is watching the logs.
async fn watchdog_loop(service: Arc<LeadlineService>) {
	let mut ticker = tokio::time::interval(Duration::from_secs(WATCHDOG_INTERVAL_SECS));
	let mut last_purge = Instant::now();

	loop {
		ticker.tick().await;

		let now = time::OffsetDateTime::now_utc();

		if last_purge.elapsed() >= Duration::from_secs(WEBHOOK_PURGE_INTERVAL_SECS) {
			let cutoff = now - TimeDuration::days(WEBHOOK_RETENTION_DAYS);

			match webhooks::purge_older_than(&service.db, cutoff).await {
				Ok(purged) if purged > 0 => {
					info!(%purged, "Purged aged webhook idempotency rows.");
				},
				Ok(_) => {},
				Err(err) => {
					warn!(error = %err, "Webhook ledger purge failed.");
				},
			}

			last_purge = Instant::now();
		}
		let stuck_cutoff = now - TimeDuration::minutes(WATCHDOG_STUCK_AGE_MINS);
		let hour_ago = now - TimeDuration::hours(1);
		let stuck = match stats::stuck_pending_count(&service.db, stuck_cutoff).await {
			Ok(count) => count,
			Err(err) => {
				error!(error = %err, "Watchdog check failed.");

				continue;
			},
		};
		let failures = stats::recent_failure_count(&service.db, hour_ago).await.unwrap_or(0);
		let new_leads = stats::leads_created_since(&service.db, hour_ago).await.unwrap_or(0);

		if stuck > WATCHDOG_STUCK_ALERT_THRESHOLD {
			error!(%stuck, "Messages stuck in queue past the dispatch deadline.");
		} else if stuck > 0 {
			warn!(%stuck, "Messages waiting past the dispatch deadline.");
		}
		if failures > WATCHDOG_FAILURE_ALERT_THRESHOLD {
			error!(%failures, "High outbound failure rate over the last hour.");
		}

		info!(%stuck, %failures, %new_leads, "Queue health check.");
	}
}
