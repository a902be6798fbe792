use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub telephony: Telephony,
	pub messaging: Messaging,
	#[serde(default)]
	pub dispatcher: Dispatcher,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Seconds to wait for a pooled connection under contention.
	#[serde(default = "default_acquire_timeout_secs")]
	pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Telephony {
	pub api_base: String,
	pub account_sid: String,
	pub auth_token: String,
	/// The outbound sender identity (E.164).
	pub from_number: String,
	#[serde(default = "default_telephony_timeout_ms")]
	pub timeout_ms: u64,
	/// Line-type/caller-name lookup may be disabled per deployment; callers
	/// are then treated as mobile.
	#[serde(default = "default_true")]
	pub lookup_enabled: bool,
	/// Webhook signature verification. Fail-closed in production; only
	/// local test rigs turn this off.
	#[serde(default = "default_true")]
	pub verify_signatures: bool,
}

#[derive(Debug, Deserialize)]
pub struct Messaging {
	/// Global admin operator number for critical alerts. Optional; empty
	/// disables the SMS channel for critical alerts.
	#[serde(default)]
	pub admin_number: Option<String>,
	pub default_timezone: String,
	/// Blocks all real provider sends; sends resolve to synthetic ids.
	#[serde(default)]
	pub safe_mode: bool,
	/// Rejects all inbound processing.
	#[serde(default)]
	pub kill_switch: bool,
	#[serde(default = "default_quiet_hours_start")]
	pub quiet_hours_start: u32,
	#[serde(default = "default_quiet_hours_end")]
	pub quiet_hours_end: u32,
	#[serde(default = "default_rate_limit_per_minute")]
	pub rate_limit_per_minute: i64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dispatcher {
	pub workers: u32,
	pub claim_limit: i64,
	pub stuck_timeout_secs: i64,
	pub max_retries: i32,
	/// Adaptive polling bounds for the dispatcher idle loop.
	pub poll_floor_ms: u64,
	pub poll_cap_ms: u64,
	pub alert_debounce_secs: i64,
	pub alert_sweep_interval_secs: u64,
	pub nudge_delay_secs: i64,
}
impl Default for Dispatcher {
	fn default() -> Self {
		Self {
			workers: 2,
			claim_limit: 10,
			stuck_timeout_secs: 300,
			max_retries: 5,
			poll_floor_ms: 100,
			poll_cap_ms: 2_000,
			alert_debounce_secs: 30,
			alert_sweep_interval_secs: 5,
			nudge_delay_secs: 120,
		}
	}
}

fn default_acquire_timeout_secs() -> u64 {
	10
}

fn default_telephony_timeout_ms() -> u64 {
	30_000
}

fn default_quiet_hours_start() -> u32 {
	8
}

fn default_quiet_hours_end() -> u32 {
	21
}

fn default_rate_limit_per_minute() -> i64 {
	20
}

fn default_true() -> bool {
	true
}
