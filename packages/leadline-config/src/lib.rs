mod types;

use std::{fs, path::Path};

use color_eyre::eyre;

pub use types::{Config, Dispatcher, Messaging, Postgres, Service, Storage, Telephony};

pub fn load(path: &Path) -> color_eyre::Result<Config> {
	let raw = fs::read_to_string(path)?;

	let mut cfg: Config = toml::from_str(&raw)?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	if cfg.messaging.admin_number.as_deref().map(|n| n.trim().is_empty()).unwrap_or(false) {
		cfg.messaging.admin_number = None;
	}
}

pub fn validate(cfg: &Config) -> color_eyre::Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(eyre::eyre!("service.http_bind must be non-empty."));
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(eyre::eyre!("service.admin_bind must be non-empty."));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(eyre::eyre!("storage.postgres.dsn must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(eyre::eyre!("storage.postgres.pool_max_conns must be greater than zero."));
	}
	if cfg.storage.postgres.acquire_timeout_secs < 10 {
		return Err(eyre::eyre!("storage.postgres.acquire_timeout_secs must be at least 10."));
	}

	// Real sends require real credentials. Safe mode runs without them.
	if !cfg.messaging.safe_mode {
		for (label, value) in [
			("telephony.api_base", &cfg.telephony.api_base),
			("telephony.account_sid", &cfg.telephony.account_sid),
			("telephony.auth_token", &cfg.telephony.auth_token),
			("telephony.from_number", &cfg.telephony.from_number),
		] {
			if value.trim().is_empty() {
				return Err(eyre::eyre!("{label} must be non-empty when safe_mode is off."));
			}
		}
	}
	if cfg.telephony.timeout_ms == 0 {
		return Err(eyre::eyre!("telephony.timeout_ms must be greater than zero."));
	}

	if cfg.messaging.default_timezone.trim().is_empty() {
		return Err(eyre::eyre!("messaging.default_timezone must be non-empty."));
	}
	if cfg.messaging.quiet_hours_start >= cfg.messaging.quiet_hours_end {
		return Err(eyre::eyre!(
			"messaging.quiet_hours_start must be earlier than messaging.quiet_hours_end."
		));
	}
	if cfg.messaging.quiet_hours_end > 24 {
		return Err(eyre::eyre!("messaging.quiet_hours_end must be 24 or less."));
	}
	if cfg.messaging.rate_limit_per_minute <= 0 {
		return Err(eyre::eyre!("messaging.rate_limit_per_minute must be greater than zero."));
	}

	if cfg.dispatcher.workers < 2 {
		return Err(eyre::eyre!("dispatcher.workers must be at least 2."));
	}
	if cfg.dispatcher.claim_limit <= 0 {
		return Err(eyre::eyre!("dispatcher.claim_limit must be greater than zero."));
	}
	if cfg.dispatcher.stuck_timeout_secs <= 0 {
		return Err(eyre::eyre!("dispatcher.stuck_timeout_secs must be greater than zero."));
	}
	if cfg.dispatcher.max_retries <= 0 {
		return Err(eyre::eyre!("dispatcher.max_retries must be greater than zero."));
	}
	if cfg.dispatcher.poll_floor_ms == 0 || cfg.dispatcher.poll_cap_ms < cfg.dispatcher.poll_floor_ms
	{
		return Err(eyre::eyre!(
			"dispatcher.poll_floor_ms must be non-zero and no greater than dispatcher.poll_cap_ms."
		));
	}
	if cfg.dispatcher.alert_debounce_secs <= 0 {
		return Err(eyre::eyre!("dispatcher.alert_debounce_secs must be greater than zero."));
	}
	if cfg.dispatcher.nudge_delay_secs <= 0 {
		return Err(eyre::eyre!("dispatcher.nudge_delay_secs must be greater than zero."));
	}

	Ok(())
}
