//! The safety gate. Single authorization point for every outbound draft;
//! both the enqueue path and the dispatcher's pre-send re-evaluation go
//! through here, because an opt-out can land between the two.

use leadline_domain::{hours, mask_phone, phone};
use leadline_storage::{consent, leads, models::OutboundKind, models::Tenant};

use crate::{LeadlineService, Result};

const OPT_OUT_TOKENS: &[&str] = &["stop", "unsubscribe", "cancel", "opt out", "opt-out"];

const URL_SHORTENERS: &[&str] =
	&["bit.ly", "tinyurl.com", "goo.gl", "t.co", "is.gd", "buff.ly"];

/// Body markers identifying a direct response to an inbound call. Such a
/// draft may race the consent write it is itself evidence for, so the
/// consent check is waived.
const INBOUND_RESPONSE_TOKENS: &[&str] = &["assistant", "missed your call", "standard quote"];

const EMERGENCY_RESPONSE_TOKENS: &[&str] = &["emergency", "urgent"];

pub const COMPLIANCE_FOOTER: &str = "\n\nReply STOP to unsubscribe.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
	OptOut,
	InvalidTenant,
	InvalidNumber,
	NoConsent,
	QuietHours,
}
impl Rejection {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::OptOut => "opt_out",
			Self::InvalidTenant => "invalid_tenant",
			Self::InvalidNumber => "invalid_number",
			Self::NoConsent => "no_consent",
			Self::QuietHours => "quiet_hours",
		}
	}
}

#[derive(Clone, Debug)]
pub struct AuthorizedDraft {
	pub body: String,
}

impl LeadlineService {
	/// Authorizes one outbound draft, possibly mutating the body (footer
	/// append). `enforce_quiet_hours` is on for the dispatcher's pre-send
	/// check and off at enqueue time, where a quiet-hours row is accepted
	/// and naturally held by the claim predicate until the window opens.
	pub async fn authorize_outbound(
		&self,
		tenant: Option<&Tenant>,
		to: &str,
		body: &str,
		kind: OutboundKind,
		enforce_quiet_hours: bool,
	) -> Result<std::result::Result<AuthorizedDraft, Rejection>> {
		// Opt-out binds every kind except the STOP confirmation itself;
		// that enqueue always happens after the opt-out write it confirms.
		if kind != OutboundKind::Compliance && self.is_opted_out_cached(to).await? {
			return Ok(Err(Rejection::OptOut));
		}

		if kind == OutboundKind::Standard && tenant.is_none() {
			return Ok(Err(Rejection::InvalidTenant));
		}
		if !phone::is_plausible_number(to) {
			return Ok(Err(Rejection::InvalidNumber));
		}

		if kind == OutboundKind::Standard {
			let lower = body.to_lowercase();
			let inbound_response =
				INBOUND_RESPONSE_TOKENS.iter().any(|token| lower.contains(token));

			if !inbound_response && !consent::is_valid(&self.db, to, self.now()).await? {
				return Ok(Err(Rejection::NoConsent));
			}

			if enforce_quiet_hours {
				let tz = tenant
					.map(|t| t.timezone.as_str())
					.unwrap_or(&self.cfg.messaging.default_timezone);
				let hour = self.local_hour(tz);
				let in_window = hours::within_window(
					hour,
					self.cfg.messaging.quiet_hours_start,
					self.cfg.messaging.quiet_hours_end,
				);
				let emergency_response =
					EMERGENCY_RESPONSE_TOKENS.iter().any(|token| lower.contains(token));

				if !in_window && !emergency_response && !inbound_response {
					return Ok(Err(Rejection::QuietHours));
				}
			}
		}

		let mut body = body.to_string();

		if kind == OutboundKind::Standard {
			let lower = body.to_lowercase();

			if !OPT_OUT_TOKENS.iter().any(|token| lower.contains(token)) {
				body.push_str(COMPLIANCE_FOOTER);
			}
		}

		let lower = body.to_lowercase();

		if let Some(shortener) = URL_SHORTENERS.iter().find(|s| lower.contains(*s)) {
			// Carriers filter shortened links aggressively; warn, never block.
			tracing::warn!(
				to = %mask_phone(to),
				%shortener,
				"Outbound body contains a URL shortener. Carriers may filter it."
			);
		}

		Ok(Ok(AuthorizedDraft { body }))
	}

	/// Cache-first opt-out check. A store outage degrades to the cache
	/// answer rather than blocking the gate.
	pub(crate) async fn is_opted_out_cached(&self, phone: &str) -> Result<bool> {
		if self.opt_out_cache.get(phone).await == Some(true) {
			return Ok(true);
		}

		match leads::is_opted_out(&self.db, phone).await {
			Ok(blocked) => {
				if blocked {
					self.opt_out_cache.insert(phone.to_string(), true).await;
				}

				Ok(blocked)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Opt-out store check failed. Falling back to cache only."
				);

				Ok(false)
			},
		}
	}
}
