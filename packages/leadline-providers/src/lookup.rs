use serde_json::Value;
use tracing::warn;

use leadline_domain::mask_phone;

use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineType {
	Mobile,
	Landline,
	Unknown,
}
impl LineType {
	pub fn parse(raw: &str) -> Self {
		match raw.to_lowercase().as_str() {
			"mobile" | "voip" => Self::Mobile,
			"landline" => Self::Landline,
			_ => Self::Unknown,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Mobile => "mobile",
			Self::Landline => "landline",
			Self::Unknown => "unknown",
		}
	}
}

#[derive(Clone, Debug)]
pub struct LineLookup {
	pub line_type: LineType,
	pub caller_name: Option<String>,
}
impl Default for LineLookup {
	fn default() -> Self {
		// Assume mobile so a lookup outage never blocks the SMS fallback.
		Self { line_type: LineType::Mobile, caller_name: None }
	}
}

/// Number intelligence: line type and caller name. Any failure degrades to
/// the mobile default rather than blocking call handling.
pub async fn lookup(cfg: &leadline_config::Telephony, number: &str) -> Result<LineLookup> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}/lookups/{}", cfg.api_base.trim_end_matches('/'), number);
	let response = client
		.get(url)
		.basic_auth(&cfg.account_sid, Some(&cfg.auth_token))
		.send()
		.await?;
	let status = response.status();

	if !status.is_success() {
		warn!(number = %mask_phone(number), %status, "Number lookup failed. Assuming mobile.");

		return Ok(LineLookup::default());
	}

	let json: Value = response.json().await?;

	Ok(parse_lookup_response(json))
}

pub(crate) fn parse_lookup_response(json: Value) -> LineLookup {
	let line_type = json
		.get("line_type")
		.and_then(|v| v.as_str())
		.map(LineType::parse)
		.unwrap_or(LineType::Mobile);
	let caller_name = json
		.get("caller_name")
		.and_then(|v| v.as_str())
		.map(|name| name.trim())
		.filter(|name| !name.is_empty())
		.map(|name| name.to_string());

	LineLookup { line_type, caller_name }
}
