use serde_json::Value;

use crate::{Error, Result};

/// Submits one outbound message to the provider's messages endpoint and
/// returns the provider-assigned message id. The id is later correlated by
/// the delivery-status callback.
pub async fn send(cfg: &leadline_config::Telephony, to: &str, body: &str) -> Result<String> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!(
		"{}/accounts/{}/messages",
		cfg.api_base.trim_end_matches('/'),
		cfg.account_sid
	);
	let form = [("To", to), ("From", cfg.from_number.as_str()), ("Body", body)];
	let response = client
		.post(url)
		.basic_auth(&cfg.account_sid, Some(&cfg.auth_token))
		.form(&form)
		.send()
		.await?;
	let status = response.status();

	if !status.is_success() {
		let text = response.text().await.unwrap_or_default();

		return Err(Error::from_status(status, text));
	}

	let json: Value = response.json().await?;

	parse_send_response(json)
}

pub(crate) fn parse_send_response(json: Value) -> Result<String> {
	json.get("sid")
		.and_then(|v| v.as_str())
		.filter(|sid| !sid.is_empty())
		.map(|sid| sid.to_string())
		.ok_or_else(|| Error::Permanent {
			message: "Send response is missing the message sid.".to_string(),
		})
}
