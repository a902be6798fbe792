//! Webhook signature verification. The provider signs the full request URL
//! concatenated with every form field, sorted by name, keyed on the account
//! auth token; the hex digest arrives in the signature header. Verification
//! fails closed and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use leadline_domain::token::{decode_hex, encode_hex};

pub const SIGNATURE_HEADER: &str = "x-telephony-signature";

type HmacSha256 = Hmac<Sha256>;

pub fn compute_signature(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
	let Ok(mut mac) = HmacSha256::new_from_slice(auth_token.as_bytes()) else {
		return String::new();
	};
	let mut sorted: Vec<_> = params.iter().collect();

	sorted.sort_by(|a, b| a.0.cmp(&b.0));

	mac.update(url.as_bytes());

	for (key, value) in sorted {
		mac.update(key.as_bytes());
		mac.update(value.as_bytes());
	}

	encode_hex(&mac.finalize().into_bytes())
}

pub fn verify_signature(
	auth_token: &str,
	url: &str,
	params: &[(String, String)],
	provided_hex: &str,
) -> bool {
	let Some(provided) = decode_hex(provided_hex) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(auth_token.as_bytes()) else {
		return false;
	};
	let mut sorted: Vec<_> = params.iter().collect();

	sorted.sort_by(|a, b| a.0.cmp(&b.0));

	mac.update(url.as_bytes());

	for (key, value) in sorted {
		mac.update(key.as_bytes());
		mac.update(value.as_bytes());
	}

	mac.verify_slice(&provided).is_ok()
}
