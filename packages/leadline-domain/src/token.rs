//! HMAC tokens for the one-click unsubscribe link. The token binds the
//! phone number to the telephony auth token so the public endpoint cannot
//! be used to opt out arbitrary numbers.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn unsubscribe_token(secret: &str, phone: &str) -> String {
	// HMAC accepts any key length; the error arm is unreachable but kept
	// closed rather than panicking.
	let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
		return String::new();
	};

	mac.update(phone.as_bytes());

	encode_hex(&mac.finalize().into_bytes())
}

/// Constant-time comparison via the Mac verifier.
pub fn verify_unsubscribe_token(secret: &str, phone: &str, token: &str) -> bool {
	let Some(expected) = decode_hex(token) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
		return false;
	};

	mac.update(phone.as_bytes());

	mac.verify_slice(&expected).is_ok()
}

pub fn encode_hex(bytes: &[u8]) -> String {
	let mut out = String::with_capacity(bytes.len() * 2);

	for byte in bytes {
		out.push_str(&format!("{byte:02x}"));
	}

	out
}

pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
	if text.len() % 2 != 0 {
		return None;
	}

	let mut out = Vec::with_capacity(text.len() / 2);

	for chunk in text.as_bytes().chunks(2) {
		let high = (chunk[0] as char).to_digit(16)?;
		let low = (chunk[1] as char).to_digit(16)?;

		out.push((high * 16 + low) as u8);
	}

	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_round_trips() {
		let token = unsubscribe_token("secret", "+15551230000");

		assert!(verify_unsubscribe_token("secret", "+15551230000", &token));
	}

	#[test]
	fn token_is_bound_to_phone_and_secret() {
		let token = unsubscribe_token("secret", "+15551230000");

		assert!(!verify_unsubscribe_token("secret", "+15551230001", &token));
		assert!(!verify_unsubscribe_token("other", "+15551230000", &token));
	}

	#[test]
	fn malformed_tokens_fail_closed() {
		assert!(!verify_unsubscribe_token("secret", "+15551230000", "zz"));
		assert!(!verify_unsubscribe_token("secret", "+15551230000", "abc"));
		assert!(!verify_unsubscribe_token("secret", "+15551230000", ""));
	}

	#[test]
	fn hex_round_trips() {
		let bytes = [0_u8, 1, 127, 255];

		assert_eq!(decode_hex(&encode_hex(&bytes)).as_deref(), Some(&bytes[..]));
	}
}
