use regex::Regex;

/// Loose E.164 plausibility check. The provider is the authority on number
/// validity; this only rejects obvious garbage before it reaches the queue.
pub fn is_plausible_number(number: &str) -> bool {
	let trimmed = number.trim();

	if trimmed.len() < 10 {
		return false;
	}

	let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

	digits.len() >= 10 && digits.chars().all(|c| c.is_ascii_digit())
}

/// Masks the trailing digits of any E.164-like number embedded in `text`,
/// for log lines. `+15551234444` becomes `+1555123****`.
pub fn mask_phone(text: &str) -> String {
	let Ok(re) = Regex::new(r"\+?\d{10,15}") else {
		return text.to_string();
	};

	re.replace_all(text, |caps: &regex::Captures<'_>| {
		let full = &caps[0];

		if full.len() < 7 {
			full.to_string()
		} else {
			format!("{}****", &full[..full.len() - 4])
		}
	})
	.into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_e164_numbers() {
		assert!(is_plausible_number("+15005550006"));
		assert!(is_plausible_number("15005550006"));
	}

	#[test]
	fn rejects_short_or_alphabetic_input() {
		assert!(!is_plausible_number("12345"));
		assert!(!is_plausible_number("call-me-maybe"));
		assert!(!is_plausible_number(""));
	}

	#[test]
	fn masks_trailing_digits() {
		assert_eq!(mask_phone("+15551234444"), "+1555123****");
		assert_eq!(mask_phone("from +15551234444 today"), "from +1555123**** today");
	}

	#[test]
	fn leaves_short_numbers_alone() {
		assert_eq!(mask_phone("call 911"), "call 911");
	}
}
