//! Call-control markup. The voice router's decisions render to this
//! provider-defined XML tree; it is the output contract of every voice
//! webhook response.

#[derive(Clone, Debug)]
enum Verb {
	Say { text: String },
	Dial { number: String, timeout_secs: u32, action: Option<String>, machine_detection: bool },
	Gather { num_digits: u32, timeout_secs: u32, action: String, prompt: String },
	Record { action: String, max_length_secs: u32, finish_on_key: char },
	Hangup,
}

#[derive(Clone, Debug, Default)]
pub struct VoiceResponse {
	verbs: Vec<Verb>,
}
impl VoiceResponse {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn say(mut self, text: impl Into<String>) -> Self {
		self.verbs.push(Verb::Say { text: text.into() });

		self
	}

	pub fn dial(mut self, number: impl Into<String>, timeout_secs: u32) -> Self {
		self.verbs.push(Verb::Dial {
			number: number.into(),
			timeout_secs,
			action: None,
			machine_detection: false,
		});

		self
	}

	/// Dial with a status-callback action; the provider stops processing
	/// after the dial and reports the outcome to `action`.
	pub fn dial_with_action(
		mut self,
		number: impl Into<String>,
		timeout_secs: u32,
		action: impl Into<String>,
	) -> Self {
		self.verbs.push(Verb::Dial {
			number: number.into(),
			timeout_secs,
			action: Some(action.into()),
			machine_detection: true,
		});

		self
	}

	pub fn gather(
		mut self,
		num_digits: u32,
		timeout_secs: u32,
		action: impl Into<String>,
		prompt: impl Into<String>,
	) -> Self {
		self.verbs.push(Verb::Gather {
			num_digits,
			timeout_secs,
			action: action.into(),
			prompt: prompt.into(),
		});

		self
	}

	pub fn record(
		mut self,
		action: impl Into<String>,
		max_length_secs: u32,
		finish_on_key: char,
	) -> Self {
		self.verbs.push(Verb::Record { action: action.into(), max_length_secs, finish_on_key });

		self
	}

	pub fn hangup(mut self) -> Self {
		self.verbs.push(Verb::Hangup);

		self
	}

	pub fn render(&self) -> String {
		let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");

		for verb in &self.verbs {
			match verb {
				Verb::Say { text } => {
					out.push_str("<Say>");
					out.push_str(&escape_xml(text));
					out.push_str("</Say>");
				},
				Verb::Dial { number, timeout_secs, action, machine_detection } => {
					out.push_str(&format!("<Dial timeout=\"{timeout_secs}\""));

					if let Some(action) = action {
						out.push_str(&format!(
							" action=\"{}\" method=\"POST\"",
							escape_xml(action)
						));
					}
					if *machine_detection {
						out.push_str(" machineDetection=\"Enable\"");
					}

					out.push('>');
					out.push_str(&escape_xml(number));
					out.push_str("</Dial>");
				},
				Verb::Gather { num_digits, timeout_secs, action, prompt } => {
					out.push_str(&format!(
						"<Gather input=\"dtmf\" numDigits=\"{num_digits}\" \
						 timeout=\"{timeout_secs}\" action=\"{}\" method=\"POST\"><Say>{}</Say></Gather>",
						escape_xml(action),
						escape_xml(prompt),
					));
				},
				Verb::Record { action, max_length_secs, finish_on_key } => {
					out.push_str(&format!(
						"<Record action=\"{}\" maxLength=\"{max_length_secs}\" \
						 finishOnKey=\"{finish_on_key}\"/>",
						escape_xml(action),
					));
				},
				Verb::Hangup => out.push_str("<Hangup/>"),
			}
		}

		out.push_str("</Response>");

		out
	}
}

/// The empty acknowledgement for message webhooks.
pub fn empty_message_response() -> String {
	"<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>".to_string()
}

/// A message webhook response carrying one reply body.
pub fn message_response(body: &str) -> String {
	format!(
		"<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
		escape_xml(body)
	)
}

fn escape_xml(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			_ => out.push(c),
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_dial_with_action() {
		let xml = VoiceResponse::new()
			.dial_with_action("+15005550123", 15, "/voice/status")
			.render();

		assert!(xml.starts_with("<?xml"));
		assert!(xml.contains("<Dial timeout=\"15\" action=\"/voice/status\" method=\"POST\""));
		assert!(xml.contains("machineDetection=\"Enable\""));
		assert!(xml.contains("+15005550123</Dial>"));
	}

	#[test]
	fn renders_gather_then_fallthrough() {
		let xml = VoiceResponse::new()
			.gather(1, 5, "/voice", "Press 1 for emergencies.")
			.say("Thank you. Please check your text messages.")
			.hangup()
			.render();
		let gather_at = xml.find("<Gather").expect("gather missing");
		let say_at = xml.rfind("<Say>").expect("say missing");

		assert!(gather_at < say_at);
		assert!(xml.ends_with("<Hangup/></Response>"));
	}

	#[test]
	fn escapes_reserved_characters() {
		let xml = VoiceResponse::new().say("Tom & Jerry's <shop>").render();

		assert!(xml.contains("Tom &amp; Jerry&apos;s &lt;shop&gt;"));
	}

	#[test]
	fn message_response_wraps_body() {
		let xml = message_response("You have been unsubscribed");

		assert!(xml.contains("<Message>You have been unsubscribed</Message>"));
	}

	#[test]
	fn empty_response_is_valid() {
		assert_eq!(
			empty_message_response(),
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>"
		);
	}
}
