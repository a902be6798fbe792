use regex::Regex;

/// Opt-out keywords honored on inbound texts. Matched exactly or on a word
/// boundary, lower-cased.
pub const STOP_KEYWORDS: &[&str] =
	&["stop", "unsubscribe", "cancel", "end", "quit", "opt out", "opt-out", "arrêt", "arreter"];

/// Markers of automated replies (out-of-office, driving mode). Replying to
/// these would start a bot-on-bot loop.
pub const AUTO_REPLY_MARKERS: &[&str] =
	&["driving", "away from my phone", "auto-reply", "out of office", "unavailable", "vacation"];

pub const HELP_KEYWORDS: &[&str] = &["help", "info", "aide"];

pub const RESUBSCRIBE_KEYWORDS: &[&str] = &["start", "unstop"];

const POSITIVE_FEEDBACK: &[&str] = &["good", "great", "awesome", "excellent", "yes"];

const NEGATIVE_FEEDBACK: &[&str] = &["bad", "poor", "terrible", "horrible", "no", "worst"];

/// Immediate danger or active property damage.
const SEVERE_KEYWORDS: &[&str] = &[
	"burst",
	"explode",
	"flood",
	"flooding",
	"sewage",
	"gas smell",
	"gas leak",
	"water everywhere",
	"overflowing",
];

/// Urgent but not necessarily destructive yet.
const ELEVATED_KEYWORDS: &[&str] =
	&["emergency", "urgent", "no water", "overflow", "toilet overflow", "basement", "ceiling"];

/// Needs attention, routinely schedulable.
const BASE_KEYWORDS: &[&str] =
	&["leak", "leaking", "clogged", "backed up", "no heat", "no hot water", "frozen pipe"];

const URGENCY_PHRASES: &[&str] = &[
	r"\b(?:right now|immediately|asap|as soon as possible)\b",
	r"\b(?:can'?t wait|need help now|please hurry)\b",
	r"\b(?:water (?:is|everywhere|flooding)|flooding|burst|exploded)\b",
];

const STANDARD_PHRASES: &[&str] = &[
	r"\b(?:quote|estimate|price|cost|how much)\b",
	r"\b(?:schedule|appointment|when can|next week|next month)\b",
	r"\b(?:small leak|dripping|minor)\b",
];

const NOT_URGENT_OVERRIDE: &str = r"\b(?:not urgent|not an emergency|can wait|when convenient)\b";

/// First-stage routing decision for an inbound text, in priority order.
/// Urgency scoring only runs for `Standard`-eligible bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
	StopRequest { keyword: &'static str },
	AutoReply,
	HelpRequest,
	Resubscribe,
	PositiveFeedback,
	NegativeFeedback,
	Standard,
}

/// Routes a raw inbound body through the keyword ladder. Callers handle the
/// provider status-echo and kill-switch cases before this.
pub fn classify_inbound(body: &str) -> InboundKind {
	let clean = body.trim().to_lowercase();

	if let Some(keyword) = stop_keyword(&clean) {
		return InboundKind::StopRequest { keyword };
	}
	if AUTO_REPLY_MARKERS.iter().any(|marker| clean.contains(marker)) {
		return InboundKind::AutoReply;
	}
	if HELP_KEYWORDS.contains(&clean.as_str()) {
		return InboundKind::HelpRequest;
	}
	if RESUBSCRIBE_KEYWORDS.contains(&clean.as_str()) {
		return InboundKind::Resubscribe;
	}
	if POSITIVE_FEEDBACK.contains(&clean.as_str()) {
		return InboundKind::PositiveFeedback;
	}
	if NEGATIVE_FEEDBACK.contains(&clean.as_str()) {
		return InboundKind::NegativeFeedback;
	}

	InboundKind::Standard
}

fn stop_keyword(clean: &str) -> Option<&'static str> {
	for keyword in STOP_KEYWORDS {
		if clean == *keyword {
			return Some(keyword);
		}
	}
	for keyword in STOP_KEYWORDS {
		let pattern = format!(r"\b{}\b", regex::escape(keyword));

		if Regex::new(&pattern).map(|re| re.is_match(clean)).unwrap_or(false) {
			return Some(keyword);
		}
	}

	None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
	Emergency,
	Standard,
	Unknown,
}
impl Urgency {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Emergency => "emergency",
			Self::Standard => "standard",
			Self::Unknown => "unknown",
		}
	}
}

#[derive(Clone, Debug)]
pub struct UrgencyReport {
	pub urgency: Urgency,
	pub confidence: f32,
	pub keywords_found: Vec<&'static str>,
}
impl UrgencyReport {
	pub fn is_emergency(&self) -> bool {
		self.urgency == Urgency::Emergency
	}
}

/// Weighted keyword scoring with an explicit "not urgent" override. Word
/// boundaries keep "leakproof" from matching "leak".
pub fn classify_urgency(body: &str) -> UrgencyReport {
	let clean = body.trim().to_lowercase();

	if clean.is_empty() {
		return UrgencyReport { urgency: Urgency::Unknown, confidence: 0.0, keywords_found: vec![] };
	}
	if matches_any(&clean, &[NOT_URGENT_OVERRIDE]) {
		return UrgencyReport {
			urgency: Urgency::Standard,
			confidence: 0.85,
			keywords_found: vec![],
		};
	}

	let mut keywords_found = Vec::new();
	let mut emergency_score = 0_u32;

	for (weight, set) in
		[(3, SEVERE_KEYWORDS), (2, ELEVATED_KEYWORDS), (1, BASE_KEYWORDS)]
	{
		for keyword in set {
			let pattern = format!(r"\b{}\b", regex::escape(keyword));

			if Regex::new(&pattern).map(|re| re.is_match(&clean)).unwrap_or(false) {
				keywords_found.push(*keyword);

				emergency_score += weight;
			}
		}
	}

	if matches_any(&clean, URGENCY_PHRASES) {
		emergency_score += 2;
	}

	let standard_score =
		STANDARD_PHRASES.iter().filter(|pattern| pattern_matches(&clean, pattern)).count() as u32;

	let (urgency, confidence) = if emergency_score >= 3 {
		(Urgency::Emergency, (0.7 + emergency_score as f32 * 0.05).min(0.95))
	} else if emergency_score >= 1 && standard_score == 0 {
		(Urgency::Emergency, 0.6 + emergency_score as f32 * 0.1)
	} else if standard_score >= 2 && emergency_score == 0 {
		(Urgency::Standard, 0.85)
	} else if standard_score >= 1 && emergency_score < 2 {
		(Urgency::Standard, 0.7)
	} else {
		(Urgency::Unknown, 0.5)
	};

	UrgencyReport { urgency, confidence: confidence.min(1.0), keywords_found }
}

fn matches_any(clean: &str, patterns: &[&str]) -> bool {
	patterns.iter().any(|pattern| pattern_matches(clean, pattern))
}

fn pattern_matches(clean: &str, pattern: &str) -> bool {
	Regex::new(pattern).map(|re| re.is_match(clean)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_exact_stop() {
		assert_eq!(classify_inbound("STOP"), InboundKind::StopRequest { keyword: "stop" });
		assert_eq!(classify_inbound("  Unsubscribe "), InboundKind::StopRequest {
			keyword: "unsubscribe"
		});
	}

	#[test]
	fn detects_embedded_stop_on_word_boundary() {
		assert_eq!(classify_inbound("please STOP texting me"), InboundKind::StopRequest {
			keyword: "stop"
		});
		// "stopwatch" must not trip the boundary match.
		assert_eq!(classify_inbound("my stopwatch broke"), InboundKind::Standard);
	}

	#[test]
	fn detects_auto_reply_markers() {
		assert_eq!(classify_inbound("I'm driving, will reply later"), InboundKind::AutoReply);
		assert_eq!(classify_inbound("Out of office until Monday"), InboundKind::AutoReply);
	}

	#[test]
	fn detects_compliance_keywords() {
		assert_eq!(classify_inbound("HELP"), InboundKind::HelpRequest);
		assert_eq!(classify_inbound("aide"), InboundKind::HelpRequest);
		assert_eq!(classify_inbound("START"), InboundKind::Resubscribe);
		assert_eq!(classify_inbound("unstop"), InboundKind::Resubscribe);
	}

	#[test]
	fn detects_review_feedback() {
		assert_eq!(classify_inbound("great"), InboundKind::PositiveFeedback);
		assert_eq!(classify_inbound("terrible"), InboundKind::NegativeFeedback);
		// Feedback only matches the bare word, not sentences.
		assert_eq!(classify_inbound("great service yesterday"), InboundKind::Standard);
	}

	#[test]
	fn scores_severe_damage_as_emergency() {
		let report = classify_urgency("My pipe burst and water is everywhere!");

		assert_eq!(report.urgency, Urgency::Emergency);
		assert!(report.confidence >= 0.7);
		assert!(report.keywords_found.contains(&"burst"));
	}

	#[test]
	fn not_urgent_overrides_keywords() {
		let report = classify_urgency("Small leak under the sink, not urgent at all");

		assert_eq!(report.urgency, Urgency::Standard);
	}

	#[test]
	fn quote_requests_are_standard() {
		let report = classify_urgency("Can I get a quote? When can you schedule me in?");

		assert_eq!(report.urgency, Urgency::Standard);
	}

	#[test]
	fn word_boundaries_prevent_false_positives() {
		let report = classify_urgency("I bought a leakproof container");

		assert_ne!(report.urgency, Urgency::Emergency);
	}

	#[test]
	fn empty_body_is_unknown() {
		let report = classify_urgency("   ");

		assert_eq!(report.urgency, Urgency::Unknown);
		assert_eq!(report.confidence, 0.0);
	}
}
