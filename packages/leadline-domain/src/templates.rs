//! Outbound message bodies and voice scripts. Missed-call texts rotate
//! through a fixed template set; rotating the wording improves carrier
//! deliverability for high-volume identical sends.

use rand::seq::SliceRandom;

const MISSED_CALL_TEMPLATES: &[&str] = &[
	"Hi, this is {business_name}'s automated assistant. We missed your call! Are you looking for \
	 emergency service or a standard quote?\nReply STOP to unsubscribe.",
	"Hello! This is {business_name}'s assistant. Sorry we missed you. Do you need emergency help \
	 or just a standard quote?\nReply STOP to unsubscribe.",
	"Hi there from {business_name}! We're busy helping another client. Are you needing emergency \
	 service right now or a standard quote?\nReply STOP to unsubscribe.",
	"Thanks for calling {business_name}. Our team is currently on a job. Are you looking for an \
	 emergency tech or a standard service quote?\nReply STOP to unsubscribe.",
];

pub fn missed_call_sms(business_name: &str) -> String {
	let template = MISSED_CALL_TEMPLATES
		.choose(&mut rand::thread_rng())
		.unwrap_or(&MISSED_CALL_TEMPLATES[0]);

	template.replace("{business_name}", business_name)
}

pub fn missed_call_operator_alert(business_name: &str, caller_name: &str, caller: &str) -> String {
	format!(
		"({business_name}) Lead Alert: Caught a missed call from {caller_name}. I have texted \
		 them back.\n\nClick to Call:\n{caller}"
	)
}

pub fn nudge_sms(business_name: &str) -> String {
	format!(
		"Hi, just following up from {business_name}. Are you still looking for help? Reply here \
		 and we'll get you taken care of.\n\nReply STOP to unsubscribe."
	)
}

pub fn help_sms(business_name: &str) -> String {
	format!(
		"{business_name}: Text us anytime for service. Call for emergencies. Reply STOP to \
		 unsubscribe."
	)
}

pub fn stop_confirmation_sms() -> String {
	"You have been unsubscribed and will receive no further messages.".to_string()
}

pub fn review_request_sms(business_name: &str, review_link: &str) -> String {
	format!(
		"{business_name}: That's music to our ears! It would help us so much if you could leave \
		 that on Google: {review_link}\n\nThanks again!"
	)
}

pub fn review_operator_note(caller: &str, body: &str) -> String {
	format!("5-STAR POTENTIAL: {caller} said '{body}'. I sent them the review link.")
}

pub fn apology_sms(business_name: &str) -> String {
	format!(
		"{business_name}: I am so sorry to hear that. I have just alerted the owner directly, and \
		 they will be calling you shortly to make this right."
	)
}

pub fn negative_feedback_alert(body: &str, caller: &str) -> String {
	format!("NEGATIVE FEEDBACK: Customer says '{body}'.\n\nCall Now:\n{caller}")
}

pub fn emergency_ack_sms(business_name: &str) -> String {
	format!(
		"{business_name}: Understood. I have flagged this as an EMERGENCY. I am paging the \
		 on-call tech right now. Please hold tight."
	)
}

pub fn emergency_operator_alert(caller_name: &str, body: &str, caller: &str) -> String {
	format!("EMERGENCY LEAD: {caller_name} says: '{body}'\n\nTap to Dial:\n{caller}")
}

pub fn standard_ack_sms(business_name: &str) -> String {
	format!(
		"Thanks! I've sent your details to {business_name}. We will get back to you shortly with \
		 a quote."
	)
}

pub fn standard_alert_text(body: &str, caller_name: &str, caller: &str) -> String {
	format!("STANDARD SERVICE: Msg - '{body}'\nFrom: {caller_name}\n\nCall Now:\n{caller}")
}

pub fn voicemail_operator_alert(recording_url: &str, caller: &str) -> String {
	format!(
		"NEW VOICEMAIL: A landline customer left you a message.\nListen: \
		 {recording_url}\n\nReturn Call:\n{caller}"
	)
}

pub fn forwarded_sms(caller: &str, body: &str) -> String {
	format!("Message from {caller}:\n{body}")
}

/// The coalesced operator alert for a quiescent buffer.
pub fn coalesced_alert(customer_phone: &str, count: i32, text: &str) -> String {
	if count > 1 {
		format!("Lead Alert: {customer_phone} sent {count} messages:\n---\n{text}\n---")
	} else {
		format!("Lead Alert: {customer_phone} says: {text}")
	}
}

pub fn dead_letter_alert(message_id: &str, to_masked: &str, attempts: i32) -> String {
	format!(
		"SMS dead-letter: message {message_id} to {to_masked} moved to failed_permanent after \
		 {attempts} attempts."
	)
}

// Voice scripts.

pub fn after_hours_mobile_script(business_name: &str) -> String {
	format!(
		"Hi, you've reached {business_name}. We're currently assisting another customer. I'm \
		 sending you a text right now so we can prioritize your request. Please check your mobile."
	)
}

pub fn after_hours_landline_script(business_name: &str) -> String {
	format!(
		"Hi, you've reached {business_name}. We're currently assisting another customer. Since \
		 you are calling from a landline, please leave a message after the beep and we'll call \
		 you back shortly."
	)
}

pub fn emergency_gather_script(business_name: &str) -> String {
	format!(
		"Hi, you've reached {business_name}. We're currently assisting another customer. I'm \
		 sending you a text right now so we can prioritize your request. Please check your \
		 mobile. If this is an emergency, press 1 to reach our on-call tech."
	)
}

pub fn connecting_script() -> &'static str {
	"Connecting you now. Please hold."
}

pub fn check_texts_script() -> &'static str {
	"Thank you. Please check your text messages."
}

pub fn maintenance_script() -> &'static str {
	"System is currently under maintenance. Please try again later."
}

pub fn system_error_script() -> &'static str {
	"System error. Please try again later."
}

pub fn config_error_script() -> &'static str {
	"System configuration error. Please contact support."
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missed_call_templates_carry_business_and_footer() {
		for _ in 0..16 {
			let body = missed_call_sms("Apex Plumbing");

			assert!(body.contains("Apex Plumbing"));
			assert!(body.contains("Reply STOP"));
		}
	}

	#[test]
	fn every_template_interpolates() {
		for template in MISSED_CALL_TEMPLATES {
			assert!(template.contains("{business_name}"));
		}
	}

	#[test]
	fn coalesced_alert_picks_singular_variant() {
		let single = coalesced_alert("+15550001111", 1, "need a quote");
		let multi = coalesced_alert("+15550001111", 3, "a\nb\nc");

		assert!(single.contains("says:"));
		assert!(multi.contains("sent 3 messages"));
		assert!(multi.contains("---"));
	}

	#[test]
	fn nudge_carries_opt_out_footer() {
		assert!(nudge_sms("Apex").contains("Reply STOP"));
	}
}
