#[path = "acceptance/suite.rs"]
mod suite;

#[path = "acceptance/claim_contention.rs"]
mod claim_contention;
#[path = "acceptance/debouncer.rs"]
mod debouncer;
#[path = "acceptance/duplicate_webhook.rs"]
mod duplicate_webhook;
#[path = "acceptance/missed_call.rs"]
mod missed_call;
#[path = "acceptance/reply_cancels_nudge.rs"]
mod reply_cancels_nudge;
#[path = "acceptance/status_callback.rs"]
mod status_callback;
#[path = "acceptance/stop_opt_out.rs"]
mod stop_opt_out;
#[path = "acceptance/stuck_recovery.rs"]
mod stuck_recovery;
