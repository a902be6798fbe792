//! Deferred webhook replay. When the idempotency ledger cannot answer, the
//! handler still responds success to the provider (anything else triggers
//! a retry storm) and parks the raw event here; a background task replays
//! it through the normal handlers once the store recovers. Replays
//! re-enter the idempotency gate, so double-parked events deduplicate.

use std::{
	collections::VecDeque,
	sync::{Arc, Mutex},
};

use crate::{DialStatusRequest, LeadlineService, SmsRequest, VoiceRequest, VoicemailRequest};

pub const DEFAULT_DEFERRED_CAPACITY: usize = 1_024;

#[derive(Clone, Debug)]
pub enum DeferredEvent {
	Voice(VoiceRequest),
	DialStatus(DialStatusRequest),
	Voicemail(VoicemailRequest),
	Sms(SmsRequest),
}

#[derive(Clone)]
pub(crate) struct DeferredQueue {
	inner: Arc<Mutex<VecDeque<DeferredEvent>>>,
	capacity: usize,
}
impl DeferredQueue {
	pub(crate) fn bounded(capacity: usize) -> Self {
		Self { inner: Arc::new(Mutex::new(VecDeque::new())), capacity }
	}

	fn push(&self, event: DeferredEvent) -> bool {
		let mut queue = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		if queue.len() >= self.capacity {
			return false;
		}

		queue.push_back(event);

		true
	}

	fn pop(&self) -> Option<DeferredEvent> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).pop_front()
	}

	fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

impl LeadlineService {
	pub(crate) fn defer_event(&self, event: DeferredEvent) {
		if self.deferred.push(event) {
			tracing::info!("Webhook parked for deferred replay. Store unavailable.");
		} else {
			tracing::error!("Deferred replay queue full. Dropping webhook event.");
		}
	}

	/// Replays everything parked at the time of the call. An event that
	/// hits a still-unavailable store re-parks itself via the gate, which
	/// is why the drain is bounded by the starting length.
	pub async fn replay_deferred(&self) -> usize {
		let backlog = self.deferred.len();
		let mut replayed = 0;

		for _ in 0..backlog {
			let Some(event) = self.deferred.pop() else {
				break;
			};

			let result = match event {
				DeferredEvent::Voice(req) => self.handle_voice(req).await.map(|_| ()),
				DeferredEvent::DialStatus(req) => self.handle_dial_status(req).await.map(|_| ()),
				DeferredEvent::Voicemail(req) => self.handle_voicemail(req).await.map(|_| ()),
				DeferredEvent::Sms(req) => self.handle_sms(req).await.map(|_| ()),
			};

			match result {
				Ok(()) => replayed += 1,
				Err(err) => {
					tracing::warn!(error = %err, "Deferred replay failed.");
				},
			}
		}

		if replayed > 0 {
			tracing::info!(%replayed, "Replayed deferred webhook events.");
		}

		replayed
	}
}
