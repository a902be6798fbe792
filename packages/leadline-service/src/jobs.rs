//! Bounded background-job pool for work that must never delay a webhook
//! response: voicemail transcription and spreadsheet logging. A full
//! channel drops the job with a warning instead of blocking.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use leadline_domain::mask_phone;
use leadline_storage::{models::OutboundKind, tenants};

use crate::{BoxFuture, LeadlineService, Result};

pub const DEFAULT_JOB_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub enum Job {
	Transcribe { recording_url: String, call_sid: String, caller: String, tenant_id: Uuid },
	SheetAppend { sheet_id: String, row: Value },
}

#[derive(Clone)]
pub struct JobQueue {
	tx: mpsc::Sender<Job>,
}
impl JobQueue {
	pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
		let (tx, rx) = mpsc::channel(capacity);

		(Self { tx }, JobReceiver { rx })
	}

	pub fn submit(&self, job: Job) {
		if let Err(err) = self.tx.try_send(job) {
			tracing::warn!(error = %err, "Job queue full. Dropping background job.");
		}
	}
}

pub struct JobReceiver {
	rx: mpsc::Receiver<Job>,
}

/// Voicemail transcription backend; the real one lives outside this
/// system. The no-op default declines every recording.
pub trait Transcriber
where
	Self: Send + Sync,
{
	fn transcribe<'a>(&'a self, recording_url: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

/// Spreadsheet export backend; same arrangement.
pub trait SheetWriter
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, sheet_id: &'a str, row: &'a Value) -> BoxFuture<'a, Result<()>>;
}

pub struct NoopTranscriber;
impl Transcriber for NoopTranscriber {
	fn transcribe<'a>(&'a self, _recording_url: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async { Ok(None) })
	}
}

pub struct NoopSheetWriter;
impl SheetWriter for NoopSheetWriter {
	fn append<'a>(&'a self, _sheet_id: &'a str, _row: &'a Value) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

/// Drains the job channel until every sender is gone. Job failures are
/// logged and swallowed; they must never surface into webhook handling.
pub async fn run_jobs(
	service: Arc<LeadlineService>,
	mut receiver: JobReceiver,
	transcriber: Arc<dyn Transcriber>,
	sheets: Arc<dyn SheetWriter>,
) {
	while let Some(job) = receiver.rx.recv().await {
		match job {
			Job::Transcribe { recording_url, call_sid, caller, tenant_id } => {
				let transcript = match transcriber.transcribe(&recording_url).await {
					Ok(Some(text)) => text,
					Ok(None) => continue,
					Err(err) => {
						tracing::warn!(%call_sid, error = %err, "Transcription failed.");

						continue;
					},
				};
				let tenant = match tenants::by_id(&service.db, tenant_id).await {
					Ok(Some(tenant)) => tenant,
					_ => continue,
				};
				let body = format!(
					"Voicemail transcript from {caller}:\n{transcript}\n\nReturn Call:\n{caller}"
				);

				if let Err(err) = service
					.enqueue_message(
						Some(&tenant),
						&tenant.operator_number,
						&body,
						OutboundKind::Internal,
						Some(&format!("{call_sid}_transcript")),
						None,
					)
					.await
				{
					tracing::warn!(
						caller = %mask_phone(&caller),
						error = %err,
						"Failed to queue transcript alert."
					);
				}
			},
			Job::SheetAppend { sheet_id, row } => {
				if let Err(err) = sheets.append(&sheet_id, &row).await {
					tracing::warn!(%sheet_id, error = %err, "Sheet append failed.");
				}
			},
		}
	}
}
