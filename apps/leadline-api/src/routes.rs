//! Public webhook routes and the admin/dashboard routes. Webhook policy:
//! a known path always answers 200 with valid provider markup so the
//! provider never retry-storms; the single exception is a failed
//! signature check, which is 403 fail-closed.

use axum::{
	Json, Router,
	extract::{Path, Query, RawForm, State},
	http::{HeaderMap, StatusCode, Uri, header},
	response::{Html, IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use leadline_providers::{signature, twiml};
use leadline_service::{
	DialStatusRequest, Error as ServiceError, SmsRequest, SmsStatusRequest, VoiceRequest,
	VoicemailRequest,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/voice", post(voice))
		.route("/voice/status", post(voice_status))
		.route("/voice/voicemail", post(voicemail))
		.route("/sms", post(sms))
		.route("/sms/status", post(sms_status))
		.route("/health", get(health))
		.route("/unsubscribe", get(unsubscribe))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/dashboard/activity/{tenant_id}", get(dashboard_activity))
		.route("/v1/dashboard/funnel/{tenant_id}", get(dashboard_funnel))
		.route("/v1/dashboard/revenue/{tenant_id}", get(dashboard_revenue))
		.route("/v1/dashboard/leads/{tenant_id}", get(dashboard_leads))
		.route("/v1/dashboard/queue", get(dashboard_queue))
		.route("/v1/tenants/{tenant_id}/ai-active", post(set_ai_active))
		.with_state(state)
}

// Webhook plumbing.

struct WebhookForm {
	params: Vec<(String, String)>,
}
impl WebhookForm {
	fn field(&self, name: &str) -> String {
		self.params
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.trim().to_string())
			.unwrap_or_default()
	}

	fn optional_field(&self, name: &str) -> Option<String> {
		Some(self.field(name)).filter(|value| !value.is_empty())
	}
}

/// Parses the form body and verifies the provider signature against the
/// reconstructed request URL. Fail-closed: missing header, missing server
/// credential, or a mismatch all yield 403.
fn verify_webhook(
	state: &AppState,
	headers: &HeaderMap,
	uri: &Uri,
	body: &[u8],
) -> Result<WebhookForm, Response> {
	let params: Vec<(String, String)> = serde_urlencoded::from_bytes(body).unwrap_or_default();
	let cfg = &state.service.cfg.telephony;

	if !cfg.verify_signatures {
		tracing::warn!(path = %uri.path(), "Insecure mode: skipping signature validation.");

		return Ok(WebhookForm { params });
	}

	let Some(provided) = headers
		.get(signature::SIGNATURE_HEADER)
		.and_then(|value| value.to_str().ok())
	else {
		tracing::warn!(path = %uri.path(), "Missing webhook signature header.");

		return Err((StatusCode::FORBIDDEN, "Forbidden: Missing Signature").into_response());
	};

	if cfg.auth_token.trim().is_empty() {
		tracing::error!("Refusing webhook: no auth token configured for verification.");

		return Err(
			(StatusCode::FORBIDDEN, "Forbidden: Server Security Misconfigured").into_response()
		);
	}

	let url = reconstruct_url(headers, uri);

	if !signature::verify_signature(&cfg.auth_token, &url, &params, provided) {
		tracing::warn!(path = %uri.path(), "Invalid webhook signature.");

		return Err((StatusCode::FORBIDDEN, "Forbidden: Invalid Signature").into_response());
	}

	Ok(WebhookForm { params })
}

/// The provider signs the public URL; behind the proxy we rebuild it from
/// the forwarded scheme and the Host header.
fn reconstruct_url(headers: &HeaderMap, uri: &Uri) -> String {
	let scheme = headers
		.get("x-forwarded-proto")
		.and_then(|value| value.to_str().ok())
		.unwrap_or("http");
	let host = headers
		.get(header::HOST)
		.and_then(|value| value.to_str().ok())
		.unwrap_or("localhost");
	let path_and_query =
		uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());

	format!("{scheme}://{host}{path_and_query}")
}

fn xml_response(body: String) -> Response {
	([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

// Webhook handlers.

async fn voice(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	RawForm(body): RawForm,
) -> Response {
	let form = match verify_webhook(&state, &headers, &uri, &body) {
		Ok(form) => form,
		Err(response) => return response,
	};
	let request = VoiceRequest {
		from: form.field("From"),
		to: form.field("To"),
		call_sid: form.field("CallSid"),
		digits: form.optional_field("Digits"),
	};

	match state.service.handle_voice(request).await {
		Ok(reply) => xml_response(reply.twiml),
		Err(err) => {
			tracing::error!(error = %err, "Voice handler failed.");

			xml_response(error_voice_response())
		},
	}
}

async fn voice_status(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	RawForm(body): RawForm,
) -> Response {
	let form = match verify_webhook(&state, &headers, &uri, &body) {
		Ok(form) => form,
		Err(response) => return response,
	};
	let request = DialStatusRequest {
		call_sid: form.field("CallSid"),
		dial_call_status: form.field("DialCallStatus"),
		answered_by: form.optional_field("AnsweredBy"),
		from: form.field("From"),
		to: form.field("To"),
	};

	match state.service.handle_dial_status(request).await {
		Ok(reply) => xml_response(reply.twiml),
		Err(err) => {
			tracing::error!(error = %err, "Dial-status handler failed.");

			xml_response(twiml::VoiceResponse::new().render())
		},
	}
}

async fn voicemail(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	RawForm(body): RawForm,
) -> Response {
	let form = match verify_webhook(&state, &headers, &uri, &body) {
		Ok(form) => form,
		Err(response) => return response,
	};
	let request = VoicemailRequest {
		call_sid: form.field("CallSid"),
		from: form.field("From"),
		to: form.field("To"),
		recording_url: form.field("RecordingUrl"),
	};

	match state.service.handle_voicemail(request).await {
		Ok(reply) => xml_response(reply.twiml),
		Err(err) => {
			tracing::error!(error = %err, "Voicemail handler failed.");

			xml_response(twiml::VoiceResponse::new().render())
		},
	}
}

async fn sms(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	RawForm(body): RawForm,
) -> Response {
	let form = match verify_webhook(&state, &headers, &uri, &body) {
		Ok(form) => form,
		Err(response) => return response,
	};
	let request = SmsRequest {
		from: form.field("From"),
		to: form.field("To"),
		body: form.field("Body"),
		message_sid: form.field("MessageSid"),
		sms_status: form.optional_field("SmsStatus"),
	};

	match state.service.handle_sms(request).await {
		Ok(reply) => xml_response(reply.twiml),
		Err(err) => {
			tracing::error!(error = %err, "SMS handler failed.");

			xml_response(twiml::empty_message_response())
		},
	}
}

async fn sms_status(
	State(state): State<AppState>,
	headers: HeaderMap,
	uri: Uri,
	RawForm(body): RawForm,
) -> Response {
	let form = match verify_webhook(&state, &headers, &uri, &body) {
		Ok(form) => form,
		Err(response) => return response,
	};
	let request = SmsStatusRequest {
		message_sid: form.field("MessageSid"),
		message_status: form.field("MessageStatus"),
	};

	if let Err(err) = state.service.handle_sms_status(request).await {
		tracing::error!(error = %err, "Status callback handling failed.");
	}

	StatusCode::OK.into_response()
}

#[derive(Debug, Serialize)]
struct HealthBody {
	status: &'static str,
	kill_switch: bool,
	telephony_configured: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
	let cfg = &state.service.cfg;

	Json(HealthBody {
		status: "ok",
		kill_switch: cfg.messaging.kill_switch,
		telephony_configured: !cfg.telephony.account_sid.trim().is_empty()
			&& !cfg.telephony.auth_token.trim().is_empty(),
	})
}

#[derive(Debug, Deserialize)]
struct UnsubscribeParams {
	#[serde(default)]
	phone: String,
	#[serde(default)]
	token: String,
}

async fn unsubscribe(
	State(state): State<AppState>,
	Query(params): Query<UnsubscribeParams>,
) -> Response {
	match state.service.handle_unsubscribe(&params.phone, &params.token).await {
		Ok(html) => Html(html).into_response(),
		Err(ServiceError::Validation { .. }) =>
			(StatusCode::BAD_REQUEST, "Invalid Request. Missing phone or token.").into_response(),
		Err(ServiceError::Auth { .. }) =>
			(StatusCode::FORBIDDEN, "Invalid Security Token.").into_response(),
		Err(err) => {
			tracing::error!(error = %err, "Unsubscribe failed.");

			(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
		},
	}
}

// Dashboard handlers.

async fn dashboard_activity(
	State(state): State<AppState>,
	Path(tenant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let entries = state.service.dashboard_activity(tenant_id).await?;
	let entries: Vec<_> = entries
		.into_iter()
		.map(|entry| {
			serde_json::json!({
				"id": entry.id,
				"direction": entry.direction,
				"body": entry.body,
				"created_at": entry.created_at.to_string(),
				"lead_phone": entry.lead_phone,
				"lead_intent": entry.lead_intent,
			})
		})
		.collect();

	Ok(Json(serde_json::Value::Array(entries)))
}

async fn dashboard_funnel(
	State(state): State<AppState>,
	Path(tenant_id): Path<Uuid>,
) -> Result<Json<leadline_storage::stats::FunnelStats>, ApiError> {
	Ok(Json(state.service.dashboard_funnel(tenant_id).await?))
}

async fn dashboard_revenue(
	State(state): State<AppState>,
	Path(tenant_id): Path<Uuid>,
) -> Result<Json<leadline_storage::stats::RevenueStats>, ApiError> {
	Ok(Json(state.service.dashboard_revenue(tenant_id).await?))
}

async fn dashboard_leads(
	State(state): State<AppState>,
	Path(tenant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let leads = state.service.dashboard_leads(tenant_id).await?;
	let leads: Vec<_> = leads
		.into_iter()
		.map(|lead| {
			serde_json::json!({
				"id": lead.id,
				"phone": lead.phone,
				"name": lead.name,
				"status": lead.status,
				"intent": lead.intent,
				"opt_out": lead.opt_out,
				"created_at": lead.created_at.to_string(),
				"last_contact_at": lead.last_contact_at.to_string(),
			})
		})
		.collect();

	Ok(Json(serde_json::Value::Array(leads)))
}

async fn dashboard_queue(
	State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let rows = state.service.dashboard_queue().await?;
	let rows: Vec<_> = rows
		.into_iter()
		.map(|row| {
			serde_json::json!({
				"id": row.id,
				"to_number": row.to_number,
				"body": row.body,
				"status": row.status,
				"attempts": row.attempts,
				"created_at": row.created_at.to_string(),
				"sent_at": row.sent_at.map(|ts| ts.to_string()),
			})
		})
		.collect();

	Ok(Json(serde_json::Value::Array(rows)))
}

#[derive(Debug, Deserialize)]
struct AiActiveBody {
	active: bool,
}

async fn set_ai_active(
	State(state): State<AppState>,
	Path(tenant_id): Path<Uuid>,
	Json(body): Json<AiActiveBody>,
) -> Result<StatusCode, ApiError> {
	state.service.set_ai_active(tenant_id, body.active).await?;

	Ok(StatusCode::NO_CONTENT)
}

fn error_voice_response() -> String {
	twiml::VoiceResponse::new()
		.say("System error. Please try again later.")
		.hangup()
		.render()
}

// Error envelope for the admin surface.

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::Validation { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::Auth { .. } => (StatusCode::FORBIDDEN, "forbidden"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
		};

		Self { status, error_code: error_code.to_string(), message: err.to_string() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
