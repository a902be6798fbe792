use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Tenant {
	pub id: Uuid,
	pub name: String,
	pub inbound_number: String,
	pub operator_number: String,
	pub timezone: String,
	pub day_start: i32,
	pub day_end: i32,
	pub evening_end: i32,
	pub emergency_mode: bool,
	pub ai_active: bool,
	pub average_job_value: i64,
	pub review_link: Option<String>,
	pub sheet_id: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Lead {
	pub id: Uuid,
	pub tenant_id: Option<Uuid>,
	pub phone: String,
	pub name: Option<String>,
	pub status: String,
	pub intent: Option<String>,
	pub opt_out: bool,
	pub created_at: OffsetDateTime,
	pub last_contact_at: OffsetDateTime,
}
impl Lead {
	pub fn status(&self) -> Option<LeadStatus> {
		LeadStatus::parse(&self.status)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeadStatus {
	New,
	Contacted,
	Replied,
	Booked,
	Lost,
}
impl LeadStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::New => "new",
			Self::Contacted => "contacted",
			Self::Replied => "replied",
			Self::Booked => "booked",
			Self::Lost => "lost",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"new" => Some(Self::New),
			"contacted" => Some(Self::Contacted),
			"replied" => Some(Self::Replied),
			"booked" => Some(Self::Booked),
			"lost" => Some(Self::Lost),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeadIntent {
	Emergency,
	Service,
	Inquiry,
}
impl LeadIntent {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Emergency => "emergency",
			Self::Service => "service",
			Self::Inquiry => "inquiry",
		}
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ConsentRecord {
	pub id: Uuid,
	pub lead_id: Uuid,
	pub tenant_id: Option<Uuid>,
	pub phone: String,
	pub kind: String,
	pub source: String,
	pub consented_at: OffsetDateTime,
	pub expires_at: Option<OffsetDateTime>,
	pub revoked_at: Option<OffsetDateTime>,
	pub revocation_reason: Option<String>,
	pub metadata: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentKind {
	Implied,
	Express,
}
impl ConsentKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Implied => "implied",
			Self::Express => "express",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentSource {
	InboundCall,
	InboundSms,
	WebForm,
	Manual,
}
impl ConsentSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::InboundCall => "inbound_call",
			Self::InboundSms => "inbound_sms",
			Self::WebForm => "web_form",
			Self::Manual => "manual",
		}
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct OutboundMessage {
	pub id: Uuid,
	pub tenant_id: Option<Uuid>,
	pub external_id: Option<String>,
	pub to_number: String,
	pub body: String,
	pub kind: String,
	pub status: String,
	pub attempts: i32,
	pub last_attempt_at: Option<OffsetDateTime>,
	pub locked_at: Option<OffsetDateTime>,
	pub scheduled_for: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub sent_at: Option<OffsetDateTime>,
	pub provider_message_id: Option<String>,
}
impl OutboundMessage {
	pub fn status(&self) -> Option<OutboundStatus> {
		OutboundStatus::parse(&self.status)
	}

	pub fn kind(&self) -> OutboundKind {
		OutboundKind::parse(&self.kind).unwrap_or(OutboundKind::Standard)
	}
}

/// How the safety gate treats a draft. `Internal` drafts go to the
/// tenant's operator or the admin number; `Compliance` drafts are the
/// carrier-mandated STOP confirmations that must outlive the opt-out they
/// acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboundKind {
	Standard,
	Internal,
	Compliance,
}
impl OutboundKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Standard => "standard",
			Self::Internal => "internal",
			Self::Compliance => "compliance",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"standard" => Some(Self::Standard),
			"internal" => Some(Self::Internal),
			"compliance" => Some(Self::Compliance),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboundStatus {
	Pending,
	Processing,
	Sent,
	Delivered,
	Failed,
	FailedOptOut,
	FailedSafety,
	FailedPermanent,
	Cancelled,
}
impl OutboundStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Sent => "sent",
			Self::Delivered => "delivered",
			Self::Failed => "failed",
			Self::FailedOptOut => "failed_optout",
			Self::FailedSafety => "failed_safety",
			Self::FailedPermanent => "failed_permanent",
			Self::Cancelled => "cancelled",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"pending" => Some(Self::Pending),
			"processing" => Some(Self::Processing),
			"sent" => Some(Self::Sent),
			"delivered" => Some(Self::Delivered),
			"failed" => Some(Self::Failed),
			"failed_optout" => Some(Self::FailedOptOut),
			"failed_safety" => Some(Self::FailedSafety),
			"failed_permanent" => Some(Self::FailedPermanent),
			"cancelled" => Some(Self::Cancelled),
			_ => None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Self::Sent
				| Self::Delivered
				| Self::Failed
				| Self::FailedOptOut
				| Self::FailedSafety
				| Self::FailedPermanent
				| Self::Cancelled
		)
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct WebhookEvent {
	pub id: Uuid,
	pub provider_id: String,
	pub kind: String,
	pub tenant_id: Option<Uuid>,
	pub processed_at: OffsetDateTime,
	pub internal_id: Uuid,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AlertBufferEntry {
	pub id: i64,
	pub tenant_id: Uuid,
	pub customer_phone: String,
	pub operator_phone: String,
	pub coalesced_text: String,
	pub message_count: i32,
	pub send_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	Inbound,
	Outbound,
}
impl Direction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Inbound => "inbound",
			Self::Outbound => "outbound",
		}
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ConversationLog {
	pub id: Uuid,
	pub tenant_id: Option<Uuid>,
	pub lead_id: Uuid,
	pub direction: String,
	pub body: String,
	pub external_id: Option<String>,
	pub created_at: OffsetDateTime,
}

/// Activity-feed row: a conversation log joined with its lead.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ActivityEntry {
	pub id: Uuid,
	pub direction: String,
	pub body: String,
	pub created_at: OffsetDateTime,
	pub lead_phone: String,
	pub lead_intent: Option<String>,
}
