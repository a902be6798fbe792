use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Where the current tenant-local hour falls relative to the tenant's
/// business-hours boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayPart {
	Daytime,
	Evening,
	Sleep,
}
impl DayPart {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Daytime => "daytime",
			Self::Evening => "evening",
			Self::Sleep => "sleep",
		}
	}
}

/// Resolves the tenant-local hour. An unknown tenant timezone falls back to
/// the configured default, then UTC; this never fails.
pub fn local_hour(now: DateTime<Utc>, tz_name: &str, default_tz: &str) -> u32 {
	let tz = tz_name
		.parse::<Tz>()
		.or_else(|_| default_tz.parse::<Tz>())
		.unwrap_or(chrono_tz::UTC);

	now.with_timezone(&tz).hour()
}

/// `daytime` iff `day_start <= h < day_end`; `evening` iff
/// `day_end <= h < evening_end`; otherwise `sleep`.
pub fn classify_hour(hour: u32, day_start: u32, day_end: u32, evening_end: u32) -> DayPart {
	if day_start <= hour && hour < day_end {
		DayPart::Daytime
	} else if day_end <= hour && hour < evening_end {
		DayPart::Evening
	} else {
		DayPart::Sleep
	}
}

/// Whether `hour` falls inside the sendable window `[start, end)`.
pub fn within_window(hour: u32, start: u32, end: u32) -> bool {
	start <= hour && hour < end
}
