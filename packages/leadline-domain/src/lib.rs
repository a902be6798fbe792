pub mod classify;
pub mod hours;
pub mod phone;
pub mod templates;
pub mod token;

pub use classify::{InboundKind, Urgency, UrgencyReport};
pub use hours::DayPart;
pub use phone::mask_phone;
