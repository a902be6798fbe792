pub mod alert_buffer;
pub mod consent;
pub mod db;
pub mod leads;
pub mod logs;
pub mod models;
pub mod outbox;
pub mod rate_limit;
pub mod schema;
pub mod stats;
pub mod tenants;
pub mod webhooks;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
