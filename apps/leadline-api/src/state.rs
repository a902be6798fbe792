use std::sync::Arc;

use leadline_service::LeadlineService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LeadlineService>,
}
