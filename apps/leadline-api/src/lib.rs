pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use leadline_service::{LeadlineService, jobs};
use leadline_storage::db::Db;

use crate::state::AppState;

const DEFERRED_REPLAY_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Parser)]
#[command(
	version = leadline_cli::VERSION,
	rename_all = "kebab",
	styles = leadline_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = leadline_config::load(&args.config)?;

	init_tracing(&config);

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;
	let db = Db::connect(&config.storage.postgres).await?;

	// Schema bootstrap failure is fatal; serving webhooks without tables
	// would silently drop leads.
	db.ensure_schema().await?;

	let (service, job_receiver) = LeadlineService::new(config, db);
	let service = Arc::new(service);

	tokio::spawn(jobs::run_jobs(
		service.clone(),
		job_receiver,
		Arc::new(jobs::NoopTranscriber),
		Arc::new(jobs::NoopSheetWriter),
	));
	tokio::spawn(replay_deferred_loop(service.clone()));

	let state = AppState { service };
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);

	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let http_server = async move { axum::serve(http_listener, app).await };
	let admin_server = async move { axum::serve(admin_listener, admin_app).await };

	tokio::try_join!(http_server, admin_server)?;

	Ok(())
}

fn init_tracing(config: &leadline_config::Config) {
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Webhooks parked during store outages replay here once the store is
/// back. The cadence is coarse; the deferred queue is a rescue path, not a
/// throughput path.
async fn replay_deferred_loop(service: Arc<LeadlineService>) {
	let mut ticker = tokio::time::interval(Duration::from_secs(DEFERRED_REPLAY_INTERVAL_SECS));

	loop {
		ticker.tick().await;
		service.replay_deferred().await;
	}
}
