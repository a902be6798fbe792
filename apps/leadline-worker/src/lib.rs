pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use leadline_service::{LeadlineService, jobs};
use leadline_storage::db::Db;

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
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let (service, job_receiver) = LeadlineService::new(config, db);
	let service = Arc::new(service);

	tokio::spawn(jobs::run_jobs(
		service.clone(),
		job_receiver,
		Arc::new(jobs::NoopTranscriber),
		Arc::new(jobs::NoopSheetWriter),
	));

	worker::run_pool(service).await
}
