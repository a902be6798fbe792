use clap::Parser;

use leadline_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	leadline_worker::run(args).await
}
