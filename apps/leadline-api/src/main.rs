use clap::Parser;

use leadline_api::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	leadline_api::run(args).await
}
