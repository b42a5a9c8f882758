use anyhow::Result;
use clap::Parser;
use docstory_engine::config::CliArgs;
use docstory_engine::server::StoryServer;
use docstory_engine::transport::NdjsonTransport;

fn main() -> Result<()> {
	let args = CliArgs::parse();

	// stdout carries the protocol, so logs go to stderr.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let config = args.story_config();
	tracing::info!(threshold = config.threshold, "docstory-engine ready");

	let mut server = StoryServer::new(NdjsonTransport::new(), config);
	server.run()?;
	Ok(())
}
