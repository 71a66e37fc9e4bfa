//! `powerwall-reserve` binary: one flow per invocation, result printed as JSON.

// std
use std::{process::ExitCode, sync::Arc};
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
// self
use powerwall_reserve::{
	cli::{self, Cli, Command},
	flows::Scheduler,
	store::{FileStore, ParameterStore},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
	color_eyre::install()?;

	let cli = Cli::parse();

	cli::init_tracing(cli.log_format);

	let params = ParameterStore::new(Arc::new(FileStore::open(&cli.store_path)?));

	if let Command::PutParameter { name, value } = &cli.command {
		params.put(*name, value.as_str()).await?;

		return Ok(ExitCode::SUCCESS);
	}

	let config = cli.runtime_config()?;
	let services = cli.channel_services(&config)?;
	let scheduler = Scheduler::new(params, config)?.with_services(services);
	let result = match cli.command.schedule_event() {
		Some(event) => {
			let event = event.map_err(|e| eyre!("Invalid trigger payload: {e}"))?;

			scheduler.apply_schedule(&event).await
		},
		None => scheduler.daily_refresh().await,
	};

	println!("{}", serde_json::to_string_pretty(&result)?);

	Ok(if result.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
