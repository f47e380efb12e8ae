use anyhow::Context;
use clap::Parser;
use jiff::Timestamp;
use linkforge_cli::{execute, Cli};
use linkforge_core::{MappingCreator, MappingError};
use linkforge_generator::SeqGenerator;
use linkforge_storage::FileMappingStore;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<MappingError>() {
                Some(mapping) => eprintln!("{}", mapping.rendered()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(
        data_file = %cli.data_file.display(),
        counter_floor = cli.counter_floor,
        "opening mapping store"
    );

    let creator = MappingCreator::new(SeqGenerator::with_offset(cli.counter_floor));
    let store = FileMappingStore::open_with(cli.data_file.clone(), creator)
        .await
        .with_context(|| format!("cannot open {}", cli.data_file.display()))?;

    execute(
        &store,
        store.creator().error_mapper(),
        cli.command,
        Timestamp::now(),
        &mut std::io::stdout(),
    )
    .await
}
