//! `enumctl`: the CLI binary wiring a [`engine::EngineConfig`], a set of
//! [`engine::source::SourceWorker`]s, and a newline-delimited-JSON output
//! sink around the `engine` crate's enumeration core (§9).

mod cli;
mod config;
mod error;
mod sink;
mod sources;

use std::sync::Arc;

use clap::Parser;
use env_logger::Env;

use engine::source::SourceWorker;
use engine::{DnsRequest, EngineConfig, Enumeration, Tag};

use error::Result;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli_args = cli::Cli::parse();
    cli_args.additional_args.log_summary(&cli_args.root_domains);

    if let Err(e) = run(cli_args).await {
        log::error!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli_args: cli::Cli) -> Result<()> {
    let args = cli_args.additional_args;

    let mut engine_config = EngineConfig::new(cli_args.root_domains);
    engine_config.active_mode = args.active_mode;
    engine_config.resolvers = args.resolvers;
    engine_config.disabled_sources = args.disabled_sources.into_iter().collect();
    engine_config.blacklist = args.blacklist.iter().filter_map(|s| s.parse().ok()).collect();
    engine_config.sem_max_dns_queries = args.max_dns_queries;
    engine_config.include_unresolvable = args.include_unresolvable;

    if let Some(path) = &args.config_file {
        let file_config = config::FileConfig::load(path)?;
        file_config.merge_into(&mut engine_config);
    }

    let sources: Vec<Arc<dyn SourceWorker>> = vec![
        Arc::new(sources::cert::CertSource::new()),
        Arc::new(sources::scrape::ScrapeSource::new()),
        Arc::new(sources::archive::ArchiveSource::new()),
        Arc::new(sources::api::ApiSource::new("https://passive-dns.example")),
    ];

    let mut enumeration = Enumeration::new(engine_config, sources).await?;
    enumeration.seed_roots().await;

    for name in &args.also_resolve {
        let root = name.clone();
        let req = DnsRequest::new(name.clone(), root, Tag::Dns, "also-resolve");
        engine::enumeration::submit_name(&enumeration, req).await;
    }

    let mut sink: sink::Sink<Box<dyn std::io::Write>> = match &args.output_file {
        Some(path) => sink::Sink::new(Box::new(std::fs::File::create(path)?)),
        None => sink::Sink::new(Box::new(std::io::stdout())),
    };

    // Drain output as it arrives until the driver reports no names in
    // flight or queued, then do a final non-blocking drain to pick up
    // anything emitted in the gap between the idle check and here (§4.4
    // Shutdown: the driver polls `namesRemaining()`, it doesn't signal
    // completion any more precisely than that). `next_output` (`&mut self`)
    // and `names_remaining` (`&self`) are called one at a time rather than
    // raced in a `select!`, so there's never a conflicting borrow of
    // `enumeration` live at once.
    const IDLE_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(250);
    loop {
        match tokio::time::timeout(IDLE_CHECK_INTERVAL, enumeration.next_output()).await {
            Ok(Some(record)) => sink.write_record(&record)?,
            Ok(None) => break,
            Err(_elapsed) => {
                if enumeration.names_remaining() <= 0 {
                    break;
                }
            }
        }
    }
    while let Ok(record) = enumeration.try_next_output() {
        sink.write_record(&record)?;
    }

    enumeration.shutdown().await;
    log::info!("done: {} name(s) emitted", sink.emitted());
    Ok(())
}
