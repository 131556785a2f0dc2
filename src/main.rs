use cf_log_pusher::config;
use cf_log_pusher::utils::{logger, validation::Validate};
use cf_log_pusher::{
    CliArgs, ElasticSink, FileConfig, LocalArtifactStore, LogpullClient, PusherConfig, PusherError,
    RunCoordinator, WindowClock, WindowWorker,
};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let file = match args.config.as_ref().map(FileConfig::from_file).transpose() {
        Ok(file) => file,
        Err(e) => {
            eprintln!("❌ Failed to load config file: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = config::logger_settings(&args, file.as_ref())
        .and_then(|settings| logger::init_logger(&settings))
    {
        eprintln!("❌ Failed to set up logging: {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    let config = match PusherConfig::resolve(args, file) {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    if let Err(e) = config.validate() {
        fail(e);
    }
    tracing::debug!(
        zone = %config.zone_id,
        interval_secs = config.interval_secs,
        sample_rate = %config.sample_rate,
        pipeline = %config.pipeline_name(),
        storage = ?config.storage,
        log_file = ?config.logging.file,
        "Configuration loaded"
    );

    if let Err(e) = run(config).await {
        fail(e);
    }
}

fn fail(e: PusherError) -> ! {
    tracing::error!("❌ {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

async fn run(config: PusherConfig) -> cf_log_pusher::Result<()> {
    let client = config.http_client()?;

    let source = LogpullClient::new(
        client.clone(),
        &config.cf_api,
        &config.zone_id,
        &config.cf_token,
        config.sample_rate,
        &config.fields,
    )?;
    source.probe_credentials().await?;

    let sink = ElasticSink::new(
        client,
        &config.es_url()?,
        &config.es_username,
        &config.es_password,
        &config.pipeline_name(),
    )?;
    sink.probe_pipeline().await?;
    tracing::info!("✅ Credentials verified, using ingest pipeline {}", sink.pipeline());

    let mut worker = WindowWorker::new(Arc::new(source), Arc::new(sink), config.worker_settings());
    if let Some(storage) = &config.storage {
        worker = worker.with_store(Arc::new(LocalArtifactStore::new(
            storage.path.clone(),
            storage.prefix.clone(),
        )));
    }

    let ct = CancellationToken::new();
    spawn_signal_handler(ct.clone());

    let clock = WindowClock::new(chrono::Utc::now(), config.interval_secs)?;
    RunCoordinator::new(clock, worker).run(ct).await;
    Ok(())
}

fn spawn_signal_handler(ct: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("Unable to listen for SIGTERM: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        ct.cancel();
    });
}
