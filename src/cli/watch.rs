//! Watch command implementation

use crate::agent::{factory::create_agent, AnalysisClient};
use crate::capture::{create_source, create_speaker, CaptureLoop, LoopOptions};
use crate::cli::output::format_entry_line;
use crate::cli::WatchArgs;
use crate::config::{LogFormat, StudyConfig};
use crate::history::{HistoryChange, JsonFileStorage, LogStore, MemoryStorage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &WatchArgs,
) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let mut config = super::load_config(&args.config)?;

    // Apply CLI overrides (highest priority)
    if let Some(interval) = args.interval {
        config.capture.interval_seconds = interval;
    }
    if let Some(provider) = args.provider {
        config.analysis.provider = provider;
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.no_speech {
        config.speech.enabled = false;
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Open the history store the config points at.
pub fn open_store(config: &StudyConfig, persist: bool) -> LogStore {
    if persist {
        let path = config.history.resolved_path();
        tracing::info!(path = %path.display(), "Using persisted history");
        LogStore::open(Box::new(JsonFileStorage::new(path)), config.history.capacity)
    } else {
        tracing::info!("History persistence disabled");
        LogStore::open(Box::new(MemoryStorage::new()), config.history.capacity)
    }
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    cancel_token.cancel();
}

/// Main watch command handler
pub async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting studycam");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Analysis backend
    let http = Arc::new(reqwest::Client::builder().build()?);
    let agent = create_agent(&config.analysis, http)?;
    let profile = agent.profile();
    tracing::info!(
        provider = %profile.backend_type,
        model = %profile.model,
        remote = profile.remote,
        "Vision agent ready"
    );
    let client = AnalysisClient::new(
        agent,
        Duration::from_secs(config.analysis.timeout_seconds),
    );

    // 4. History with a live printer
    let store = Arc::new(open_store(&config, !args.no_persist));
    let printer = store.subscribe(|change| match change {
        HistoryChange::Appended(entry) => println!("{}", format_entry_line(entry)),
        HistoryChange::Cleared => println!("History cleared"),
    });

    // 5. Capture loop
    let capture = CaptureLoop::new(
        create_source(&config.capture),
        client,
        Arc::clone(&store),
        create_speaker(&config.speech),
        LoopOptions::from_config(&config.capture, &config.speech),
    );
    capture.start();
    tracing::info!(interval_seconds = capture.interval(), "Watching, press Ctrl+C to stop");

    // 6. Run until interrupted
    let cancel_token = CancellationToken::new();
    shutdown_signal(cancel_token.clone()).await;

    // 7. Cleanup
    capture.stop();
    store.unsubscribe(printer);
    tracing::info!(entries = store.len(), "studycam stopped");
    Ok(())
}
