use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;

use rf_admin::cli::{self, Cli, Command, ConfigCommand};
use rf_admin::{api, bootstrap, telemetry};
use rf_domain::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let (config, config_path) = cli::load_config()?;
            let telemetry = telemetry::init_server(&config.observability);
            tracing::info!(
                config_path = %config_path,
                otlp = telemetry.exporting(),
                "configuration loaded"
            );
            let result = serve(Arc::new(config)).await;
            telemetry.shutdown();
            result
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            telemetry::init_cli();
            let (config, config_path) = cli::load_config()?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            telemetry::init_cli();
            let (config, _) = cli::load_config()?;
            cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("renderfleet {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Run the admin server until SIGINT/SIGTERM, then stop node detection.
async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config.clone())?;
    bootstrap::spawn_background_tasks(&state)?;

    let app = api::router()
        .layer(TraceLayer::new_for_http())
        .layer(api::cors::cors_layer(&config.server.cors))
        .layer(tower::limit::ConcurrencyLimitLayer::new(
            config.server.max_concurrent_requests,
        ))
        .with_state(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(
        addr = %addr,
        max_concurrent = config.server.max_concurrent_requests,
        "admin node listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    state.registry.stop();
    state.events.detach();
    tracing::info!(nodes = state.registry.list().len(), "shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
