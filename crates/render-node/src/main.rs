//! Render node agent binary.
//!
//! Usage:
//!   render-node --admin 10.6.0.10 [--port 4000] [--admin-port 3000]
//!
//! Env vars:
//!   RF_ADMIN_IP      admin node address
//!   RF_RENDER_PORT   port this agent listens on

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rf_render_node::{host, register_with_admin, router, AgentState};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "render-node", version, about = "renderfleet render node agent")]
struct Args {
    /// Admin node address.
    #[arg(long, env = "RF_ADMIN_IP")]
    admin: Ipv4Addr,
    /// Port to listen on.
    #[arg(long, env = "RF_RENDER_PORT", default_value_t = 4000)]
    port: u16,
    /// Admin node HTTP port.
    #[arg(long, default_value_t = 3000)]
    admin_port: u16,
    /// Address to register with instead of the detected one.
    #[arg(long)]
    advertise: Option<Ipv4Addr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let address = host::advertise_address(args.admin, args.admin_port, args.advertise);
    tracing::info!(admin = %args.admin, address = %address, "render node agent starting");

    let state = AgentState::new(address);
    let app = router(state).layer(TraceLayer::new_for_http());

    let bind = (Ipv4Addr::UNSPECIFIED, args.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding to 0.0.0.0:{}", args.port))?;
    tracing::info!(port = args.port, "render node listening");

    match register_with_admin(args.admin, args.admin_port, address, REGISTER_TIMEOUT).await {
        Ok(message) => tracing::info!(%message, "registered with admin node"),
        Err(e) => tracing::error!(error = %e, "failed to register with admin node"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received SIGINT, shutting down");
        })
        .await
        .context("axum server error")?;

    Ok(())
}
