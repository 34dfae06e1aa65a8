//! # Lukas Shop
//!
//! REST backend for the Lukas shop storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export ACCESS_TOKEN_SECRET=change-me
//! export STRIPE_SECRET_KEY=sk_test_...
//! export DATABASE_PATH=shop.db   # optional, in-memory otherwise
//!
//! # Run the server
//! lukas-shop
//! ```

use shop_api::{routes, AppConfig, AppState, LogFormat};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new(config).await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Document store: {}", state.storage.backend_name());
    info!("Payment provider: {}", state.payments.provider_name());
    info!("Charging in {}", state.config.currency);

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Lukas shop listening on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Products: GET http://{}/product", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}

fn print_banner() {
    println!(
        r#"
  Lukas Shop
  ━━━━━━━━━━━━━━━━━━━━━━━
  Products, purchases & payments
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
