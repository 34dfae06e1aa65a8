//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the storage gateway, token service, payment gateway and configuration.

use anyhow::Context;
use shop_core::{
    BoxedPaymentGateway, Currency, MemoryStore, ProductCatalog, SharedStore, ShopError,
    ShopResult, SqliteStore, Storage, TokenService,
};
use shop_stripe::StripeIntentGateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Accepted token lifetimes, one hour to one year
const TOKEN_TTL_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// SQLite database file; in-memory store when unset
    pub database_path: Option<PathBuf>,
    /// Seed catalog
    pub catalog_path: PathBuf,
    /// Bearer token lifetime
    pub token_ttl_hours: i64,
    /// Currency payment intents are charged in
    pub currency: Currency,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank values take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| ShopError::Configuration(format!("invalid PORT: {}", port)))?,
            None => 5000,
        };

        let token_ttl_hours: i64 = match var("TOKEN_TTL_HOURS") {
            Some(hours) => hours.trim().parse().map_err(|_| {
                ShopError::Configuration(format!("invalid TOKEN_TTL_HOURS: {}", hours))
            })?,
            None => 1,
        };
        if !TOKEN_TTL_RANGE.contains(&token_ttl_hours) {
            return Err(ShopError::Configuration(format!(
                "TOKEN_TTL_HOURS must be between {} and {}, got {}",
                TOKEN_TTL_RANGE.start(),
                TOKEN_TTL_RANGE.end(),
                token_ttl_hours
            )));
        }

        let currency: Currency = match var("CURRENCY") {
            Some(code) => code.trim().parse()?,
            None => Currency::default(),
        };

        let log_format = match var("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ShopError::Configuration(format!(
                    "invalid LOG_FORMAT: {} (expected pretty or json)",
                    other
                )))
            }
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            database_path: var("DATABASE_PATH").map(PathBuf::from),
            catalog_path: var("CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/products.toml")),
            token_ttl_hours,
            currency,
            log_format,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> ShopResult<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            ShopError::Configuration(format!("invalid bind address {}:{}", self.host, self.port))
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Token lifetime as a duration
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Typed access to the document store
    pub storage: Storage,
    /// Issues and verifies bearer tokens
    pub tokens: Arc<TokenService>,
    /// Payment provider
    pub payments: BoxedPaymentGateway,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state for `config`: open the store, seed the catalog,
    /// and connect the Stripe gateway.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let secret = std::env::var("ACCESS_TOKEN_SECRET")
            .context("ACCESS_TOKEN_SECRET not set")?;
        let tokens = TokenService::new(secret, config.token_ttl())?;

        let store: SharedStore = match &config.database_path {
            Some(path) => Arc::new(
                SqliteStore::open(path)
                    .with_context(|| format!("failed to open database {}", path.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        let storage = Storage::new(store);

        if let Some(catalog) = load_product_catalog(&config.catalog_path)? {
            let seeded = storage.seed_catalog(catalog).await?;
            tracing::info!("Seeded {} products", seeded);
        }

        let stripe = StripeIntentGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        if stripe.is_test_mode() {
            tracing::info!("Stripe running with a test key");
        }

        Ok(Self::from_parts(
            storage,
            tokens,
            Arc::new(stripe) as BoxedPaymentGateway,
            config,
        ))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        storage: Storage,
        tokens: TokenService,
        payments: BoxedPaymentGateway,
        config: AppConfig,
    ) -> Self {
        Self {
            storage,
            tokens: Arc::new(tokens),
            payments,
            config,
        }
    }
}

/// Load the seed catalog, if the file exists
fn load_product_catalog(path: &Path) -> anyhow::Result<Option<ProductCatalog>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No product catalog at {}, skipping seed", path.display());
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };

    let catalog = ProductCatalog::from_toml(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!(
        "Loaded {} products from {}",
        catalog.products.len(),
        path.display()
    );
    Ok(Some(catalog))
}
