//! Product commands.
//!
//! # Usage
//!
//! ```bash
//! # Create every product without a Polar ID at Polar
//! emporium products sync
//! ```
//!
//! # Environment Variables
//!
//! - `POLAR_ACCESS_TOKEN`, `POLAR_SERVER`, `POLAR_API_URL` - see the storefront config

use std::sync::Arc;

use emporium_storefront::config::{ConfigError, PolarConfig};
use emporium_storefront::db::Stores;
use emporium_storefront::polar::{PaymentError, PolarClient};
use emporium_storefront::services::{CatalogService, ShopError, SyncReport};

use super::{CommandError, connect};

/// Errors that can occur during product operations.
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Polar client error: {0}")]
    Client(#[from] PaymentError),

    #[error(transparent)]
    Shop(#[from] ShopError),
}

/// Push every unmapped product to Polar.
///
/// # Errors
///
/// Returns `ProductError` if configuration is missing or the product list
/// cannot be loaded. Individual product failures are counted, not returned.
pub async fn sync() -> Result<SyncReport, ProductError> {
    dotenvy::dotenv().ok();
    let polar = PolarConfig::from_env()?;
    let client = PolarClient::new(&polar)?;
    let stores = Stores::postgres(connect().await?);

    tracing::info!(server = ?polar.server, "Syncing unmapped products to Polar...");
    let report = CatalogService::new(stores.catalog, Arc::new(client), true)
        .sync_unmapped()
        .await?;

    tracing::info!("Sync complete!");
    tracing::info!("  Created: {}", report.created);
    if report.failed > 0 {
        tracing::warn!("  Failed: {} (see warnings above)", report.failed);
    }
    Ok(report)
}
