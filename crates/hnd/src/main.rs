//! hnd: HostNote storage daemon
//!
//! Usage:
//!   hnd [--config /etc/hostnote/config.toml]
//!
//! The daemon sits behind an authenticating reverse proxy and trusts
//! the identity header that proxy injects. It exposes the encrypted
//! per-user file store plus the unauthenticated public-link read route.

mod http;
mod identity;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use hn_core::config::HnConfig;
use hn_crypto::{KdfParams, MasterSecret};
use hn_store::{FileStore, MetadataStore, PublicLinkRegistry};

#[derive(Parser, Debug)]
#[command(name = "hnd", version, about = "HostNote storage daemon")]
struct Cli {
    /// Path to hostnote.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "HOSTNOTE_CONFIG",
        default_value = "/etc/hostnote/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HOSTNOTE_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "HOSTNOTE_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log, &cli.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "hnd starting"
    );

    let config = load_config(&cli.config).await?;
    let master = load_master_secret(&config)?;

    let kdf = KdfParams {
        user_rounds: config.crypto.user_kdf_rounds,
        file_rounds: config.crypto.file_kdf_rounds,
    };

    let registry = Arc::new(PublicLinkRegistry::new(MetadataStore::new(
        &config.storage.root,
    )));
    match registry.rebuild() {
        Ok(links) => info!(links, root = %config.storage.root.display(), "store opened"),
        Err(e) => warn!("registry rebuild failed: {e}  (starting with no public links)"),
    }

    let store = Arc::new(FileStore::new(
        &config.storage.root,
        master,
        kdf,
        registry.clone(),
    ));
    let swept = store.sweep_temp_files();
    if swept > 0 {
        warn!(count = swept, "interrupted writes cleaned up");
    }

    http::serve(&config.server, store, registry).await
}

async fn load_config(path: &PathBuf) -> Result<HnConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    } else {
        warn!("config file not found: {}  (using defaults)", path.display());
        Ok(HnConfig::default())
    }
}

/// The master secret comes from HOSTNOTE_MASTER_SECRET or, failing
/// that, from crypto.master_secret_file. There is no generated default:
/// a store encrypted under an ephemeral secret would be unreadable
/// after a restart.
fn load_master_secret(config: &HnConfig) -> Result<MasterSecret> {
    let hex_str = match std::env::var("HOSTNOTE_MASTER_SECRET") {
        Ok(v) => SecretString::from(v),
        Err(_) => match &config.crypto.master_secret_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("reading master secret {}: {e}", path.display()))?;
                SecretString::from(content)
            }
            None => anyhow::bail!(
                "no master secret: set HOSTNOTE_MASTER_SECRET or crypto.master_secret_file"
            ),
        },
    };
    Ok(MasterSecret::from_hex(&hex_str)?)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
