//! CRM server entry point.

use clap::Parser;
use crm::auth::TokenSigner;
use crm::config::Config;
use crm::http::AppState;
use crm::notify::{NoopNotifier, Notifier, WebhookNotifier};
use crm::service;
use crm::storage::SqliteStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "crm-server", version, about = "Small-business CRM backend")]
struct Cli {
    /// Database path (overrides CRM_DB)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Listen address, host:port (overrides CRM_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug,rusqlite=info,hyper=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = Config::resolve(cli.db.as_deref(), cli.bind.as_deref())?;
    info!(db = %config.db_path.display(), "opening database");

    let mut storage = SqliteStorage::open(&config.db_path)?;
    service::auth::seed_admin(&mut storage, &config.admin)?;

    let signer = TokenSigner::new(config.jwt_secret.as_bytes(), config.token_ttl_secs);
    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            info!(url = %url, "lead notifications enabled");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(NoopNotifier),
    };

    let state = AppState::new(storage, signer, notifier);
    let app = crm::http::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
