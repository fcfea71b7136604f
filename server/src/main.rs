use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use specdex_fetcher::{load_registry, FetchConfig, SpecFetcher};
use specdex_server::{build_app, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "specdex-server")]
#[command(about = "Serve ranked search over a fleet of OpenAPI/Swagger documents")]
struct Args {
    /// Service registry (`.json` list or `id url` lines)
    #[arg(long, default_value = "./services.txt")]
    services: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Pause between services while indexing, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pause_ms: u64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,
    /// Retries per service after the first failed fetch
    #[arg(long, default_value_t = 2)]
    max_retries: u32,
    /// How long a fetched document stays cached, in seconds
    #[arg(long, default_value_t = 300)]
    cache_ttl_secs: u64,
    /// User-Agent sent to upstream services
    #[arg(long, default_value = concat!("specdex/", env!("CARGO_PKG_VERSION")))]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let services = load_registry(&args.services)
        .with_context(|| format!("loading services from {}", args.services.display()))?;
    let config = FetchConfig {
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        max_retries: args.max_retries,
        cache_ttl: Duration::from_secs(args.cache_ttl_secs),
        ..Default::default()
    };
    let fetcher = SpecFetcher::new(config)?;
    let state = AppState::new(fetcher, services, Duration::from_millis(args.pause_ms));
    state.spawn_population();

    let app: Router = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
