use gatekeep::{app, config::AppConfig, state::AppState};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "gatekeep=debug,axum=info,tower_http=info";

/// `RUST_LOG` picks the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(ttl_minutes = config.jwt.ttl_minutes, "configuration loaded");
    let state = AppState::init(config).await?;

    app::serve(app::build_app(state)).await
}
