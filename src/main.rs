use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yatube::{make_router, run_app, AppConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("yatube=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        addr = %config.server_addr,
        paginate_by = config.paginate_by,
        "starting yatube"
    );
    let router = make_router();
    if let Err(error) = run_app(router, config).await {
        tracing::error!(error = ?error, "server exited");
        return Err(error);
    }
    Ok(())
}
