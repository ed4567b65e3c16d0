use anyhow::Context;

use medcamp_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    medcamp_observability::init();

    let config = ApiConfig::from_env();
    let app = medcamp_api::app::build_app(&config.backend)
        .await
        .context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        http_backend = config.backend.uses_http_backend(),
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
