use std::sync::Arc;

use kilim_api::config::Config;
use kilim_infra::{CatalogStore, MemoryCatalogStore, PgCatalogStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kilim_observability::init();

    let config = Config::from_env();

    let store: Arc<dyn CatalogStore> = if config.postgres_dsn.is_empty() {
        tracing::info!("KILIM_POSTGRES_DSN not set; using in-memory catalog store");
        Arc::new(
            MemoryCatalogStore::new().with_empty_company_listing(config.empty_company_listing),
        )
    } else {
        let pool = sqlx::PgPool::connect(&config.postgres_dsn).await?;
        let store =
            PgCatalogStore::new(pool).with_empty_company_listing(config.empty_company_listing);
        store.migrate().await?;
        tracing::info!("connected to postgres catalog store");
        Arc::new(store)
    };

    let app = kilim_api::app::build_app(store, config.service_timeout);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
