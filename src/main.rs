use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use restaurant_service::{
    clients::HttpOrderServiceClient,
    config::{StorageBackend, StorageConfig},
    create_app,
    handlers::ApiState,
    init_observability,
    repositories::{
        DynamoDbRestaurantRepository, InMemoryRestaurantRepository,
        InstrumentedRestaurantRepository, RestaurantRepository, TableManager,
    },
    services::{MenuService, NotificationRelay, OrderStatusService, RestaurantService},
    shutdown_observability,
    storage::LocalImageStore,
    Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().context("invalid configuration")?;

    init_observability(&config.observability).context("failed to initialize observability")?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let repository = build_repository(&config.storage, metrics.clone()).await?;

    let image_directory = PathBuf::from(&config.images.image_directory);
    let image_store = Arc::new(LocalImageStore::new(image_directory.clone()));
    image_store
        .ensure_directory()
        .await
        .context("failed to prepare image directory")?;
    info!("Storing images in {}", image_directory.display());

    let order_client = Arc::new(HttpOrderServiceClient::new(
        &config.order_service.order_service_url,
        config.order_service.timeout(),
        config.order_service.order_service_retry_attempts,
    )
    .context("invalid order service URL")?);
    info!(
        "Order service at {}",
        config.order_service.order_service_url
    );

    let state = ApiState {
        restaurant_service: Arc::new(RestaurantService::new(
            repository.clone(),
            image_store.clone(),
            metrics.clone(),
        )),
        menu_service: Arc::new(MenuService::new(
            repository,
            image_store,
            metrics.clone(),
        )),
        order_status_service: Arc::new(OrderStatusService::new(
            order_client.clone(),
            metrics.clone(),
        )),
        notification_relay: Arc::new(NotificationRelay::new(order_client, metrics.clone())),
        assets_url: config.images.public_assets_url.clone(),
    };

    let app = create_app(state, metrics, &config.server, &image_directory);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Pick the storage backend and wrap it with database tracing
async fn build_repository(
    storage: &StorageConfig,
    metrics: Arc<Metrics>,
) -> anyhow::Result<Arc<dyn RestaurantRepository>> {
    let inner: Arc<dyn RestaurantRepository> = match storage.backend()? {
        StorageBackend::Memory => {
            info!("Using in-memory restaurant storage");
            Arc::new(InMemoryRestaurantRepository::new())
        }
        StorageBackend::DynamoDb => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(storage.region.clone()))
                .load()
                .await;
            let client = Arc::new(DynamoDbClient::new(&aws_config));

            if storage.auto_create_tables {
                TableManager::new(client.clone())
                    .ensure_restaurants_table(&storage.restaurants_table_name)
                    .await
                    .context("failed to create restaurants table")?;
            }

            info!(
                "Using DynamoDB table {} in {}",
                storage.restaurants_table_name, storage.region
            );
            Arc::new(DynamoDbRestaurantRepository::new(
                client,
                storage.restaurants_table_name.clone(),
                storage.region.clone(),
            ))
        }
    };

    Ok(Arc::new(InstrumentedRestaurantRepository::new(
        inner,
        metrics,
        storage.restaurants_table_name.clone(),
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown_observability().await;
}
