use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{multipart, Client};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::MockServer;

use restaurant_service::{
    clients::HttpOrderServiceClient,
    config::ServerConfig,
    create_app,
    handlers::ApiState,
    repositories::{InMemoryRestaurantRepository, RestaurantRepository},
    services::{MenuService, NotificationRelay, OrderStatusService, RestaurantService},
    storage::LocalImageStore,
    Metrics,
};

/// A PNG signature is enough for content sniffing on the way back out
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// A running service backed by in-memory storage, a temporary image
/// directory and a mock order service
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub addr: SocketAddr,
    pub order_service: MockServer,
    pub image_dir: TempDir,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let order_service = MockServer::start().await;
        let image_dir = TempDir::new().unwrap();

        let metrics = Arc::new(Metrics::new().unwrap());
        let repository: Arc<dyn RestaurantRepository> =
            Arc::new(InMemoryRestaurantRepository::new());
        let image_store = Arc::new(LocalImageStore::new(image_dir.path()));
        let order_client = Arc::new(
            HttpOrderServiceClient::new(&order_service.uri(), Duration::from_secs(5), 0).unwrap(),
        );

        let state = ApiState {
            restaurant_service: Arc::new(RestaurantService::new(
                repository.clone(),
                image_store.clone(),
                metrics.clone(),
            )),
            menu_service: Arc::new(MenuService::new(repository, image_store, metrics.clone())),
            order_status_service: Arc::new(OrderStatusService::new(
                order_client.clone(),
                metrics.clone(),
            )),
            notification_relay: Arc::new(NotificationRelay::new(order_client, metrics.clone())),
            assets_url: "/images".to_string(),
        };

        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8081,
            request_timeout_seconds: 30,
            max_request_size: 10 * 1024 * 1024,
            cors_allowed_origin: "http://localhost:3001".to_string(),
        };

        let app = create_app(state, metrics, &server, image_dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", addr),
            addr,
            order_service,
            image_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /restaurants/create with the given JSON part and optional PNG cover
    pub async fn create_restaurant(&self, payload: Value, with_cover: bool) -> reqwest::Response {
        let mut form = multipart::Form::new().part(
            "restaurant",
            multipart::Part::text(payload.to_string())
                .mime_str("application/json")
                .unwrap(),
        );
        if with_cover {
            form = form.part(
                "coverImage",
                multipart::Part::bytes(PNG_BYTES.to_vec())
                    .file_name("cover.png")
                    .mime_str("image/png")
                    .unwrap(),
            );
        }

        self.client
            .post(self.url("/restaurants/create"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Create a restaurant and return its JSON representation
    pub async fn seed_restaurant(&self, name: &str) -> Value {
        let response = self.create_restaurant(restaurant_payload(name), false).await;
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    /// POST a menu item with an optional PNG image
    pub async fn add_menu_item(
        &self,
        restaurant_id: &str,
        payload: Value,
        with_image: bool,
    ) -> reqwest::Response {
        let mut form = multipart::Form::new().part(
            "menuItem",
            multipart::Part::text(payload.to_string())
                .mime_str("application/json")
                .unwrap(),
        );
        if with_image {
            form = form.part(
                "imageFile",
                multipart::Part::bytes(PNG_BYTES.to_vec())
                    .file_name("dish.png")
                    .mime_str("image/png")
                    .unwrap(),
            );
        }

        self.client
            .post(self.url(&format!(
                "/api/owner/restaurants/{}/menu",
                restaurant_id
            )))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Number of files currently in the image directory
    pub fn stored_image_count(&self) -> usize {
        std::fs::read_dir(self.image_dir.path()).unwrap().count()
    }
}

/// A valid restaurant payload using the nested GeoJSON location
pub fn restaurant_payload(name: &str) -> Value {
    json!({
        "name": name,
        "formattedAddress": "1 Harbour Street",
        "contactNumber": "+61 2 5550 1234",
        "cuisineType": "Thai",
        "openingTime": "09:00",
        "closingTime": "22:00",
        "email": "owner@example.com",
        "restaurantPassword": "secret",
        "location": { "type": "Point", "coordinates": [151.2093, -33.8688] }
    })
}
