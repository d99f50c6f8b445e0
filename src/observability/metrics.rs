use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the restaurant service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    // Database metrics
    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    // Business metrics
    pub restaurant_operations_total: CounterVec,
    pub menu_operations_total: CounterVec,
    pub order_status_updates_total: CounterVec,
    pub notifications_total: CounterVec,
    pub notification_subscribers: Gauge,
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered on a fresh registry
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests processed"),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;

        let http_requests_in_flight = GaugeVec::new(
            Opts::new(
                "http_requests_in_flight",
                "Number of HTTP requests currently being processed",
            ),
            &["method", "endpoint"],
        )?;

        let database_operations_total = CounterVec::new(
            Opts::new("database_operations_total", "Total number of database operations"),
            &["operation", "table", "status"],
        )?;

        let database_operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "database_operation_duration_seconds",
                "Database operation duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["operation", "table"],
        )?;

        let restaurant_operations_total = CounterVec::new(
            Opts::new(
                "restaurant_operations_total",
                "Total number of restaurant operations",
            ),
            &["operation", "status"],
        )?;

        let menu_operations_total = CounterVec::new(
            Opts::new("menu_operations_total", "Total number of menu item operations"),
            &["operation", "status"],
        )?;

        let order_status_updates_total = CounterVec::new(
            Opts::new(
                "order_status_updates_total",
                "Order status updates forwarded to the order service",
            ),
            &["order_status", "status"],
        )?;

        let notifications_total = CounterVec::new(
            Opts::new("notifications_total", "Notifications relayed by the service"),
            &["channel", "status"],
        )?;

        let notification_subscribers = Gauge::new(
            "notification_subscribers",
            "Live subscribers on the order notification channel",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(database_operations_total.clone()))?;
        registry.register(Box::new(database_operation_duration_seconds.clone()))?;
        registry.register(Box::new(restaurant_operations_total.clone()))?;
        registry.register(Box::new(menu_operations_total.clone()))?;
        registry.register(Box::new(order_status_updates_total.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(notification_subscribers.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            database_operations_total,
            database_operation_duration_seconds,
            restaurant_operations_total,
            menu_operations_total,
            order_status_updates_total,
            notifications_total,
            notification_subscribers,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    pub fn record_database_operation(
        &self,
        operation: &str,
        table: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        self.database_operations_total
            .with_label_values(&[operation, table, status_label(success)])
            .inc();

        self.database_operation_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }

    pub fn record_restaurant_operation(&self, operation: &str, success: bool) {
        self.restaurant_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    pub fn record_menu_operation(&self, operation: &str, success: bool) {
        self.menu_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    pub fn record_order_status_update(&self, order_status: &str, success: bool) {
        self.order_status_updates_total
            .with_label_values(&[order_status, status_label(success)])
            .inc();
    }

    pub fn record_notification(&self, channel: &str, success: bool) {
        self.notifications_total
            .with_label_values(&[channel, status_label(success)])
            .inc();
    }

    pub fn set_notification_subscribers(&self, count: usize) {
        self.notification_subscribers.set(count as f64);
    }

    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_http_request_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_http_request("GET", "/restaurants", 200, 0.123);
        metrics.record_http_request("POST", "/owner/restaurants", 400, 0.456);

        let metrics_text = metrics.encode().unwrap();
        assert!(metrics_text.contains("http_requests_total"));
        assert!(metrics_text.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_database_operation_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_database_operation("find_by_id", "Restaurants", true, 0.050);
        metrics.record_database_operation("update", "Restaurants", false, 0.100);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("database_operations_total"));
        assert!(encoded.contains("database_operation_duration_seconds"));
    }

    #[test]
    fn test_business_metrics_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_restaurant_operation("create", true);
        metrics.record_menu_operation("toggle_availability", false);
        metrics.record_order_status_update("PREPARING", true);
        metrics.record_notification("relay", true);
        metrics.set_notification_subscribers(3);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("restaurant_operations_total"));
        assert!(encoded.contains("menu_operations_total"));
        assert!(encoded.contains("order_status_updates_total"));
        assert!(encoded.contains("notifications_total"));
        assert!(encoded.contains("notification_subscribers 3"));
    }

    #[test]
    fn test_in_flight_requests() {
        let metrics = Metrics::new().unwrap();

        metrics.increment_in_flight("GET", "/restaurants");
        metrics.increment_in_flight("GET", "/restaurants");
        metrics.decrement_in_flight("GET", "/restaurants");

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("http_requests_in_flight"));
    }
}
