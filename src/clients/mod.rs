// Clients module - outbound calls to other services

pub mod order_service;

pub use order_service::{ClientError, HttpOrderServiceClient, OrderServiceClient};
