//! Gateway for the remote restaurant API.
//!
//! `HttpGateway` turns the four directory operations into HTTP requests and
//! hands them to a `Transport`. It never retries and never looks at status
//! codes beyond success/failure.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{GatewayError, HttpRequest, HttpResponse, Transport};
use crate::models::{FavoriteUpdate, Restaurant, Review};

/// Base URL of the development API server.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:1337";

/// Remote operations the directory depends on.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, GatewayError>;

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, GatewayError>;

    async fn submit_review(&self, review: &Review) -> Result<(), GatewayError>;

    async fn set_favorite(&self, update: FavoriteUpdate) -> Result<(), GatewayError>;
}

pub struct HttpGateway {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl HttpGateway {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn restaurants_url(&self) -> String {
        format!("{}/restaurants", self.base_url)
    }

    fn reviews_url(&self) -> String {
        format!("{}/reviews", self.base_url)
    }

    fn reviews_for_url(&self, restaurant_id: i64) -> String {
        format!("{}/reviews?restaurant_id={}", self.base_url, restaurant_id)
    }

    fn favorite_url(&self, update: &FavoriteUpdate) -> String {
        format!(
            "{}/restaurants/{}?is_favorite={}",
            self.base_url, update.restaurant_id, update.is_favorite
        )
    }

    /// Send a request, turning a non-2xx answer into an error with its body.
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, GatewayError> {
        let method = request.method.clone();
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        debug!(method = %method, url = %url, status = response.status, "Gateway response");

        if response.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::from_status(response.status, &response.text()))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, GatewayError> {
        let response = self.exchange(HttpRequest::get(url)).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, GatewayError> {
        self.get(self.restaurants_url()).await
    }

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, GatewayError> {
        self.get(self.reviews_for_url(restaurant_id)).await
    }

    async fn submit_review(&self, review: &Review) -> Result<(), GatewayError> {
        let request = HttpRequest::new(Method::POST, self.reviews_url()).with_json(review)?;
        self.exchange(request).await?;
        Ok(())
    }

    async fn set_favorite(&self, update: FavoriteUpdate) -> Result<(), GatewayError> {
        let request = HttpRequest::new(Method::PUT, self.favorite_url(&update));
        self.exchange(request).await?;
        Ok(())
    }
}
