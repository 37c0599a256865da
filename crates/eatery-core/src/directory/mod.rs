//! Offline-first access to restaurants and reviews.
//!
//! `Directory` is the single read/write entry point for front ends. Reads
//! come from the local store when it holds a non-empty value and fall back
//! to the gateway otherwise, refreshing the store with what the network
//! returned. Writes update the local copy first and are then either sent
//! right away or parked in the offline queues until connectivity returns.

pub mod error;
pub mod filter;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::Gateway;
use crate::models::{FavoriteUpdate, Restaurant, Review};
use crate::store::{LocalStore, Partition, RESTAURANTS_KEY};
use crate::sync::{Connectivity, OfflineQueues, SyncReport};

pub use error::DirectoryError;
pub use filter::ALL;

/// What happened to a write after it was stored locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Forwarded to the server and accepted.
    Sent,
    /// Offline; waiting in the queue for the next reconnect.
    Queued,
    /// Forwarded while online but the server call failed. Not retried.
    Failed(String),
}

/// Snapshot of local cache state for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatus {
    pub store_available: bool,
    pub store_version: Option<u32>,
    pub restaurant_count: usize,
    pub restaurants_age: Option<String>,
    pub pending_reviews: usize,
    pub pending_favorites: usize,
    pub online: bool,
}

/// Clone is cheap; clones share the store, gateway, queues and
/// connectivity flag.
#[derive(Clone)]
pub struct Directory {
    store: LocalStore,
    gateway: Arc<dyn Gateway>,
    queues: Arc<OfflineQueues>,
    connectivity: Connectivity,
    /// Held across each read-append-write of a stored list so concurrent
    /// writers, including clones, never overwrite each other's entries.
    local_writes: Arc<Mutex<()>>,
}

impl Directory {
    pub fn new(store: LocalStore, gateway: Arc<dyn Gateway>, connectivity: Connectivity) -> Self {
        Self {
            store,
            gateway,
            queues: Arc::new(OfflineQueues::new()),
            connectivity,
            local_writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn queues(&self) -> &OfflineQueues {
        &self.queues
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // ===== Local store helpers =====

    /// Store read that treats any failure as a miss.
    async fn load<T: DeserializeOwned>(&self, partition: Partition, key: &str) -> Option<T> {
        match self.store.get(partition, key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Local store read failed, treating as miss");
                None
            }
        }
    }

    /// Store write that logs and carries on if persisting fails.
    async fn persist<T: Serialize>(&self, partition: Partition, key: &str, value: &T) {
        if let Err(e) = self.store.put(partition, key, value).await {
            warn!(error = %e, "Failed to persist to local store");
        }
    }

    async fn cached_restaurants(&self) -> Option<Vec<Restaurant>> {
        self.load(Partition::Restaurants, RESTAURANTS_KEY)
            .await
            .filter(|list: &Vec<Restaurant>| !list.is_empty())
    }

    async fn cached_reviews(&self, restaurant_id: i64) -> Option<Vec<Review>> {
        self.load(Partition::Reviews, &restaurant_id.to_string())
            .await
            .filter(|list: &Vec<Review>| !list.is_empty())
    }

    // ===== Reads =====

    /// All restaurants, from the local store when possible.
    pub async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, DirectoryError> {
        if let Some(restaurants) = self.cached_restaurants().await {
            debug!(count = restaurants.len(), "Restaurants served from local store");
            return Ok(restaurants);
        }

        let restaurants = self.gateway.fetch_restaurants().await.map_err(|e| {
            warn!(error = %e, "Failed to fetch restaurants");
            DirectoryError::from(e)
        })?;
        debug!(count = restaurants.len(), "Restaurants fetched from network");
        self.persist(Partition::Restaurants, RESTAURANTS_KEY, &restaurants)
            .await;
        Ok(restaurants)
    }

    pub async fn fetch_restaurant_by_id(&self, id: i64) -> Result<Restaurant, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        filter::find_by_id(&restaurants, id)
            .cloned()
            .ok_or(DirectoryError::RestaurantNotFound { id })
    }

    pub async fn fetch_restaurant_by_cuisine(
        &self,
        cuisine: &str,
    ) -> Result<Vec<Restaurant>, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(filter::by_cuisine(&restaurants, cuisine))
    }

    pub async fn fetch_restaurant_by_neighborhood(
        &self,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(filter::by_neighborhood(&restaurants, neighborhood))
    }

    /// Pass `ALL` for either argument to skip that filter.
    pub async fn fetch_restaurant_by_cuisine_and_neighborhood(
        &self,
        cuisine: &str,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(filter::by_cuisine_and_neighborhood(
            &restaurants,
            cuisine,
            neighborhood,
        ))
    }

    pub async fn fetch_neighborhoods(&self) -> Result<Vec<String>, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(filter::neighborhoods(&restaurants))
    }

    pub async fn fetch_cuisines(&self) -> Result<Vec<String>, DirectoryError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(filter::cuisines(&restaurants))
    }

    /// Reviews for one restaurant, from the local store when possible.
    /// An empty list from the network is returned but not stored.
    pub async fn fetch_reviews_by_restaurant_id(
        &self,
        restaurant_id: i64,
    ) -> Result<Vec<Review>, DirectoryError> {
        if let Some(reviews) = self.cached_reviews(restaurant_id).await {
            debug!(restaurant_id, count = reviews.len(), "Reviews served from local store");
            return Ok(reviews);
        }

        let reviews = self
            .gateway
            .fetch_reviews(restaurant_id)
            .await
            .map_err(|e| {
                warn!(restaurant_id, error = %e, "Failed to fetch reviews");
                DirectoryError::from(e)
            })?;
        if !reviews.is_empty() {
            self.persist(Partition::Reviews, &restaurant_id.to_string(), &reviews)
                .await;
        }
        Ok(reviews)
    }

    // ===== Writes =====

    /// Add a review locally, then send it or queue it.
    ///
    /// When nothing is cached for the restaurant yet the current list is
    /// read through from the network first (online only), so the first
    /// review for a restaurant is kept rather than dropped.
    pub async fn post_new_review(&self, mut review: Review) -> Result<Delivery, DirectoryError> {
        if !review.is_complete() {
            return Err(DirectoryError::InvalidReview(
                "name and comments are required".to_string(),
            ));
        }
        review.rating = Review::clamp_rating(review.rating as i64);

        let restaurant_id = review.restaurant_id;
        let local = self.local_writes.lock().await;
        let mut reviews = match self.cached_reviews(restaurant_id).await {
            Some(reviews) => reviews,
            None if self.connectivity.is_online() => self
                .fetch_reviews_by_restaurant_id(restaurant_id)
                .await
                .unwrap_or_else(|e| {
                    debug!(restaurant_id, error = %e, "Read-through failed, starting a new review list");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        reviews.push(review.clone());
        self.persist(Partition::Reviews, &restaurant_id.to_string(), &reviews)
            .await;
        drop(local);

        if self.connectivity.is_online() {
            Ok(match self.gateway.submit_review(&review).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    warn!(restaurant_id, error = %e, "Failed to send review");
                    Delivery::Failed(e.to_string())
                }
            })
        } else {
            info!(restaurant_id, "Offline, queueing review");
            self.queues.reviews.enqueue(review);
            Ok(Delivery::Queued)
        }
    }

    /// Set a restaurant's favorite flag locally, then send it or queue it.
    ///
    /// If no listing can be loaded at all the update is still sent or
    /// queued, since the server holds the real flag. If the listing loads
    /// but has no such restaurant, nothing is sent.
    pub async fn post_favorite_restaurant(
        &self,
        update: FavoriteUpdate,
    ) -> Result<Delivery, DirectoryError> {
        let restaurant_id = update.restaurant_id;
        let local = self.local_writes.lock().await;
        let restaurants = match self.cached_restaurants().await {
            Some(restaurants) => Some(restaurants),
            None if self.connectivity.is_online() => match self.fetch_restaurants().await {
                Ok(restaurants) => Some(restaurants),
                Err(e) => {
                    debug!(error = %e, "Read-through failed before favorite update");
                    None
                }
            },
            None => None,
        };

        match restaurants {
            Some(mut restaurants) => {
                let restaurant = restaurants
                    .iter_mut()
                    .find(|r| r.id == restaurant_id)
                    .ok_or(DirectoryError::RestaurantNotFound { id: restaurant_id })?;
                restaurant.is_favorite = update.is_favorite;
                self.persist(Partition::Restaurants, RESTAURANTS_KEY, &restaurants)
                    .await;
            }
            None => {
                warn!(restaurant_id, "No restaurant listing available, favorite not stored locally");
            }
        }
        drop(local);

        if self.connectivity.is_online() {
            Ok(match self.gateway.set_favorite(update).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    warn!(restaurant_id, error = %e, "Failed to send favorite update");
                    Delivery::Failed(e.to_string())
                }
            })
        } else {
            info!(restaurant_id, "Offline, queueing favorite update");
            self.queues.favorites.enqueue(update);
            Ok(Delivery::Queued)
        }
    }

    // ===== Connectivity =====

    /// Forward everything in the offline queues now.
    pub async fn sync_pending(&self) -> SyncReport {
        self.queues.flush(self.gateway.as_ref()).await
    }

    /// Mark the directory offline. Later writes are queued.
    pub fn go_offline(&self) {
        self.connectivity.set_online(false);
    }

    /// Mark the directory online. On an actual offline-to-online transition
    /// the queues are drained and the report returned.
    pub async fn go_online(&self) -> Option<SyncReport> {
        if self.connectivity.set_online(true) {
            Some(self.sync_pending().await)
        } else {
            None
        }
    }

    /// Drain the queues after every offline-to-online transition, however
    /// the flag was changed. Transitions that pile up while a drain runs
    /// are handled by one more drain.
    pub fn spawn_reconnect_sync(&self) -> JoinHandle<()> {
        let directory = self.clone();
        let mut rx = self.connectivity.reconnects();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let reconnects = *rx.borrow_and_update();
                let report = directory.sync_pending().await;
                debug!(reconnects, ?report, "Reconnect sync finished");
            }
        })
    }

    pub async fn cache_status(&self) -> CacheStatus {
        let cached = match self
            .store
            .get_cached::<Vec<Restaurant>>(Partition::Restaurants, RESTAURANTS_KEY)
            .await
        {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Failed to load cache for status");
                None
            }
        };

        CacheStatus {
            store_available: self.store.is_available(),
            store_version: self.store.version().await,
            restaurant_count: cached.as_ref().map(|c| c.data.len()).unwrap_or(0),
            restaurants_age: cached.map(|c| c.age_display()),
            pending_reviews: self.queues.reviews.len(),
            pending_favorites: self.queues.favorites.len(),
            online: self.connectivity.is_online(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::filter::tests::{restaurant, sample};
    use super::*;
    use crate::api::GatewayError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory stand-in for the remote API that counts every call.
    #[derive(Default)]
    struct FakeGateway {
        restaurants: Mutex<Vec<Restaurant>>,
        reviews: Mutex<Vec<Review>>,
        restaurant_calls: AtomicUsize,
        review_calls: AtomicUsize,
        submitted: Mutex<Vec<Review>>,
        favorites: Mutex<Vec<FavoriteUpdate>>,
        failing: AtomicBool,
    }

    impl FakeGateway {
        fn with_restaurants(restaurants: Vec<Restaurant>) -> Arc<Self> {
            let gateway = Self::default();
            *gateway.restaurants.lock().unwrap() = restaurants;
            Arc::new(gateway)
        }

        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(GatewayError::from_status(500, "Internal Server Error"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, GatewayError> {
            self.restaurant_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.restaurants.lock().unwrap().clone())
        }

        async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, GatewayError> {
            self.review_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self
                .reviews
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.restaurant_id == restaurant_id)
                .cloned()
                .collect())
        }

        async fn submit_review(&self, review: &Review) -> Result<(), GatewayError> {
            self.submitted.lock().unwrap().push(review.clone());
            self.check()
        }

        async fn set_favorite(&self, update: FavoriteUpdate) -> Result<(), GatewayError> {
            self.favorites.lock().unwrap().push(update);
            self.check()
        }
    }

    async fn directory(gateway: Arc<FakeGateway>) -> (Directory, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(Some(dir.path())).await;
        let directory = Directory::new(store, gateway, Connectivity::new(true));
        (directory, dir)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;

        let first = directory.fetch_restaurants().await.expect("cold fetch");
        assert_eq!(first, sample());
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 1);

        let second = directory.fetch_restaurants().await.expect("warm fetch");
        assert_eq!(second, sample());
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_listing_survives_network_failure() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.fetch_restaurants().await.expect("cold fetch");

        gateway.fail(true);
        let cuisines = directory.fetch_cuisines().await.expect("served from store");
        assert_eq!(cuisines, vec!["Asian", "Pizza", "American"]);
    }

    #[tokio::test]
    async fn test_empty_store_refetches() {
        let gateway = FakeGateway::with_restaurants(Vec::new());
        let (directory, _dir) = directory(gateway.clone()).await;

        assert!(directory.fetch_restaurants().await.expect("fetch").is_empty());
        assert!(directory.fetch_restaurants().await.expect("fetch").is_empty());
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_network_failure_message() {
        let gateway = FakeGateway::with_restaurants(sample());
        gateway.fail(true);
        let (directory, _dir) = directory(gateway).await;

        let err = directory.fetch_restaurants().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request failed. Returned status of 500: Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_always_goes_to_network() {
        let gateway = FakeGateway::with_restaurants(sample());
        let directory = Directory::new(
            LocalStore::unavailable(),
            gateway.clone(),
            Connectivity::new(true),
        );

        directory.fetch_restaurants().await.expect("fetch");
        directory.fetch_restaurants().await.expect("fetch");
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_restaurant_by_id() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway).await;

        let found = directory.fetch_restaurant_by_id(3).await.expect("present");
        assert_eq!(found.id, 3);

        let err = directory.fetch_restaurant_by_id(99).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Restaurant does not exist");
    }

    #[tokio::test]
    async fn test_filtered_queries() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway).await;

        let all = directory
            .fetch_restaurant_by_cuisine_and_neighborhood(ALL, ALL)
            .await
            .expect("fetch");
        assert_eq!(all, sample());

        let pizza = directory
            .fetch_restaurant_by_cuisine_and_neighborhood("Pizza", ALL)
            .await
            .expect("fetch");
        assert_eq!(
            pizza,
            directory.fetch_restaurant_by_cuisine("Pizza").await.expect("fetch")
        );

        let brooklyn = directory
            .fetch_restaurant_by_neighborhood("Brooklyn")
            .await
            .expect("fetch");
        assert_eq!(brooklyn.len(), 2);

        let neighborhoods = directory.fetch_neighborhoods().await.expect("fetch");
        assert_eq!(neighborhoods, vec!["Manhattan", "Brooklyn", "Queens"]);
    }

    #[tokio::test]
    async fn test_reviews_cached_per_restaurant() {
        let gateway = FakeGateway::with_restaurants(sample());
        gateway
            .reviews
            .lock()
            .unwrap()
            .extend([Review::new(1, "A", 4, "one"), Review::new(2, "B", 2, "two")]);
        let (directory, _dir) = directory(gateway.clone()).await;

        let reviews = directory.fetch_reviews_by_restaurant_id(1).await.expect("fetch");
        assert_eq!(reviews.len(), 1);
        directory.fetch_reviews_by_restaurant_id(1).await.expect("fetch");
        assert_eq!(gateway.review_calls.load(Ordering::SeqCst), 1);

        directory.fetch_reviews_by_restaurant_id(2).await.expect("fetch");
        assert_eq!(gateway.review_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_review_online_is_stored_and_sent_once() {
        let gateway = FakeGateway::with_restaurants(sample());
        gateway
            .reviews
            .lock()
            .unwrap()
            .push(Review::new(1, "A", 4, "existing"));
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.fetch_reviews_by_restaurant_id(1).await.expect("fetch");

        let delivery = directory
            .post_new_review(Review::new(1, "Kim", 5, "Loved it"))
            .await
            .expect("post");
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(gateway.submitted.lock().unwrap().len(), 1);
        assert!(directory.queues().reviews.is_empty());

        let stored = directory.fetch_reviews_by_restaurant_id(1).await.expect("fetch");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].comments, "Loved it");
    }

    #[tokio::test]
    async fn test_review_offline_is_queued_then_sent_on_reconnect() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();

        let delivery = directory
            .post_new_review(Review::new(2, "Kim", 3, "Offline thoughts"))
            .await
            .expect("post");
        assert_eq!(delivery, Delivery::Queued);
        assert!(gateway.submitted.lock().unwrap().is_empty());
        assert_eq!(directory.queues().reviews.len(), 1);

        // Stored locally even though nothing was cached before
        let stored = directory.fetch_reviews_by_restaurant_id(2).await.expect("fetch");
        assert_eq!(stored.len(), 1);
        assert_eq!(gateway.review_calls.load(Ordering::SeqCst), 0);

        let report = directory.go_online().await.expect("transition");
        assert_eq!(report.reviews.forwarded, 1);
        assert_eq!(gateway.submitted.lock().unwrap().len(), 1);
        assert!(directory.queues().reviews.is_empty());

        // Already online: no second drain
        assert!(directory.go_online().await.is_none());
        assert_eq!(gateway.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_queue_cleared_when_flush_fails() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();
        directory
            .post_new_review(Review::new(2, "Kim", 3, "Lost in transit"))
            .await
            .expect("post");

        gateway.fail(true);
        let report = directory.go_online().await.expect("transition");
        assert_eq!(report.reviews.failed, 1);
        assert!(directory.queues().reviews.is_empty());
        assert_eq!(gateway.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_review_reads_through_instead_of_dropping() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;

        let delivery = directory
            .post_new_review(Review::new(4, "Kim", 4, "First!"))
            .await
            .expect("post");
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(gateway.review_calls.load(Ordering::SeqCst), 1);

        let stored: Option<Vec<Review>> = directory
            .store()
            .get(Partition::Reviews, "4")
            .await
            .expect("get");
        assert_eq!(stored.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn test_review_send_failure_is_reported() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        gateway.fail(true);

        let delivery = directory
            .post_new_review(Review::new(1, "Kim", 4, "Server down"))
            .await
            .expect("post");
        assert!(matches!(delivery, Delivery::Failed(_)));
        assert!(directory.queues().reviews.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_review_rejected() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;

        let err = directory
            .post_new_review(Review::new(1, "", 4, "No name"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidReview(_)));
        assert!(gateway.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorite_online_updates_store_and_sends() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.fetch_restaurants().await.expect("fetch");

        let delivery = directory
            .post_favorite_restaurant(FavoriteUpdate::new(2, true))
            .await
            .expect("favorite");
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(
            *gateway.favorites.lock().unwrap(),
            vec![FavoriteUpdate::new(2, true)]
        );

        let restaurant = directory.fetch_restaurant_by_id(2).await.expect("present");
        assert!(restaurant.is_favorite);
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_favorite_offline_is_queued() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.fetch_restaurants().await.expect("fetch");
        directory.go_offline();

        let delivery = directory
            .post_favorite_restaurant(FavoriteUpdate::new(5, true))
            .await
            .expect("favorite");
        assert_eq!(delivery, Delivery::Queued);
        assert!(gateway.favorites.lock().unwrap().is_empty());

        let report = directory.go_online().await.expect("transition");
        assert_eq!(report.favorites.forwarded, 1);
        assert!(directory.queues().favorites.is_empty());
    }

    #[tokio::test]
    async fn test_favorite_for_unknown_restaurant() {
        let gateway = FakeGateway::with_restaurants(vec![restaurant(1, "Queens", "Thai")]);
        let (directory, _dir) = directory(gateway.clone()).await;

        let err = directory
            .post_favorite_restaurant(FavoriteUpdate::new(77, true))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(gateway.favorites.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorite_without_listing_still_queued() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();

        let delivery = directory
            .post_favorite_restaurant(FavoriteUpdate::new(3, false))
            .await
            .expect("favorite");
        assert_eq!(delivery, Delivery::Queued);
        assert_eq!(gateway.restaurant_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reconnect_task_drains_queue() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();
        let handle = directory.spawn_reconnect_sync();

        directory
            .post_favorite_restaurant(FavoriteUpdate::new(1, true))
            .await
            .expect("favorite");
        directory.connectivity().set_online(true);

        for _ in 0..50 {
            if directory.queues().favorites.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(directory.queues().favorites.is_empty());
        assert_eq!(gateway.favorites.lock().unwrap().len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_reconnect_task_drains_after_brief_online_flap() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();
        let handle = directory.spawn_reconnect_sync();

        directory
            .post_favorite_restaurant(FavoriteUpdate::new(2, true))
            .await
            .expect("favorite");
        directory.connectivity().set_online(true);
        directory.connectivity().set_online(false);

        for _ in 0..50 {
            if directory.queues().favorites.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(directory.queues().favorites.is_empty());
        assert_eq!(
            *gateway.favorites.lock().unwrap(),
            vec![FavoriteUpdate::new(2, true)]
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_posted_review_reads_back_equal() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();

        let review = Review::new(3, "Kim", 5, "Best slice in Brooklyn");
        directory
            .post_new_review(review.clone())
            .await
            .expect("post");

        let stored = directory.fetch_reviews_by_restaurant_id(3).await.expect("fetch");
        assert_eq!(stored, vec![review.clone()]);
        assert_eq!(directory.queues().reviews.drain_all(), vec![review]);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_for_same_restaurant_are_all_kept() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway.clone()).await;
        directory.go_offline();
        let other = directory.clone();

        let (first, second) = tokio::join!(
            directory.post_new_review(Review::new(1, "A", 4, "first")),
            other.post_new_review(Review::new(1, "B", 3, "second")),
        );
        assert_eq!(first.expect("first post"), Delivery::Queued);
        assert_eq!(second.expect("second post"), Delivery::Queued);

        let stored = directory.fetch_reviews_by_restaurant_id(1).await.expect("fetch");
        let mut comments: Vec<&str> = stored.iter().map(|r| r.comments.as_str()).collect();
        comments.sort();
        assert_eq!(comments, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_cache_status() {
        let gateway = FakeGateway::with_restaurants(sample());
        let (directory, _dir) = directory(gateway).await;
        directory.fetch_restaurants().await.expect("fetch");
        directory.go_offline();
        directory
            .post_new_review(Review::new(1, "Kim", 4, "queued"))
            .await
            .expect("post");

        let status = directory.cache_status().await;
        assert!(status.store_available);
        assert_eq!(status.store_version, Some(2));
        assert_eq!(status.restaurant_count, 5);
        assert_eq!(status.restaurants_age.as_deref(), Some("just now"));
        assert_eq!(status.pending_reviews, 1);
        assert!(!status.online);
    }
}
