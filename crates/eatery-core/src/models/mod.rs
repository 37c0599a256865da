//! Data models for directory entities.
//!
//! This module contains the data structures shared by the local store,
//! the network gateway and the offline queues:
//!
//! - `Restaurant`, `LatLng`, `OperatingHours`: the directory listing
//! - `Review`: a single user review of a restaurant
//! - `FavoriteUpdate`: the favorite-toggle payload

pub mod restaurant;
pub mod review;

pub use restaurant::{FavoriteUpdate, LatLng, OperatingHours, Restaurant};
pub use review::{Review, MAX_RATING, MIN_RATING};
