//! Pure queries over a restaurant listing.

use crate::models::Restaurant;
use crate::utils::distinct;

/// Filter value meaning "do not filter on this field".
pub const ALL: &str = "all";

pub fn find_by_id(restaurants: &[Restaurant], id: i64) -> Option<&Restaurant> {
    restaurants.iter().find(|r| r.id == id)
}

pub fn by_cuisine(restaurants: &[Restaurant], cuisine: &str) -> Vec<Restaurant> {
    restaurants
        .iter()
        .filter(|r| r.cuisine_type == cuisine)
        .cloned()
        .collect()
}

pub fn by_neighborhood(restaurants: &[Restaurant], neighborhood: &str) -> Vec<Restaurant> {
    restaurants
        .iter()
        .filter(|r| r.neighborhood == neighborhood)
        .cloned()
        .collect()
}

/// Filter on both fields; `ALL` disables either filter.
pub fn by_cuisine_and_neighborhood(
    restaurants: &[Restaurant],
    cuisine: &str,
    neighborhood: &str,
) -> Vec<Restaurant> {
    restaurants
        .iter()
        .filter(|r| cuisine == ALL || r.cuisine_type == cuisine)
        .filter(|r| neighborhood == ALL || r.neighborhood == neighborhood)
        .cloned()
        .collect()
}

pub fn neighborhoods(restaurants: &[Restaurant]) -> Vec<String> {
    distinct(restaurants.iter().map(|r| r.neighborhood.clone()))
}

pub fn cuisines(restaurants: &[Restaurant]) -> Vec<String> {
    distinct(restaurants.iter().map(|r| r.cuisine_type.clone()))
}
