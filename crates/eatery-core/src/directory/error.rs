use thiserror::Error;

use crate::api::GatewayError;

/// Errors reported by directory reads and writes.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Request failed. Returned status of {0}")]
    Request(#[from] GatewayError),

    #[error("Restaurant does not exist")]
    RestaurantNotFound { id: i64 },

    #[error("Invalid review: {0}")]
    InvalidReview(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::RestaurantNotFound { .. })
    }
}
