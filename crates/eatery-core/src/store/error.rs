use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {partition}/{key}: {source}")]
    Io {
        partition: &'static str,
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode {partition}/{key}: {source}")]
    Decode {
        partition: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {partition}/{key}: {source}")]
    Encode {
        partition: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
