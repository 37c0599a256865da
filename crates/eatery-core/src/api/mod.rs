//! HTTP gateway to the remote restaurant API.
//!
//! This module provides the `Gateway` trait used by the directory, the
//! `HttpGateway` that implements it over HTTP, and the `Transport` seam
//! that performs the actual request/response exchange. Requests can go
//! straight to the network (`ReqwestTransport`) or through the edge cache.
//!
//! Endpoints:
//! - `GET /restaurants`
//! - `GET /reviews?restaurant_id=<id>`
//! - `POST /reviews`
//! - `PUT /restaurants/<id>?is_favorite=<bool>`

pub mod client;
pub mod error;
pub mod transport;

pub use client::{Gateway, HttpGateway, DEFAULT_API_BASE_URL};
pub use error::{GatewayError, TransportError};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
