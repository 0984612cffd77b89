//! Product catalog write API (admin)

mod handler;

use axum::{Router, routing::put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/products/{id}", put(handler::upsert))
}
