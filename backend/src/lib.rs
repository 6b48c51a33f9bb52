use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod products;
pub mod stats;
pub mod store;
pub mod users;
pub mod weather;

use config::AppConfig;
use store::Storage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/featured", get(products::featured))
        .route("/api/products/latest", get(products::latest))
        .route(
            "/api/products/:id",
            get(products::detail)
                .put(products::update)
                .delete(products::remove),
        )
        .route("/api/messages", get(messages::list).post(messages::create))
        .route(
            "/api/messages/conversation/:user_id",
            get(messages::conversation),
        )
        .route("/api/messages/:id/read", put(messages::mark_read))
        .route("/api/stats", get(stats::stats))
        .route("/api/users/trusted-sellers", get(users::trusted_sellers))
        .route("/api/weather", get(weather::weather))
        .with_state(state)
}
