//! REST API definitions.

pub mod auth;
pub mod user;

use axum::{
    routing::{get, post, put},
    Router,
};

pub use self::user::User;

/// Composes a [`Router`] serving the API endpoints.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/updatedetails", put(auth::update_details))
        .route("/api/auth/updatepassword", put(auth::update_password))
}
