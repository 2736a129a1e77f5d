//! # Auth Module
//!
//! Federated sign-in through Microsoft and the locally issued credential:
//! - anti-forgery state and the authorization-code callback
//! - JWT minting and verification (`credentials`)
//! - the access gate (`require_auth` layer and `AuthedUser` extractor)

pub mod cookies;
pub mod credentials;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;


pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
