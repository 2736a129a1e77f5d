//! # Posts Module
//!
//! Per-user posts behind the access gate. Every operation is scoped to the
//! bound identity; another user's post behaves as if it did not exist.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::posts_routes;
