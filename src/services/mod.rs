// src/services/mod.rs
//
// Shared services used by the auth and posts modules

pub mod identity_provider;
pub mod microsoft;
pub mod users;

// Re-export commonly used types for convenience
pub use microsoft::MicrosoftService;
pub use users::UserService;
