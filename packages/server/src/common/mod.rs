// Common types and utilities shared across the application

pub mod secret;
pub mod utils;

pub use secret::SecretString;
