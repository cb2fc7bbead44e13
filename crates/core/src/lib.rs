//! Core business logic for agora-rs.

pub mod services;

pub use services::*;
