//! Shared building blocks for the metadata browser services.
//!
//! - `config`: startup configuration read from the environment
//! - `errors`: the service error taxonomy and its HTTP rendering
//! - `response`: the generic error envelope returned to clients
//! - `middleware`: request-scoped middleware (request IDs)
//! - `models`: response models shared across services
//! - `utils`: SQL identifier helpers

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
