//! Shared data models for the services.

pub mod metadata;

// Re-export commonly used types
pub use metadata::TablePreview;
