//! Application state for metadata service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::repository::MetadataRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repository: Arc<dyn MetadataRepository>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, repository: Arc<dyn MetadataRepository>) -> Self {
        Self { config, repository }
    }
}
