//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::convert::JobRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                jobs: JobRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.inner.jobs
    }
}
