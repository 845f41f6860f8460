// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::services::{Corrector, GradingWorkflow, Lifecycle, ObjectStorage};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub lifecycle: Arc<Lifecycle>,
}

impl AppState {
    /// Wires the services over the given collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        corrector: Arc<dyn Corrector>,
    ) -> Self {
        let grading = GradingWorkflow::new(store.clone(), corrector, config.corrector_timeout);
        let lifecycle = Lifecycle::new(store.clone(), storage, grading);

        Self {
            config,
            store,
            lifecycle: Arc::new(lifecycle),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<Lifecycle> {
    fn from_ref(state: &AppState) -> Self {
        state.lifecycle.clone()
    }
}
