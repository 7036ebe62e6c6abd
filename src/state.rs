use crate::config::Config;
use crate::store::ActivityStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ActivityStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ActivityStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
