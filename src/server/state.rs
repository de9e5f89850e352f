use std::sync::Arc;

use crate::config::Settings;
use crate::relay::Relay;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            relay: Arc::new(Relay::new(settings.relay_config())),
        }
    }
}
