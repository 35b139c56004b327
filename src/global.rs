use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{instance::InstanceHandle, models::Config};

/// Shared state of the running daemon
#[derive(Clone)]
pub struct Global(Arc<RwLock<GlobalData>>);

impl Global {
    pub async fn read_config<T>(&self, f: impl FnOnce(&Config) -> T) -> T {
        let data = self.0.read().await;
        f(&data.config)
    }

    /// Handle to the LED controller
    pub async fn instance(&self) -> InstanceHandle {
        self.0.read().await.instance.clone()
    }
}

pub struct GlobalData {
    config: Config,
    instance: InstanceHandle,
}

impl GlobalData {
    pub fn new(config: &Config, instance: InstanceHandle) -> Self {
        Self {
            config: config.clone(),
            instance,
        }
    }

    pub fn wrap(self) -> Global {
        Global(Arc::new(RwLock::new(self)))
    }
}
