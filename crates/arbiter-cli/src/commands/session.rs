use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use arbiter_config::{ArbiterConfig, ConfigLoader, StoreBackend};
use arbiter_engine::{DecisionEngine, NotificationDispatcher, TracingNotifier};
use arbiter_store::{MemoryStore, SqliteStore};

/// An initialized engine plus the background tasks serving it for one command.
pub(super) struct Session {
    pub(super) engine: DecisionEngine,
    dispatcher: Option<JoinHandle<()>>,
}

impl Session {
    pub(super) fn open(loader: &ConfigLoader, config: &ArbiterConfig) -> arbiter_core::Result<Self> {
        let engine = match config.store.backend {
            StoreBackend::Sqlite => {
                let path = loader.db_path();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let store = Arc::new(SqliteStore::open(&path)?);
                DecisionEngine::new(&config.engine, store.clone(), store)
            }
            StoreBackend::Memory => {
                warn!("memory store selected: policy and audit log end with this process");
                let store = Arc::new(MemoryStore::new());
                DecisionEngine::new(&config.engine, store.clone(), store)
            }
        };
        engine.initialize()?;
        engine.start_background_tasks();

        let dispatcher = if config.notifications.enabled {
            let mut dispatcher = NotificationDispatcher::new(config.notifications.channels.clone());
            dispatcher.add_notifier(Arc::new(TracingNotifier));
            Some(dispatcher.spawn(engine.event_bus()))
        } else {
            debug!("approval notifications disabled");
            None
        };

        Ok(Self { engine, dispatcher })
    }

    /// Flush pending audit writes and let in-flight notifications finish.
    pub(super) async fn close(self) {
        self.engine.shutdown().await;
        if let Some(handle) = self.dispatcher {
            if let Err(e) = handle.await {
                warn!(error = %e, "notification dispatcher failed");
            }
        }
    }
}
