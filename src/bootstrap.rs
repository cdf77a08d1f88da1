//! Bootstrap Sequencer
//!
//! Wires a running system together in the one order that cannot lose
//! messages: build the backend, create the port pair, attach and spawn the
//! bridge, and only then hand the runtime handle out. Commands issued
//! through the returned handle are therefore always observed by the bridge.

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bridge::StorageBridge;
use crate::config::{Backend, Config, LoggingConfig};
use crate::runtime::{self, UiRuntime};
use crate::store::{FileStore, MemoryStore, StoreBackend, StoreError};

/// Errors that can occur while bringing the system up
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Store initialization failed: {0}")]
    Store(#[from] StoreError),
}

/// A running bridge plus the runtime handle attached to it
pub struct System {
    /// The UI runtime's port handle
    pub runtime: UiRuntime,
    bridge: JoinHandle<()>,
}

impl System {
    /// Start the bridge against the backend selected by `config`
    ///
    /// Must be called from within a tokio runtime. The bridge task holds
    /// the port receivers before this returns, so no command issued through
    /// [`System::runtime`] can be lost.
    pub fn start(config: &Config) -> Result<Self, BootstrapError> {
        let store = build_store(config)?;
        let (runtime, ports) = runtime::channel();

        let mut bridge = StorageBridge::new(store, ports);
        if !config.bridge.notifications {
            bridge = bridge.without_notifications();
        }
        let bridge = bridge.spawn();

        tracing::info!(
            backend = ?config.store.backend,
            namespace = %config.store.namespace,
            "Storage bridge attached"
        );

        Ok(Self { runtime, bridge })
    }

    /// Detach the runtime and wait for the bridge to drain and stop
    pub async fn shutdown(self) {
        let Self { runtime, bridge } = self;
        drop(runtime);

        if let Err(e) = bridge.await {
            tracing::error!(error = %e, "Bridge task failed during shutdown");
        } else {
            tracing::info!("Storage bridge stopped");
        }
    }
}

fn build_store(config: &Config) -> Result<Box<dyn StoreBackend>, StoreError> {
    let store = &config.store;

    match store.backend {
        Backend::Memory => {
            let mut backend = MemoryStore::new(store.namespace.as_str());
            if let Some(quota) = store.quota_bytes {
                backend = backend.with_quota(quota);
            }
            Ok(Box::new(backend))
        }
        Backend::File => {
            let mut backend = FileStore::new(&store.data_dir, &store.namespace)?;
            if let Some(quota) = store.quota_bytes {
                backend = backend.with_quota(quota);
            }
            Ok(Box::new(backend))
        }
    }
}

/// Initialize tracing from the logging configuration
///
/// `RUST_LOG` overrides the configured level. Safe to call more than once;
/// later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("portstore={}", config.level)),
    );

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        let _ = registry.with(tracing_subscriber::fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(tracing_subscriber::fmt::layer()).try_init();
    }
}
