//! # Portstore
//!
//! Port-based storage bridge: ordered, asynchronous message passing between
//! a UI runtime and a host-provided key/value store.
//!
//! The UI runtime cannot perform side effects itself. It enqueues command
//! messages (`get`, `set`, `remove`, `clear`, `listKeys`) on an outbound
//! port; the bridge processes them strictly in order against a storage
//! backend and answers each with exactly one response on the inbound port.
//! Backends that observe external changes (another tab writing the same
//! namespace) additionally surface notification-tagged responses.
//!
//! ## Modules
//!
//! - [`bridge`]: message schema, dispatcher, and the bridge event loop
//! - [`store`]: storage backends behind a narrow adapter trait
//! - [`runtime`]: explicit port objects and the owned runtime handle
//! - [`bootstrap`]: attach-before-first-command startup sequencing
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portstore::{Command, Config, System};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     portstore::init_logging(&config.logging);
//!
//!     // The bridge is attached before the runtime handle exists, so no
//!     // command can be lost.
//!     let mut system = System::start(&config)?;
//!
//!     system.runtime.issue(&Command::Set {
//!         key: "draft".into(),
//!         value: json!({ "title": "hello" }),
//!     })?;
//!     system.runtime.issue(&Command::Get { key: "draft".into() })?;
//!
//!     let ack = system.runtime.next_reply().await;
//!     let draft = system.runtime.next_reply().await;
//!     println!("{ack:?} {draft:?}");
//!
//!     system.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod runtime;
pub mod store;

// Re-export top-level types for convenience
pub use bridge::{Command, Dispatcher, ErrorBody, ErrorKind, Response, StorageBridge};

pub use store::{
    decode_value, encode_value, FileStore, MemoryStore, StoreBackend, StoreChange, StoreError,
    StoreResult,
};

pub use runtime::{channel, BridgePorts, PortClosed, UiRuntime};

pub use bootstrap::{init_logging, BootstrapError, System};

pub use config::{
    generate_default_config, Backend, BridgeConfig, Config, ConfigError, LoggingConfig,
    StoreConfig,
};
