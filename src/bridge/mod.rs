//! Storage Bridge
//!
//! The bridge owns the storage side of the port pair: it consumes command
//! messages from the outbound port one at a time, runs each against the
//! backend through the dispatcher, and enqueues exactly one response per
//! command on the inbound port, in command order.
//!
//! - **messages**: wire schema and validation
//! - **dispatcher**: command -> storage-operation routing
//!
//! Processing is cooperative and strictly FIFO: a command is fully handled
//! (including its synchronous store access) before the next queued command
//! begins, so a `set` followed by a `get` on the same key always observes
//! the write. External store changes, when the backend surfaces them, are
//! forwarded as notification-tagged responses that interleave with command
//! responses without reordering them.

pub mod dispatcher;
pub mod messages;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use dispatcher::Dispatcher;
pub use messages::{Command, ErrorBody, ErrorKind, Response};

use crate::runtime::BridgePorts;
use crate::store::{decode_value, StoreBackend, StoreChange};

/// Bridges a UI runtime's ports to a storage backend
pub struct StorageBridge<S: StoreBackend> {
    dispatcher: Dispatcher<S>,
    ports: BridgePorts,
    changes: Option<broadcast::Receiver<StoreChange>>,
}

impl<S: StoreBackend> StorageBridge<S> {
    /// Attach a backend to the bridge-side port handles
    ///
    /// Attachment is construction: the ports are moved in, so commands
    /// queued by the runtime afterwards cannot be lost.
    pub fn new(store: S, ports: BridgePorts) -> Self {
        let changes = store.watch();

        Self {
            dispatcher: Dispatcher::new(store),
            ports,
            changes,
        }
    }

    /// Disable forwarding of external change notifications
    pub fn without_notifications(mut self) -> Self {
        self.changes = None;
        self
    }

    /// Process messages until the command port closes
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                // Commands take priority so responses stay in command order
                biased;

                maybe = self.ports.commands.recv() => {
                    let Some(raw) = maybe else {
                        tracing::debug!("Command port closed, bridge stopping");
                        break;
                    };

                    let response = self.dispatcher.execute(&raw);
                    if self.ports.replies.send(response).is_err() {
                        tracing::debug!("Reply port closed, bridge stopping");
                        break;
                    }
                }

                event = next_change(self.changes.as_mut()) => {
                    match event {
                        Ok(change) => {
                            if self.ports.replies.send(notification(change)).is_err() {
                                tracing::debug!("Reply port closed, bridge stopping");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "Change notifications lagged, some were dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            self.changes = None;
                        }
                    }
                }
            }
        }
    }

    /// Run the bridge on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Await the next external change, parking forever when the backend has no
/// watch channel
async fn next_change(
    changes: Option<&mut broadcast::Receiver<StoreChange>>,
) -> Result<StoreChange, broadcast::error::RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Render an external store change as a notification-tagged response
fn notification(change: StoreChange) -> Response {
    match change {
        StoreChange::Write { key, bytes } => {
            let value = decode_value(&bytes).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Undecodable external write");
                Value::Null
            });
            Response::change_notification("set", Some(&key), value)
        }
        StoreChange::Remove { key } => {
            Response::change_notification("remove", Some(&key), Value::Null)
        }
        StoreChange::Clear => Response::change_notification("clear", None, Value::Null),
    }
}
