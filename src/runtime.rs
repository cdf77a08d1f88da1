//! Runtime Ports
//!
//! Explicit channel objects connecting the UI runtime to the storage
//! bridge. The runtime side and the bridge side are created together by
//! [`channel`] and owned by their holders; nothing is registered through
//! ambient or global state.
//!
//! Each port is an ordered queue: messages are delivered in send order with
//! no reordering and no drops while both halves are alive. Commands travel
//! as raw JSON in the wire shape `{ operation, key?, value? }` so the
//! bridge, not the channel, decides whether a message is well-formed.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bridge::messages::{Command, Response};

/// The port's peer has detached and the message cannot be delivered
#[derive(Debug, Error)]
#[error("Port closed: storage bridge detached")]
pub struct PortClosed;

/// Create the outbound/inbound port pair
///
/// Returns the runtime-side handle and the bridge-side handle. The bridge
/// must be attached (constructed from [`BridgePorts`]) before the runtime
/// emits its first command; the bootstrap sequencer guarantees that
/// ordering.
pub fn channel() -> (UiRuntime, BridgePorts) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();

    (
        UiRuntime {
            commands: command_tx,
            replies: reply_rx,
        },
        BridgePorts {
            commands: command_rx,
            replies: reply_tx,
        },
    )
}

/// The UI runtime's half of the port pair
///
/// An explicitly owned handle: the application constructs it once at
/// startup and passes it by reference wherever commands are issued.
pub struct UiRuntime {
    commands: mpsc::UnboundedSender<Value>,
    replies: mpsc::UnboundedReceiver<Response>,
}

impl UiRuntime {
    /// Enqueue a typed command on the outbound port
    pub fn issue(&self, command: &Command) -> Result<(), PortClosed> {
        self.issue_raw(command.to_wire())
    }

    /// Enqueue a wire-shaped message on the outbound port
    ///
    /// The bridge answers malformed messages with a `MalformedCommand`
    /// error response rather than dropping them.
    pub fn issue_raw(&self, message: Value) -> Result<(), PortClosed> {
        self.commands.send(message).map_err(|_| PortClosed)
    }

    /// Await the next message on the inbound port
    ///
    /// Returns `None` once the bridge has detached and all queued replies
    /// have been consumed.
    pub async fn next_reply(&mut self) -> Option<Response> {
        self.replies.recv().await
    }

    /// Take the next inbound message without waiting, if one is queued
    pub fn try_reply(&mut self) -> Option<Response> {
        self.replies.try_recv().ok()
    }
}

/// The bridge's half of the port pair, consumed by the bridge constructor
pub struct BridgePorts {
    pub(crate) commands: mpsc::UnboundedReceiver<Value>,
    pub(crate) replies: mpsc::UnboundedSender<Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_commands_arrive_in_issue_order() {
        let (ui, mut ports) = channel();

        ui.issue(&Command::Set { key: "a".into(), value: json!(1) }).unwrap();
        ui.issue(&Command::Get { key: "a".into() }).unwrap();

        let first = ports.commands.recv().await.unwrap();
        let second = ports.commands.recv().await.unwrap();
        assert_eq!(first["operation"], "set");
        assert_eq!(second["operation"], "get");
    }

    #[tokio::test]
    async fn test_issue_after_bridge_detached_reports_closed_port() {
        let (ui, ports) = channel();
        drop(ports);

        let err = ui.issue(&Command::Clear);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_try_reply_is_non_blocking() {
        let (mut ui, ports) = channel();

        assert!(ui.try_reply().is_none());

        ports.replies.send(Response::ok("clear", None)).unwrap();
        assert_eq!(ui.try_reply().unwrap().operation, "clear");
    }
}
