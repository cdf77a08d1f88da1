//! Command Dispatcher
//!
//! Routes one decoded command at a time to the matching storage operation
//! and turns the outcome into exactly one response. Commands are processed
//! independently: a failure never short-circuits later queued commands, and
//! nothing is retried.

use serde_json::Value;

use super::messages::{Command, ErrorKind, Response};
use crate::store::error::StoreError;
use crate::store::{decode_value, encode_value, StoreBackend};

/// Executes commands against a storage backend
pub struct Dispatcher<S: StoreBackend> {
    store: S,
}

impl<S: StoreBackend> Dispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Process one wire message, always producing exactly one response
    ///
    /// Malformed messages are answered immediately without touching the
    /// store.
    pub fn execute(&self, raw: &Value) -> Response {
        let command = match Command::decode(raw) {
            Ok(command) => command,
            Err(response) => {
                tracing::debug!(message = %raw, "Malformed command");
                return response;
            }
        };

        let response = self.run(&command);
        if response.is_failure() {
            tracing::warn!(
                operation = command.operation(),
                key = ?command.key(),
                error = ?response.error,
                "Storage operation failed"
            );
        } else {
            tracing::trace!(
                operation = command.operation(),
                key = ?command.key(),
                "Storage operation completed"
            );
        }

        response
    }

    fn run(&self, command: &Command) -> Response {
        let outcome = match command {
            Command::Get { key } => self.get(key),
            Command::Set { key, value } => self.set(key, value),
            Command::Remove { key } => self
                .store
                .delete(key)
                .map(|()| Response::ok("remove", Some(key.as_str()))),
            Command::Clear => self.store.delete_all().map(|()| Response::ok("clear", None)),
            Command::ListKeys => self.list_keys(),
        };

        outcome.unwrap_or_else(|err| {
            Response::failure(
                command.operation(),
                command.key(),
                ErrorKind::from(&err),
                err.to_string(),
            )
        })
    }

    fn get(&self, key: &str) -> Result<Response, StoreError> {
        // Absence is a normal outcome, not a failure
        match self.store.read(key)? {
            Some(bytes) => Ok(Response::success("get", Some(key), decode_value(&bytes)?)),
            None => Ok(Response::not_found(key)),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<Response, StoreError> {
        let bytes = encode_value(value)?;
        self.store.write(key, &bytes)?;
        Ok(Response::ok("set", Some(key)))
    }

    fn list_keys(&self) -> Result<Response, StoreError> {
        let keys = self.store.keys()?;
        Ok(Response::success("listKeys", None, Value::from(keys)))
    }
}
