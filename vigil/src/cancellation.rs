//! Named cancellable operations scoped to an owner's lifetime.
//!
//! Each name maps to at most one live [`CancellationToken`]. Asking for a
//! name that is already registered hands back the existing token. An entry
//! leaves the registry only through [`CancellationRegistry::cancel`],
//! [`CancellationRegistry::cancel_all`] or an explicit
//! [`CancellationRegistry::purge_cancelled`]; a timeout cancels the token
//! but keeps the entry.
//!
//! # Example
//!
//! ```
//! use vigil::cancellation::{CancellationRegistry, OperationStatus};
//!
//! let registry = CancellationRegistry::new();
//! let token = registry.get_or_create_token("load", None).unwrap();
//! assert_eq!(registry.status("load"), Some(OperationStatus::Active));
//!
//! registry.cancel("load");
//! assert!(token.is_cancelled());
//! assert!(!registry.contains("load"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, VigilError};

/// Observable state of a registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The token has not been cancelled.
    Active,
    /// The token was cancelled by someone holding it.
    Cancelled,
    /// The operation's timeout elapsed and cancelled the token.
    TimedOut,
}

#[derive(Debug)]
struct Operation {
    token: CancellationToken,
    timed_out: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl Operation {
    fn status(&self) -> OperationStatus {
        if self.timed_out.load(Ordering::SeqCst) {
            OperationStatus::TimedOut
        } else if self.token.is_cancelled() {
            OperationStatus::Cancelled
        } else {
            OperationStatus::Active
        }
    }

    /// Signal cancellation and stop the timeout timer.
    fn shutdown(&self) {
        self.token.cancel();
        if let Some(timer) = &self.timer {
            timer.abort();
        }
    }
}

/// Registry of named cancellation tokens.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    operations: DashMap<String, Operation>,
}

impl CancellationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token registered under `name`, creating it if needed.
    ///
    /// An existing token is returned as-is; its deadline is not touched. A
    /// new token with a `timeout` is cancelled automatically once the
    /// duration elapses, which requires a running tokio runtime.
    pub fn get_or_create_token(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<CancellationToken> {
        match self.operations.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().token.clone()),
            Entry::Vacant(entry) => {
                let token = CancellationToken::new();
                let timed_out = Arc::new(AtomicBool::new(false));
                let timer = match timeout {
                    Some(after) => Some(spawn_timeout(
                        name,
                        after,
                        token.clone(),
                        Arc::clone(&timed_out),
                    )?),
                    None => None,
                };
                log::debug!("Registered cancellable operation '{}'", name);
                entry.insert(Operation {
                    token: token.clone(),
                    timed_out,
                    timer,
                });
                Ok(token)
            }
        }
    }

    /// Cancel and remove the operation registered under `name`.
    ///
    /// Unknown names are ignored. Returns whether an entry was removed.
    pub fn cancel(&self, name: &str) -> bool {
        match self.operations.remove(name) {
            Some((_, operation)) => {
                operation.shutdown();
                log::debug!("Cancelled operation '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Cancel and remove every registered operation.
    ///
    /// Returns how many entries were removed.
    pub fn cancel_all(&self) -> usize {
        self.names()
            .into_iter()
            .filter(|name| self.cancel(name))
            .count()
    }

    /// Cancel every operation and wait until their timers have stopped.
    pub async fn cancel_all_async(&self) {
        let pending = self.names().into_iter().map(|name| self.cancel_and_wait(name));
        join_all(pending).await;
    }

    async fn cancel_and_wait(&self, name: String) {
        let Some((_, operation)) = self.operations.remove(&name) else {
            return;
        };
        operation.shutdown();
        if let Some(timer) = operation.timer {
            // An aborted timer resolves to a cancelled JoinError.
            let _ = timer.await;
        }
        log::debug!("Cancelled operation '{}'", name);
    }

    /// State of the operation registered under `name`.
    pub fn status(&self, name: &str) -> Option<OperationStatus> {
        self.operations.get(name).map(|operation| operation.status())
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Names of every registered operation, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of registered operations, cancelled ones included.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop entries whose token is already cancelled (e.g. timed out).
    ///
    /// Returns how many entries were removed.
    pub fn purge_cancelled(&self) -> usize {
        let mut removed = 0;
        self.operations.retain(|_, operation| {
            if operation.token.is_cancelled() {
                operation.shutdown();
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

fn spawn_timeout(
    name: &str,
    after: Duration,
    token: CancellationToken,
    timed_out: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = Handle::try_current()
        .map_err(|_| VigilError::NoRuntime("schedule an operation timeout"))?;
    let name = name.to_string();
    Ok(handle.spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(after) => {
                timed_out.store(true, Ordering::SeqCst);
                token.cancel();
                log::debug!("Operation '{}' timed out after {:?}", name, after);
            }
            _ = token.cancelled() => {}
        }
    }))
}
