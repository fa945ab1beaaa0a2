//! Change notifications delivered on the affinity context.
//!
//! Validation may finish on any thread. Observers never see that: every
//! callback registered here runs through the notifier's
//! [`AffinityExecutor`], inline when the notifying thread already has
//! affinity and queued otherwise.

mod executor;

pub use executor::{AffinityExecutor, AffinityQueue, ChannelExecutor, InlineExecutor, Job, channel};

use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

/// Callback receiving the name of the field or property that changed.
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Subscribers = RwLock<Vec<(SubscriptionId, ChangeHandler)>>;

/// Dispatches `errors changed` and `property changed` events to subscribers.
pub struct ChangeNotifier {
    executor: Arc<dyn AffinityExecutor>,
    error_handlers: Subscribers,
    property_handlers: Subscribers,
}

impl ChangeNotifier {
    /// Create a notifier delivering through `executor`.
    pub fn new(executor: Arc<dyn AffinityExecutor>) -> Self {
        Self {
            executor,
            error_handlers: RwLock::new(Vec::new()),
            property_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Create a notifier that always delivers inline.
    pub fn inline() -> Self {
        Self::new(Arc::new(InlineExecutor))
    }

    /// The executor events are delivered through.
    pub fn executor(&self) -> &Arc<dyn AffinityExecutor> {
        &self.executor
    }

    /// Subscribe to per-field error changes.
    pub fn subscribe_errors<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        subscribe(&self.error_handlers, Arc::new(handler))
    }

    /// Subscribe to property value changes.
    pub fn subscribe_properties<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        subscribe(&self.property_handlers, Arc::new(handler))
    }

    /// Remove a subscription of either kind.
    ///
    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        unsubscribe(&self.error_handlers, id) || unsubscribe(&self.property_handlers, id)
    }

    /// Announce that the error list of `field` changed.
    pub fn notify(&self, field: &str) {
        log::debug!("Errors changed for '{}'", field);
        self.deliver(&self.error_handlers, field);
    }

    /// Announce that the value of property `name` changed.
    pub fn notify_property(&self, name: &str) {
        self.deliver(&self.property_handlers, name);
    }

    fn deliver(&self, subscribers: &Subscribers, name: &str) {
        let handlers: Vec<ChangeHandler> = subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        if handlers.is_empty() {
            return;
        }

        let name = name.to_string();
        self.executor.run_or_schedule(Box::new(move || {
            for handler in &handlers {
                handler(&name);
            }
        }));
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::inline()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier").finish_non_exhaustive()
    }
}

fn subscribe(subscribers: &Subscribers, handler: ChangeHandler) -> SubscriptionId {
    let id = SubscriptionId::new();
    subscribers
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, handler));
    id
}

fn unsubscribe(subscribers: &Subscribers, id: SubscriptionId) -> bool {
    let mut guard = subscribers.write().unwrap_or_else(PoisonError::into_inner);
    let before = guard.len();
    guard.retain(|(existing, _)| *existing != id);
    guard.len() != before
}
