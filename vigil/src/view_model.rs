//! Owner-side scaffolding for a validating view model.
//!
//! [`ViewModelCore`] bundles one instance of every component and wires them
//! together: setters write a [`Property`], raise a property-changed event and
//! start validation in the background; observers read the error store and
//! subscribe to the notifier; teardown cancels every named operation before
//! running owner cleanup.
//!
//! # Example
//!
//! ```
//! use vigil::rules::builtin;
//! use vigil::{Property, ViewModelCore};
//!
//! let vm = ViewModelCore::headless();
//! let name = Property::new(String::new());
//! vm.add_rule("Name", builtin::required(&name, "Name is required")).unwrap();
//!
//! vm.engine().validate_sync("Name");
//! assert!(vm.has_errors());
//! assert_eq!(vm.get_errors(Some("Name")), vec!["Name is required".to_string()]);
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cancellation::CancellationRegistry;
use crate::config::{ValidationConfig, ValidationMode};
use crate::engine::ValidationEngine;
use crate::error::Result;
use crate::notify::{AffinityExecutor, ChangeNotifier, InlineExecutor, SubscriptionId};
use crate::property::Property;
use crate::rules::{RuleOutcome, RuleRegistry};
use crate::store::ErrorStore;

type ResetFn = Arc<dyn Fn() + Send + Sync>;
type DisposeHook = Box<dyn FnOnce() + Send>;

/// Validation, notification and cancellation state owned by one view model.
pub struct ViewModelCore {
    notifier: Arc<ChangeNotifier>,
    engine: ValidationEngine,
    cancellations: Arc<CancellationRegistry>,
    resets: Mutex<Vec<(String, ResetFn)>>,
    dispose_hooks: Mutex<Vec<DisposeHook>>,
    disposed: AtomicBool,
}

impl ViewModelCore {
    /// Create a core delivering notifications through `executor`.
    pub fn new(executor: Arc<dyn AffinityExecutor>, config: ValidationConfig) -> Self {
        let notifier = Arc::new(ChangeNotifier::new(executor));
        let errors = Arc::new(ErrorStore::new(Arc::clone(&notifier)));
        let engine = ValidationEngine::new(Arc::new(RuleRegistry::new()), errors, config);
        Self {
            notifier,
            engine,
            cancellations: Arc::new(CancellationRegistry::new()),
            resets: Mutex::new(Vec::new()),
            dispose_hooks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Create a core with inline delivery and default configuration.
    pub fn headless() -> Self {
        Self::new(Arc::new(InlineExecutor), ValidationConfig::default())
    }

    /// The validation engine.
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// The rule registry.
    pub fn rules(&self) -> &Arc<RuleRegistry> {
        self.engine.rules()
    }

    /// The error store.
    pub fn errors(&self) -> &Arc<ErrorStore> {
        self.engine.errors()
    }

    /// The change notifier.
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// The named cancellation registry.
    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register a sync rule for `field`.
    pub fn add_rule<F>(&self, field: impl Into<String>, rule: F) -> Result<()>
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.rules().add_rule(field, rule)
    }

    /// Register an async rule for `field`.
    pub fn add_async_rule<F, Fut>(&self, field: impl Into<String>, rule: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleOutcome> + Send + 'static,
    {
        self.rules().add_async_rule(field, rule)
    }

    /// Register how to restore property `name` to its initial state.
    pub fn register_reset<F>(&self, name: impl Into<String>, reset: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.into(), Arc::new(reset)));
    }

    /// Register a reset that writes `initial` back into `prop`.
    ///
    /// A property-changed event is raised if the value actually changes.
    pub fn register_property_reset<T>(
        &self,
        name: impl Into<String>,
        prop: &Property<T>,
        initial: T,
    ) where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let name = name.into();
        let prop = prop.clone();
        let notifier = Arc::clone(&self.notifier);
        let event = name.clone();
        self.register_reset(name, move || {
            if prop.set_if_changed(initial.clone()) {
                notifier.notify_property(&event);
            }
        });
    }

    /// Register a hook run during teardown, after every cancellation.
    ///
    /// Hooks run once, in registration order.
    pub fn on_dispose<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispose_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    /// Store `value` in `prop` and validate `name` if it changed.
    ///
    /// Returns immediately: async and combined passes run in the background
    /// per [`ValidationConfig::setter_mode`], so the stored errors may lag
    /// the stored value until the pass completes. Returns whether the value
    /// changed.
    pub fn set_property<T>(&self, prop: &Property<T>, value: T, name: &str) -> bool
    where
        T: PartialEq,
    {
        if !prop.set_if_changed(value) {
            return false;
        }
        self.notifier.notify_property(name);

        match self.engine.config().setter_mode {
            ValidationMode::Sync => self.engine.validate_sync(name),
            mode => {
                if let Err(err) = self.engine.spawn_validation(name, mode) {
                    log::warn!("Could not validate '{}' after change: {}", name, err);
                }
            }
        }
        true
    }

    /// Wait for every background validation started by setters.
    pub async fn settle(&self) {
        self.engine.settle().await;
    }

    /// Run the reset registered for `name`. Returns `false` if none exists.
    pub fn reset(&self, name: &str) -> bool {
        let reset = self
            .resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, reset)| Arc::clone(reset));
        match reset {
            Some(reset) => {
                reset();
                true
            }
            None => false,
        }
    }

    /// Run every registered reset in registration order.
    pub fn reset_all(&self) {
        let resets: Vec<ResetFn> = self
            .resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, reset)| Arc::clone(reset))
            .collect();
        for reset in resets {
            reset();
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Errors for `field`, or for every field when `None`.
    pub fn get_errors(&self, field: Option<&str>) -> Vec<String> {
        self.errors().get_errors(field)
    }

    /// Returns `true` if any field has errors.
    pub fn has_errors(&self) -> bool {
        self.errors().has_errors()
    }

    /// Total number of stored messages.
    pub fn error_count(&self) -> usize {
        self.errors().error_count()
    }

    /// Every message joined by the configured separator.
    pub fn error_text(&self) -> String {
        self.errors().error_text(&self.engine.config().error_separator)
    }

    /// Subscribe to per-field error changes.
    pub fn on_errors_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.notifier.subscribe_errors(handler)
    }

    /// Validate every field and report whether the object is error-free.
    pub async fn validate_all_and_report(&self) -> Result<bool> {
        self.engine.validate_all_and_report().await
    }

    // -------------------------------------------------------------------------
    // Cancellation and teardown
    // -------------------------------------------------------------------------

    /// Token for the named operation, created on first request.
    pub fn get_or_create_token(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<CancellationToken> {
        self.cancellations.get_or_create_token(name, timeout)
    }

    /// Cancel and forget the named operation; unknown names are ignored.
    pub fn cancel(&self, name: &str) -> bool {
        self.cancellations.cancel(name)
    }

    /// Returns `true` once teardown has started.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Cancel every named operation, then run the dispose hooks.
    ///
    /// Only the first call has an effect. Dropping the core disposes it.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.cancellations.cancel_all();
        log::debug!("Disposing view model, cancelled {} operations", cancelled);
        self.run_dispose_hooks();
    }

    /// Like [`dispose`](Self::dispose), but waits for every cancellation to
    /// finish before running the hooks.
    pub async fn dispose_async(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!(
            "Disposing view model, cancelling {} operations",
            self.cancellations.len()
        );
        self.cancellations.cancel_all_async().await;
        self.run_dispose_hooks();
    }

    fn run_dispose_hooks(&self) {
        let hooks = std::mem::take(
            &mut *self
                .dispose_hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for hook in hooks {
            hook();
        }
    }
}

impl Default for ViewModelCore {
    fn default() -> Self {
        Self::headless()
    }
}

impl Drop for ViewModelCore {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ViewModelCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModelCore")
            .field("engine", &self.engine)
            .field("cancellations", &self.cancellations)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
