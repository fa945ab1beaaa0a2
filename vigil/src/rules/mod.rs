//! Named validation rules, stored per field.
//!
//! A rule inspects whatever state it captured and returns zero or more
//! human-readable messages. Sync rules run inline in registration order;
//! async rules for one field are fanned out and joined.
//!
//! # Example
//!
//! ```
//! use vigil::rules::RuleRegistry;
//!
//! let registry = RuleRegistry::new();
//! registry
//!     .add_rule("Name", || vec!["Name is required".to_string()])
//!     .unwrap();
//! registry
//!     .add_async_rule("Name", || async { Ok(Vec::new()) })
//!     .unwrap();
//!
//! assert_eq!(registry.rules_for("Name").len(), 1);
//! assert!(registry.all_validated_field_names().contains("Name"));
//! ```

pub mod builtin;

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Result, RuleError, VigilError};

/// Type alias for boxed futures used in async validation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of an async rule: messages, or a fault that aborts the pass.
pub type RuleOutcome = std::result::Result<Vec<String>, RuleError>;

/// A synchronous validation rule.
pub type SyncRule = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// An asynchronous validation rule.
pub type AsyncRule = Arc<dyn Fn() -> BoxFuture<'static, RuleOutcome> + Send + Sync>;

/// Per-field store of sync and async rules.
///
/// Registration normally happens once while the owner is being built, but
/// reads and writes are safe from any thread. There is no removal API:
/// rules live as long as the registry.
#[derive(Default)]
pub struct RuleRegistry {
    sync_rules: DashMap<String, Vec<SyncRule>>,
    async_rules: DashMap<String, Vec<AsyncRule>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sync rule for `field`.
    ///
    /// Duplicates are allowed and all of them run.
    pub fn add_rule<F>(&self, field: impl Into<String>, rule: F) -> Result<()>
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        let field = checked_field(field.into())?;
        self.sync_rules.entry(field).or_default().push(Arc::new(rule));
        Ok(())
    }

    /// Appends an async rule for `field`.
    pub fn add_async_rule<F, Fut>(&self, field: impl Into<String>, rule: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleOutcome> + Send + 'static,
    {
        let boxed: AsyncRule =
            Arc::new(move || -> BoxFuture<'static, RuleOutcome> { Box::pin(rule()) });
        self.add_async_rule_boxed(field, Some(boxed))
    }

    /// Appends an already-boxed async rule.
    ///
    /// Used by callers that assemble rules dynamically; a missing rule is
    /// rejected with [`VigilError::InvalidArgument`].
    pub fn add_async_rule_boxed(
        &self,
        field: impl Into<String>,
        rule: Option<AsyncRule>,
    ) -> Result<()> {
        let field = checked_field(field.into())?;
        let Some(rule) = rule else {
            return Err(VigilError::InvalidArgument(format!(
                "async rule for field '{field}' is missing"
            )));
        };
        self.async_rules.entry(field).or_default().push(rule);
        Ok(())
    }

    /// Sync rules for `field` in registration order; empty when none.
    pub fn rules_for(&self, field: &str) -> Vec<SyncRule> {
        self.sync_rules
            .get(field)
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }

    /// Async rules for `field` in registration order; empty when none.
    pub fn async_rules_for(&self, field: &str) -> Vec<AsyncRule> {
        self.async_rules
            .get(field)
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }

    /// Every field with at least one sync or async rule.
    pub fn all_validated_field_names(&self) -> BTreeSet<String> {
        self.sync_rules
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.async_rules.iter().map(|entry| entry.key().clone()))
            .collect()
    }

    /// Returns `true` if no rule has been registered.
    pub fn is_empty(&self) -> bool {
        self.sync_rules.is_empty() && self.async_rules.is_empty()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("fields", &self.all_validated_field_names())
            .finish()
    }
}

fn checked_field(field: String) -> Result<String> {
    if field.trim().is_empty() {
        return Err(VigilError::InvalidArgument(
            "field name must not be blank".to_string(),
        ));
    }
    Ok(field)
}
