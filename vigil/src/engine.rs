//! Rule execution.
//!
//! The engine pulls a field's rules from the [`RuleRegistry`], runs them and
//! commits the resulting messages to the [`ErrorStore`] in one call.
//!
//! Faults are handled asymmetrically. A panicking sync rule is caught,
//! logged and contributes nothing; the other rules still run. An async rule
//! returning `Err` aborts the whole pass and the error reaches the caller,
//! with nothing committed for that field.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{join_all, try_join_all};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::{ValidationConfig, ValidationMode};
use crate::error::{Result, VigilError, extract_panic_message};
use crate::rules::RuleRegistry;
use crate::store::ErrorStore;

/// Runs validation passes and feeds the results into an [`ErrorStore`].
///
/// Cheap to clone; clones share the registry, the store and the set of
/// background passes.
#[derive(Clone)]
pub struct ValidationEngine {
    rules: Arc<RuleRegistry>,
    errors: Arc<ErrorStore>,
    config: Arc<ValidationConfig>,
    in_flight: Arc<DashMap<String, Vec<JoinHandle<()>>>>,
}

impl ValidationEngine {
    /// Create an engine over `rules` writing into `errors`.
    pub fn new(
        rules: Arc<RuleRegistry>,
        errors: Arc<ErrorStore>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            rules,
            errors,
            config: Arc::new(config),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// The rule registry this engine reads.
    pub fn rules(&self) -> &Arc<RuleRegistry> {
        &self.rules
    }

    /// The error store this engine writes.
    pub fn errors(&self) -> &Arc<ErrorStore> {
        &self.errors
    }

    /// The engine configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Run the sync rules for `field` and commit their messages.
    pub fn validate_sync(&self, field: &str) {
        let messages = self.run_sync_rules(field);
        self.errors.set_errors(field, messages);
    }

    /// Run the async rules for `field` concurrently and commit their
    /// messages once all of them have finished.
    pub async fn validate_async(&self, field: &str) -> Result<()> {
        let messages = self.run_async_rules(field).await?;
        self.errors.set_errors(field, messages);
        Ok(())
    }

    /// Run sync rules, then async rules, and commit the deduplicated union.
    ///
    /// If an async rule fails, the sync messages are discarded too.
    pub async fn validate_combined(&self, field: &str) -> Result<()> {
        let mut messages = self.run_sync_rules(field);
        messages.extend(self.run_async_rules(field).await?);
        let merged = dedupe(messages, self.config.trim_messages);
        self.errors.set_errors(field, merged);
        Ok(())
    }

    /// Run the pass selected by `mode` for `field`.
    pub async fn validate(&self, field: &str, mode: ValidationMode) -> Result<()> {
        match mode {
            ValidationMode::Sync => {
                self.validate_sync(field);
                Ok(())
            }
            ValidationMode::Async => self.validate_async(field).await,
            ValidationMode::Combined => self.validate_combined(field).await,
        }
    }

    /// Validate every field that has rules, all fields concurrently.
    ///
    /// Uses [`ValidationConfig::validate_all_mode`] for each field. Every
    /// field's pass runs to completion; the first failure is then returned.
    pub async fn validate_all(&self) -> Result<()> {
        let mode = self.config.validate_all_mode;
        let fields = self.rules.all_validated_field_names();
        log::debug!("Validating {} fields ({:?})", fields.len(), mode);

        let passes = fields.iter().map(|field| self.validate(field, mode));
        join_all(passes).await.into_iter().collect()
    }

    /// Validate everything and report whether the object is error-free.
    pub async fn validate_all_and_report(&self) -> Result<bool> {
        self.validate_all().await?;
        Ok(!self.errors.has_errors())
    }

    /// Start a pass for `field` in the background and return immediately.
    ///
    /// Passes are not superseded: if two run for the same field, whichever
    /// finishes last determines the stored errors. Failures are logged.
    pub fn spawn_validation(&self, field: &str, mode: ValidationMode) -> Result<()> {
        let handle = Handle::try_current()
            .map_err(|_| VigilError::NoRuntime("run a background validation"))?;

        let engine = self.clone();
        let name = field.to_string();
        let task = handle.spawn(async move {
            let result = AssertUnwindSafe(engine.validate(&name, mode))
                .catch_unwind()
                .await;

            let err = match result {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(panic) => VigilError::ValidationPanicked {
                    field: name,
                    message: extract_panic_message(&panic),
                },
            };
            log::error!("Background validation failed: {}", err);
        });

        let mut tasks = self.in_flight.entry(field.to_string()).or_default();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
        Ok(())
    }

    /// Number of unfinished background passes for `field`.
    pub fn pending(&self, field: &str) -> usize {
        self.in_flight
            .get(field)
            .map(|tasks| tasks.iter().filter(|task| !task.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait until every background pass, including ones started while
    /// waiting, has finished.
    pub async fn settle(&self) {
        loop {
            let fields: Vec<String> = self
                .in_flight
                .iter()
                .map(|entry| entry.key().clone())
                .collect();
            let tasks: Vec<JoinHandle<()>> = fields
                .iter()
                .filter_map(|field| self.in_flight.remove(field))
                .flat_map(|(_, tasks)| tasks)
                .collect();
            if tasks.is_empty() {
                break;
            }
            // Panics are already caught inside the task.
            join_all(tasks).await;
        }
    }

    fn run_sync_rules(&self, field: &str) -> Vec<String> {
        let mut messages = Vec::new();
        for (index, rule) in self.rules.rules_for(field).iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| rule())) {
                Ok(found) => messages.extend(found.into_iter().filter(|m| !m.trim().is_empty())),
                Err(panic) => {
                    log::warn!(
                        "Sync rule #{} for '{}' panicked: {}",
                        index,
                        field,
                        extract_panic_message(&panic)
                    );
                }
            }
        }
        messages
    }

    async fn run_async_rules(&self, field: &str) -> Result<Vec<String>> {
        let rules = self.rules.async_rules_for(field);
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let outcomes = try_join_all(rules.iter().map(|rule| rule()))
            .await
            .map_err(|err| VigilError::rule_failed(field, err))?;
        Ok(outcomes.into_iter().flatten().collect())
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("rules", &self.rules)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Drop exact duplicates, keeping first occurrences in order.
fn dedupe(messages: Vec<String>, trim: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .map(|m| if trim { m.trim().to_string() } else { m })
        .filter(|m| seen.insert(m.clone()))
        .collect()
}
