//! Per-field error state.
//!
//! The store maps field names to non-empty lists of messages. A field with
//! no errors has no key at all, so `has_errors` and per-field queries can
//! never disagree. Updates are diffed as sets: only a change in the set of
//! messages for a field produces an `errors changed` event.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::notify::ChangeNotifier;

type FieldErrors = IndexMap<String, Vec<String>>;

/// Current validation errors, keyed by field in first-error order.
#[derive(Debug)]
pub struct ErrorStore {
    fields: RwLock<FieldErrors>,
    has_errors: AtomicBool,
    notifier: Arc<ChangeNotifier>,
}

impl ErrorStore {
    /// Create an empty store reporting changes through `notifier`.
    pub fn new(notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            fields: RwLock::new(IndexMap::new()),
            has_errors: AtomicBool::new(false),
            notifier,
        }
    }

    /// The notifier this store reports through.
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Replace the errors for `field`.
    ///
    /// Blank messages are dropped. An empty result removes the field. The
    /// change is announced only if the set of messages actually differs, so
    /// reordering the same messages is silent. Returns whether it changed.
    pub fn set_errors<I, S>(&self, field: &str, messages: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<String> = messages
            .into_iter()
            .map(Into::into)
            .filter(|m| !m.trim().is_empty())
            .collect();

        let changed = {
            let mut fields = self.write();
            let changed = if messages.is_empty() {
                fields.shift_remove(field).is_some()
            } else {
                match fields.get_mut(field) {
                    Some(current) if same_messages(current, &messages) => false,
                    Some(current) => {
                        *current = messages;
                        true
                    }
                    None => {
                        fields.insert(field.to_string(), messages);
                        true
                    }
                }
            };
            self.refresh_flag(&fields);
            changed
        };

        if changed {
            self.notifier.notify(field);
        }
        changed
    }

    /// Errors for `field`, or for every field when `None`.
    ///
    /// The whole-store form concatenates fields in the order they first
    /// gained errors.
    pub fn get_errors(&self, field: Option<&str>) -> Vec<String> {
        let fields = self.read();
        match field {
            Some(field) => fields.get(field).cloned().unwrap_or_default(),
            None => fields.values().flatten().cloned().collect(),
        }
    }

    /// Remove every error for `field`.
    ///
    /// Announces a change whenever the field had errors. Returns whether it
    /// did.
    pub fn clear_errors(&self, field: &str) -> bool {
        self.clear_field(field, |_| true)
    }

    /// Remove the errors for `field` that match `predicate`.
    ///
    /// If the field had any errors a change is announced, even when nothing
    /// matched. Returns whether the field had errors.
    pub fn clear_errors_matching<P>(&self, field: &str, predicate: P) -> bool
    where
        P: Fn(&str) -> bool,
    {
        self.clear_field(field, predicate)
    }

    /// Remove every error from every field.
    ///
    /// Only the aggregate flag is refreshed; no per-field events fire.
    pub fn clear_all(&self) {
        self.clear_all_matching(|_| true);
    }

    /// Remove matching errors from every field, dropping emptied fields.
    ///
    /// Only the aggregate flag is refreshed; no per-field events fire.
    pub fn clear_all_matching<P>(&self, predicate: P)
    where
        P: Fn(&str) -> bool,
    {
        let mut fields = self.write();
        fields.retain(|_, messages| {
            messages.retain(|m| !predicate(m.as_str()));
            !messages.is_empty()
        });
        self.refresh_flag(&fields);
    }

    /// Returns `true` if any field has errors.
    pub fn has_errors(&self) -> bool {
        self.has_errors.load(Ordering::SeqCst)
    }

    /// Total number of stored messages across all fields.
    pub fn error_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    /// Names of fields that currently have errors.
    pub fn fields_with_errors(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Every stored message joined by `separator`.
    pub fn error_text(&self, separator: &str) -> String {
        self.get_errors(None).join(separator)
    }

    fn clear_field<P>(&self, field: &str, predicate: P) -> bool
    where
        P: Fn(&str) -> bool,
    {
        let had_errors = {
            let mut fields = self.write();
            let emptied = fields.get_mut(field).map(|messages| {
                messages.retain(|m| !predicate(m.as_str()));
                messages.is_empty()
            });
            if emptied == Some(true) {
                fields.shift_remove(field);
            }
            self.refresh_flag(&fields);
            emptied.is_some()
        };

        if had_errors {
            self.notifier.notify(field);
        }
        had_errors
    }

    fn refresh_flag(&self, fields: &FieldErrors) {
        self.has_errors.store(!fields.is_empty(), Ordering::SeqCst);
    }

    fn read(&self) -> RwLockReadGuard<'_, FieldErrors> {
        self.fields.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FieldErrors> {
        self.fields.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::new(Arc::new(ChangeNotifier::inline()))
    }
}

fn same_messages(current: &[String], next: &[String]) -> bool {
    let current: HashSet<&str> = current.iter().map(String::as_str).collect();
    let next: HashSet<&str> = next.iter().map(String::as_str).collect();
    current == next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_messages_ignores_order_and_repeats() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "x".to_string(), "x".to_string()];
        assert!(same_messages(&a, &b));
        assert!(!same_messages(&a, &a[..1]));
    }
}
