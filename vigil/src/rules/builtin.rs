//! Ready-made rules bound to a [`Property<String>`].
//!
//! Each constructor captures a clone of the property and returns a closure
//! suitable for [`RuleRegistry::add_rule`](super::RuleRegistry::add_rule) or
//! [`RuleRegistry::add_async_rule`](super::RuleRegistry::add_async_rule).

use std::future::Future;

use regex::Regex;

use super::{BoxFuture, RuleOutcome};
use crate::error::{Result, VigilError};
use crate::property::Property;

/// Build a sync rule from a predicate over the current value.
///
/// The rule yields `msg` whenever `pred` returns `false`.
pub fn check<F>(
    prop: &Property<String>,
    pred: F,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    let prop = prop.clone();
    let msg = msg.into();
    move || {
        if prop.with(|v| pred(v.as_str())) {
            Vec::new()
        } else {
            vec![msg.clone()]
        }
    }
}

/// Require the value to be non-blank.
pub fn required(
    prop: &Property<String>,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static {
    check(prop, |v| !v.trim().is_empty(), msg)
}

/// Require minimum length (in characters).
pub fn min_length(
    prop: &Property<String>,
    min: usize,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static {
    check(prop, move |v| v.chars().count() >= min, msg)
}

/// Require maximum length (in characters).
pub fn max_length(
    prop: &Property<String>,
    max: usize,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static {
    check(prop, move |v| v.chars().count() <= max, msg)
}

/// Require the value to match a regex pattern.
///
/// Fails with [`VigilError::InvalidArgument`] if `pattern` does not compile.
pub fn pattern(
    prop: &Property<String>,
    pattern: &str,
    msg: impl Into<String>,
) -> Result<impl Fn() -> Vec<String> + Send + Sync + 'static> {
    let re = Regex::new(pattern)
        .map_err(|e| VigilError::InvalidArgument(format!("invalid pattern '{pattern}': {e}")))?;
    Ok(check(prop, move |v| re.is_match(v), msg))
}

/// Require a valid email address.
///
/// An empty value passes; combine with [`required`] for non-empty.
pub fn email(
    prop: &Property<String>,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static {
    check(
        prop,
        |v| v.is_empty() || email_address::EmailAddress::is_valid(v),
        msg,
    )
}

/// Require the value to equal another property's current value.
pub fn equals(
    prop: &Property<String>,
    other: &Property<String>,
    msg: impl Into<String>,
) -> impl Fn() -> Vec<String> + Send + Sync + 'static {
    let other = other.clone();
    check(prop, move |v| other.get() == v, msg)
}

/// Adapt an async `bool` predicate into an async rule.
///
/// The predicate receives a snapshot of the value taken when the pass
/// starts; `msg` is reported when it resolves to `false`.
pub fn async_check<F, Fut>(
    prop: &Property<String>,
    pred: F,
    msg: impl Into<String>,
) -> impl Fn() -> BoxFuture<'static, RuleOutcome> + Send + Sync + 'static
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let prop = prop.clone();
    let msg = msg.into();
    move || -> BoxFuture<'static, RuleOutcome> {
        let fut = pred(prop.get());
        let msg = msg.clone();
        Box::pin(async move {
            if fut.await {
                Ok(Vec::new())
            } else {
                Ok(vec![msg])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_whitespace() {
        let p = Property::new("   ".to_string());
        let rule = required(&p, "required");
        assert_eq!(rule(), vec!["required".to_string()]);
        p.set("x".to_string());
        assert!(rule().is_empty());
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let p = Property::new("이름".to_string());
        assert!(min_length(&p, 2, "short")().is_empty());
        assert_eq!(max_length(&p, 1, "long")(), vec!["long".to_string()]);
    }

    #[test]
    fn pattern_rejects_bad_regex() {
        let p = Property::new(String::new());
        assert!(matches!(
            pattern(&p, "(", "bad"),
            Err(VigilError::InvalidArgument(_))
        ));
    }

    #[test]
    fn email_allows_empty() {
        let p = Property::new(String::new());
        let rule = email(&p, "invalid email");
        assert!(rule().is_empty());
        p.set("not-an-address".to_string());
        assert_eq!(rule().len(), 1);
        p.set("ada@example.com".to_string());
        assert!(rule().is_empty());
    }
}
