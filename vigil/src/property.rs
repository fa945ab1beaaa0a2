use std::sync::{Arc, PoisonError, RwLock};

/// Storage cell for a bindable field.
///
/// `Property<T>` is the backing store a view model's setters write to. It
/// uses `Arc<RwLock<T>>` internally, making it cheap to clone into rule
/// closures and safe to read from background validation tasks.
///
/// # Example
///
/// ```
/// use vigil::Property;
///
/// let name = Property::new(String::new());
/// assert!(name.set_if_changed("Ada".to_string()));
/// assert!(!name.set_if_changed("Ada".to_string()));
/// assert_eq!(name.get(), "Ada");
/// ```
#[derive(Debug)]
pub struct Property<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Property<T> {
    /// Create a new property with the given value
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Get a clone of the current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Set a new value unconditionally
    pub fn set(&self, value: T) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Store `value` only if it differs from the current one.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if *guard == value {
            return false;
        }
        *guard = value;
        true
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
