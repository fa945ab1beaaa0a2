//! Engine configuration

/// Which validation pass a field runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Sync rules only, inline.
    Sync,
    /// Async rules only, fanned out concurrently.
    #[default]
    Async,
    /// Sync rules first, then async rules, merged and deduplicated.
    Combined,
}

/// Configuration for a view model's validation engine.
///
/// # Example
///
/// ```
/// use vigil::config::{ValidationConfig, ValidationMode};
///
/// let config = ValidationConfig::default()
///     .with_setter_mode(ValidationMode::Combined)
///     .with_error_separator("; ");
/// assert_eq!(config.error_separator, "; ");
/// ```
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Separator used when joining every stored message into one string.
    ///
    /// Default: `"\n"`
    pub error_separator: String,

    /// Pass started by `set_property` when a value changes.
    ///
    /// Default: [`ValidationMode::Async`]
    pub setter_mode: ValidationMode,

    /// Pass run for each field by `validate_all`.
    ///
    /// Default: [`ValidationMode::Async`], which ignores sync-only fields'
    /// rules and clears whatever those fields had stored.
    pub validate_all_mode: ValidationMode,

    /// Whether combined passes trim messages before deduplicating them.
    ///
    /// Default: `true`
    pub trim_messages: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            error_separator: "\n".to_string(),
            setter_mode: ValidationMode::Async,
            validate_all_mode: ValidationMode::Async,
            trim_messages: true,
        }
    }
}

impl ValidationConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the separator for the joined error text.
    pub fn with_error_separator(mut self, separator: impl Into<String>) -> Self {
        self.error_separator = separator.into();
        self
    }

    /// Sets the pass triggered by property setters.
    pub fn with_setter_mode(mut self, mode: ValidationMode) -> Self {
        self.setter_mode = mode;
        self
    }

    /// Sets the pass run for each field by `validate_all`.
    pub fn with_validate_all_mode(mut self, mode: ValidationMode) -> Self {
        self.validate_all_mode = mode;
        self
    }

    /// Sets whether combined passes trim messages.
    pub fn with_trim_messages(mut self, trim: bool) -> Self {
        self.trim_messages = trim;
        self
    }
}
