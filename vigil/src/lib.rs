//! Field validation and error aggregation for view models.
//!
//! Rules are registered per field, run inline (sync) or fanned out (async),
//! and their messages land in an error store that only announces real
//! changes. Announcements are delivered on an affinity context so observers
//! never run on a background thread. A registry of named cancellation tokens
//! ties long-running work to the owner's lifetime.

pub mod cancellation;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod property;
pub mod rules;
pub mod store;
pub mod view_model;

pub use cancellation::{CancellationRegistry, OperationStatus};
pub use config::{ValidationConfig, ValidationMode};
pub use engine::ValidationEngine;
pub use error::{Result, RuleError, VigilError};
pub use notify::ChangeNotifier;
pub use property::Property;
pub use store::ErrorStore;
pub use view_model::ViewModelCore;

pub mod prelude {
    pub use crate::cancellation::{CancellationRegistry, OperationStatus};
    pub use crate::config::{ValidationConfig, ValidationMode};
    pub use crate::engine::ValidationEngine;
    pub use crate::error::{RuleError, VigilError};
    pub use crate::notify::{
        AffinityExecutor, AffinityQueue, ChangeNotifier, ChannelExecutor, InlineExecutor,
        SubscriptionId,
    };
    pub use crate::property::Property;
    pub use crate::rules::{RuleOutcome, RuleRegistry, builtin};
    pub use crate::store::ErrorStore;
    pub use crate::view_model::ViewModelCore;
}
