//! A sign-up form view model.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use vigil::prelude::*;

const RESERVED_NAMES: &[&str] = &["Admin", "root"];

pub struct SignupForm {
    core: ViewModelCore,
    name: Property<String>,
    email: Property<String>,
    code: Property<String>,
}

impl SignupForm {
    pub fn new(executor: Arc<dyn AffinityExecutor>, config: ValidationConfig) -> Self {
        let form = Self {
            core: ViewModelCore::new(executor, config),
            name: Property::default(),
            email: Property::default(),
            code: Property::default(),
        };
        if let Err(e) = form.register_rules() {
            log::error!("Failed to register sign-up rules: {}", e);
        }
        form.core
            .register_property_reset("Name", &form.name, String::new());
        form.core
            .register_property_reset("Email", &form.email, String::new());
        form.core
            .register_property_reset("Code", &form.code, String::new());
        form.core.on_dispose(|| log::info!("Sign-up form closed"));
        form
    }

    fn register_rules(&self) -> vigil::Result<()> {
        let core = &self.core;

        core.add_rule("Name", builtin::required(&self.name, "Name is required"))?;
        core.add_rule("Name", builtin::max_length(&self.name, 32, "Name is too long"))?;
        core.add_async_rule(
            "Name",
            builtin::async_check(
                &self.name,
                |value| async move {
                    // Stands in for a server round-trip.
                    sleep(Duration::from_millis(30)).await;
                    !RESERVED_NAMES.contains(&value.as_str())
                },
                "This name is reserved",
            ),
        )?;

        core.add_rule("Email", builtin::required(&self.email, "Email is required"))?;
        core.add_rule("Email", builtin::email(&self.email, "Email is not valid"))?;

        core.add_async_rule(
            "Code",
            builtin::async_check(
                &self.code,
                |value| async move {
                    sleep(Duration::from_millis(10)).await;
                    value.len() == 4
                },
                "Code must be 4 digits",
            ),
        )?;
        core.add_async_rule(
            "Code",
            builtin::async_check(
                &self.code,
                |value| async move {
                    sleep(Duration::from_millis(50)).await;
                    value.chars().all(|c| c.is_ascii_digit())
                },
                "Code must be numeric",
            ),
        )?;
        Ok(())
    }

    pub fn core(&self) -> &ViewModelCore {
        &self.core
    }

    pub fn set_name(&self, value: &str) {
        self.core.set_property(&self.name, value.to_string(), "Name");
    }

    pub fn set_email(&self, value: &str) {
        self.core.set_property(&self.email, value.to_string(), "Email");
    }

    pub fn set_code(&self, value: &str) {
        self.core.set_property(&self.code, value.to_string(), "Code");
    }

    /// Kick off a background autosave bounded by a named, timed token.
    pub fn start_autosave(&self) -> vigil::Result<()> {
        let token = self
            .core
            .get_or_create_token("autosave", Some(Duration::from_secs(5)))?;
        let name = self.name.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => log::info!("Autosave cancelled"),
                _ = sleep(Duration::from_secs(1)) => log::info!("Autosaved '{}'", name.get()),
            }
        });
        Ok(())
    }
}
