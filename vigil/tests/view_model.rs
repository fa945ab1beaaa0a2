//! End-to-end tests through the view-model core.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use vigil::rules::builtin;
use vigil::{Property, ValidationConfig, ValidationMode, ViewModelCore};

const NAME_REQUIRED: &str = "이름을 입력해야 합니다.";
const NAME_RESERVED: &str = "'Admin' is a reserved name";

fn error_events(vm: &ViewModelCore) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    vm.on_errors_changed(move |field| sink.lock().unwrap().push(field.to_string()));
    events
}

fn with_required_name(vm: &ViewModelCore) -> Property<String> {
    let name = Property::new("initial".to_string());
    vm.add_rule("Name", builtin::required(&name, NAME_REQUIRED))
        .unwrap();
    name
}

#[tokio::test]
async fn test_required_name_reports_error() {
    let vm = ViewModelCore::new(
        Arc::new(vigil::notify::InlineExecutor),
        ValidationConfig::default().with_setter_mode(ValidationMode::Combined),
    );
    let name = with_required_name(&vm);

    assert!(vm.set_property(&name, String::new(), "Name"));
    vm.settle().await;

    assert_eq!(vm.get_errors(Some("Name")), vec![NAME_REQUIRED]);
    assert!(vm.has_errors());
    assert_eq!(vm.error_count(), 1);
}

#[tokio::test]
async fn test_async_rule_rejects_reserved_name() {
    let vm = ViewModelCore::headless();
    let name = Property::new(String::new());
    vm.add_async_rule(
        "Name",
        builtin::async_check(
            &name,
            |value| async move {
                sleep(Duration::from_millis(20)).await;
                value != "Admin"
            },
            NAME_RESERVED,
        ),
    )
    .unwrap();

    assert!(vm.set_property(&name, "Admin".to_string(), "Name"));
    // The setter does not wait for the pass.
    assert!(!vm.has_errors());

    vm.settle().await;
    assert!(vm.get_errors(Some("Name")).contains(&NAME_RESERVED.to_string()));

    vm.set_property(&name, "Ada".to_string(), "Name");
    vm.settle().await;
    assert!(!vm.has_errors());
}

#[tokio::test]
async fn test_clear_errors_fires_exactly_once() {
    let vm = ViewModelCore::headless();
    let name = with_required_name(&vm);
    name.set(String::new());
    vm.engine().validate_sync("Name");

    let events = error_events(&vm);
    vm.errors().clear_errors("Name");

    assert!(vm.get_errors(Some("Name")).is_empty());
    assert!(!vm.has_errors());
    assert_eq!(*events.lock().unwrap(), vec!["Name"]);
}

#[tokio::test]
async fn test_unchanged_value_skips_validation() {
    let vm = ViewModelCore::new(
        Arc::new(vigil::notify::InlineExecutor),
        ValidationConfig::default().with_setter_mode(ValidationMode::Sync),
    );
    let name = with_required_name(&vm);
    let events = error_events(&vm);

    assert!(!vm.set_property(&name, "initial".to_string(), "Name"));
    assert!(events.lock().unwrap().is_empty());

    assert!(vm.set_property(&name, " ".to_string(), "Name"));
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_sync_setter_mode_needs_no_runtime() {
    let vm = ViewModelCore::new(
        Arc::new(vigil::notify::InlineExecutor),
        ValidationConfig::default().with_setter_mode(ValidationMode::Sync),
    );
    let name = with_required_name(&vm);
    vm.set_property(&name, String::new(), "Name");
    assert_eq!(vm.error_text(), NAME_REQUIRED);
}

#[test]
fn test_property_changes_are_announced() {
    let vm = ViewModelCore::new(
        Arc::new(vigil::notify::InlineExecutor),
        ValidationConfig::default().with_setter_mode(ValidationMode::Sync),
    );
    let changed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changed);
    vm.notifier()
        .subscribe_properties(move |name| sink.lock().unwrap().push(name.to_string()));

    let age = Property::new(30u32);
    vm.set_property(&age, 31, "Age");
    vm.set_property(&age, 31, "Age");
    assert_eq!(*changed.lock().unwrap(), vec!["Age"]);
}

#[test]
fn test_error_text_uses_configured_separator() {
    let vm = ViewModelCore::new(
        Arc::new(vigil::notify::InlineExecutor),
        ValidationConfig::default().with_error_separator(" | "),
    );
    vm.errors().set_errors("A", ["one"]);
    vm.errors().set_errors("B", ["two"]);
    assert_eq!(vm.error_text(), "one | two");
}

#[test]
fn test_reset_restores_registered_properties() {
    let vm = ViewModelCore::headless();
    let name = Property::new("start".to_string());
    let count = Property::new(0);
    vm.register_property_reset("Name", &name, "start".to_string());
    vm.register_property_reset("Count", &count, 0);

    name.set("changed".to_string());
    count.set(9);

    assert!(vm.reset("Name"));
    assert_eq!(name.get(), "start");
    assert_eq!(count.get(), 9);
    assert!(!vm.reset("Missing"));

    vm.reset_all();
    assert_eq!(count.get(), 0);
}

#[tokio::test]
async fn test_dispose_cancels_before_hooks() {
    let vm = ViewModelCore::headless();
    let token = vm
        .get_or_create_token("refresh", Some(Duration::from_secs(60)))
        .unwrap();
    let seen = Arc::new(Mutex::new(None));
    let probe = token.clone();
    let sink = Arc::clone(&seen);
    vm.on_dispose(move || *sink.lock().unwrap() = Some(probe.is_cancelled()));

    vm.dispose();
    assert_eq!(*seen.lock().unwrap(), Some(true));
    assert!(vm.cancellations().is_empty());
    assert!(vm.is_disposed());

    // A second dispose does nothing.
    *seen.lock().unwrap() = None;
    vm.dispose();
    assert_eq!(*seen.lock().unwrap(), None);
}

#[tokio::test]
async fn test_dispose_async_awaits_cancellations() {
    let vm = ViewModelCore::headless();
    let a = vm.get_or_create_token("a", Some(Duration::from_secs(60))).unwrap();
    let b = vm.get_or_create_token("b", None).unwrap();
    let hooks = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hooks);
    vm.on_dispose(move || *sink.lock().unwrap() += 1);

    vm.dispose_async().await;
    assert!(a.is_cancelled() && b.is_cancelled());
    assert!(vm.cancellations().is_empty());
    assert_eq!(*hooks.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_validate_all_gate() {
    let vm = ViewModelCore::headless();
    let code = Property::new("abc".to_string());
    let snapshot = code.clone();
    vm.add_async_rule("Code", move || {
        let value = snapshot.get();
        async move {
            if value.len() < 4 {
                Ok(vec!["Code must be 4 characters".to_string()])
            } else {
                Ok(Vec::new())
            }
        }
    })
    .unwrap();

    assert!(!vm.validate_all_and_report().await.unwrap());
    code.set("abcd".to_string());
    assert!(vm.validate_all_and_report().await.unwrap());
}

#[tokio::test]
async fn test_drop_cancels_named_operations() {
    let vm = ViewModelCore::headless();
    let token = vm.get_or_create_token("refresh", None).unwrap();
    let hooks = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hooks);
    vm.on_dispose(move || *sink.lock().unwrap() += 1);

    drop(vm);
    assert!(token.is_cancelled());
    assert!(
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .is_ok()
    );
    assert_eq!(*hooks.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_drop_after_dispose_runs_hooks_once() {
    let vm = ViewModelCore::headless();
    let hooks = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hooks);
    vm.on_dispose(move || *sink.lock().unwrap() += 1);

    vm.dispose_async().await;
    drop(vm);
    assert_eq!(*hooks.lock().unwrap(), 1);
}
