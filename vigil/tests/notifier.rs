//! Tests for affinity-bound change delivery.

use std::sync::{Arc, Mutex};
use std::thread;

use vigil::notify::{self, AffinityExecutor, ChangeNotifier};

type Log = Arc<Mutex<Vec<(String, thread::ThreadId)>>>;

fn recorder(notifier: &ChangeNotifier) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    notifier.subscribe_errors(move |field| {
        sink.lock()
            .unwrap()
            .push((field.to_string(), thread::current().id()));
    });
    log
}

#[test]
fn test_inline_notifier_delivers_immediately() {
    let notifier = ChangeNotifier::inline();
    let log = recorder(&notifier);
    notifier.notify("Name");
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_delivery_on_owner_thread_is_inline() {
    let (executor, mut queue) = notify::channel();
    let notifier = ChangeNotifier::new(Arc::new(executor));
    let log = recorder(&notifier);

    notifier.notify("Name");
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(queue.drain(), 0);
}

#[test]
fn test_background_delivery_is_marshalled() {
    let (executor, mut queue) = notify::channel();
    let notifier = Arc::new(ChangeNotifier::new(Arc::new(executor)));
    let log = recorder(&notifier);
    let owner = thread::current().id();

    let background = Arc::clone(&notifier);
    thread::spawn(move || background.notify("Email"))
        .join()
        .unwrap();
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(queue.drain(), 1);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], ("Email".to_string(), owner));
}

#[test]
fn test_rebinding_moves_affinity() {
    let (executor, queue) = notify::channel();
    assert!(executor.is_on_affinity_context());

    let handle = thread::spawn(move || {
        queue.bind_current_thread();
        queue
    });
    let _queue = handle.join().unwrap();
    assert!(!executor.is_on_affinity_context());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let notifier = ChangeNotifier::inline();
    let hits = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hits);
    let id = notifier.subscribe_errors(move |_| *sink.lock().unwrap() += 1);

    notifier.notify("Name");
    assert!(notifier.unsubscribe(id));
    assert!(!notifier.unsubscribe(id));
    notifier.notify("Name");
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[test]
fn test_property_and_error_channels_are_separate() {
    let notifier = ChangeNotifier::inline();
    let errors = recorder(&notifier);
    let props = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&props);
    notifier.subscribe_properties(move |name| sink.lock().unwrap().push(name.to_string()));

    notifier.notify_property("Name");
    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(*props.lock().unwrap(), vec!["Name"]);
}

#[tokio::test]
async fn test_queue_run_exits_when_executors_drop() {
    let (executor, queue) = notify::channel();
    let notifier = ChangeNotifier::new(Arc::new(executor));
    let log = recorder(&notifier);

    let background = thread::spawn(move || {
        notifier.notify("Code");
    });
    background.join().unwrap();

    queue.run().await;
    assert_eq!(log.lock().unwrap().len(), 1);
}
