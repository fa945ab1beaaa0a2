mod signup;

use std::fs::File;
use std::str::FromStr;
use std::sync::Arc;

use simplelog::{Config, LevelFilter, WriteLogger};
use vigil::notify;
use vigil::prelude::*;

use signup::SignupForm;

fn log_level() -> LevelFilter {
    std::env::var("VIGIL_LOG")
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Debug)
}

#[tokio::main]
async fn main() {
    let log_file = File::create("vigil-demo.log").expect("Failed to create log file");
    WriteLogger::init(log_level(), Config::default(), log_file)
        .expect("Failed to initialize logger");

    // The main thread plays the UI thread: it owns the queue and is the only
    // place error-change callbacks run.
    let (executor, mut queue) = notify::channel();
    let config = ValidationConfig::default().with_setter_mode(ValidationMode::Combined);
    let form = SignupForm::new(Arc::new(executor), config);

    form.core().on_errors_changed(|field| {
        println!("  [ui] errors changed: {field}");
    });

    println!("Typing into the form...");
    form.set_name("");
    form.set_email("not-an-email");
    form.set_code("12");
    form.core().settle().await;
    queue.drain();
    print_errors(&form);

    println!("Fixing name to a reserved value...");
    form.set_name("Admin");
    form.core().settle().await;
    queue.drain();
    print_errors(&form);

    println!("Fixing everything...");
    form.set_name("Ada");
    form.set_email("ada@example.com");
    form.set_code("1234");
    form.core().settle().await;
    queue.drain();
    print_errors(&form);

    match form.core().validate_all_and_report().await {
        Ok(true) => println!("Form is valid, saving"),
        Ok(false) => println!("Form still has errors"),
        Err(e) => eprintln!("Error: {}", e),
    }
    queue.drain();

    if let Err(e) = form.start_autosave() {
        eprintln!("Error: {}", e);
    }

    form.core().reset_all();
    form.core().errors().clear_all();
    println!("Form reset, has errors: {}", form.core().has_errors());

    form.core().dispose_async().await;
    queue.drain();
    println!("Disposed");
}

fn print_errors(form: &SignupForm) {
    if form.core().has_errors() {
        println!("  {} error(s):", form.core().error_count());
        for line in form.core().error_text().lines() {
            println!("    - {line}");
        }
    } else {
        println!("  no errors");
    }
}
