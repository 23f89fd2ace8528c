//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use injectgraph::Container;
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    name: String,
}

fn main() {
    #[cfg(feature = "logging")]
    {
        injectgraph::logging::init();
    }

    println!("=== injectgraph Logging Demo ===\n");

    let container = Container::new();

    // Registering a provider logs at DEBUG with the call site.
    container
        .provide(|| Database {
            url: "postgres://localhost/mydb".into(),
        })
        .unwrap();

    container
        .provide(|db: Arc<Database>| UserService {
            name: format!("users@{}", db.url),
        })
        .unwrap();

    // Invoking logs at TRACE.
    let name = container
        .invoke(|users: Arc<UserService>| users.name.clone())
        .unwrap();
    println!("resolved: {name}");

    // A missing dependency fails without panicking or poisoning the container.
    let missing = container.resolve::<i32>();
    assert!(missing.is_err());

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
