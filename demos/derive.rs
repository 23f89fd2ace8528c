//! Example demonstrating the `#[derive(Params)]` / `#[derive(Results)]` macros
//!
//! Run with:
//!   cargo run --example derive --features derive

use injectgraph::{Container, Out};
use injectgraph_derive::{Params, Results};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct Cache {
    size: usize,
}

#[allow(dead_code)]
struct Logger {
    level: String,
}

// A parameter-object record: its fields are flattened into the demand tree
// exactly as if `UserService`'s constructor had taken each field as its own
// argument.
#[derive(Params)]
struct UserServiceParams {
    db: Arc<Database>,
    cache: Arc<Cache>,
    #[di(optional)]
    logger: Option<Arc<Logger>>,
}

struct UserService {
    db: Arc<Database>,
    cache: Arc<Cache>,
    logger: Option<Arc<Logger>>,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = if self.logger.is_some() {
            "with logging"
        } else {
            "without logging"
        };
        format!(
            "UserService connected to {} with cache size {} ({})",
            self.db.url, self.cache.size, logger_status
        )
    }
}

// A result-object record: a single constructor can contribute several
// named productions at once.
#[derive(Results)]
struct AppServices {
    #[di(name = "primary")]
    user_service: UserService,
    #[di(name = "metrics")]
    request_count: u64,
}

fn main() {
    let container = Container::new();

    container
        .provide(|| Database {
            url: "postgres://localhost/mydb".into(),
        })
        .unwrap();
    container.provide(|| Cache { size: 1024 }).unwrap();

    container
        .provide_out(|params: UserServiceParams| {
            Out(AppServices {
                user_service: UserService {
                    db: params.db,
                    cache: params.cache,
                    logger: params.logger,
                },
                request_count: 0,
            })
        })
        .unwrap();

    let description = container
        .resolve_named::<UserService>("primary")
        .unwrap()
        .describe();
    println!("{description}");

    let requests = container.resolve_named::<u64>("metrics").unwrap();
    println!("requests served so far: {requests}");
}
