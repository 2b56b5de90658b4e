//! Logging demo
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! MINJECTION_LOG=trace cargo run --example logging --features logging-pretty
//! ```

use minjection::{Container, Lifetime, Registration, ServiceId};

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct Session {
    id: u32,
}

#[allow(dead_code)]
struct UserService {
    db: std::sync::Arc<Database>,
}

fn main() {
    // Reads MINJECTION_LOG / MINJECTION_LOG_FORMAT
    minjection::logging::init();

    println!("=== Minjection Logging Demo ===\n");

    // logs: "Creating new container"
    let container = Container::new();

    // logs: "Registered service"
    container.register_instance(Database {
        url: "postgres://localhost/mydb".into(),
    });

    container
        .register(
            Registration::for_type::<Session>()
                .constructor(|| Session { id: 7 })
                .lifetime(Lifetime::Cycle),
        )
        .unwrap();

    container
        .register(
            Registration::for_type::<UserService>()
                .factory(|_, deps| Ok(UserService { db: deps.get::<Database>()? }))
                .dependencies([ServiceId::of_type::<Database>()])
                .lifetime(Lifetime::Static),
        )
        .unwrap();

    // logs: "Rejected registration"
    let rejected = container.register(Registration::for_type::<u8>());
    assert!(rejected.is_err());

    // logs: "Creating instance", then trace "Service resolved" on the cached path
    let _users = container.resolve_type::<UserService>().unwrap();
    let _users_again = container.resolve_type::<UserService>().unwrap();
    let _session = container.resolve_type::<Session>().unwrap();

    // logs: "Service not registered"
    assert!(container.try_resolve_type::<i32>().is_none());

    println!("{container:?}");
    println!("\n=== Demo Complete ===");
    println!("Tip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
