//! # Minjection - Service Locator with Lifetimes and Auto-Injection
//!
//! A thread-safe service container that hands out shared services keyed by
//! concrete type or by interface, with three reuse policies and injection of
//! unset fields.
//!
//! ## Features
//!
//! - **Two namespaces** - services are keyed by a concrete type or by an interface tag
//! - **Three strategies** - a stored instance, a designated initializer or a factory
//! - **Lifetimes** - new per request, shared per call tree, or shared for the container's life
//! - **Cyclic graphs** - instances are cached before injection, so mutual dependencies resolve
//! - **Auto-injection** - write-once [`Injected`] fields filled by the container
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use minjection::{Container, Lifetime, Registration};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let container = Container::new();
//! container.register_instance(Config { url: "postgres://localhost".into() });
//! container
//!     .register(
//!         Registration::for_type::<Database>()
//!             .factory(|container, _| {
//!                 let config = container.resolve_type::<Config>()?;
//!                 Ok(Database { url: config.url.clone() })
//!             })
//!             .lifetime(Lifetime::Static),
//!     )
//!     .unwrap();
//!
//! let db = container.resolve_type::<Database>().unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```
//!
//! ## Interfaces
//!
//! An interface is either a trait object or a marker tag naming a value type.
//!
//! ```rust
//! use minjection::{Container, interface, provides};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! interface!(dyn Greeter);
//! provides!(English => dyn Greeter);
//!
//! struct Title;
//! interface!(Title => String);
//!
//! let container = Container::new();
//! container.register_interface_constructor::<dyn Greeter, _, _>(|| English);
//! container.register_interface_instance::<Title, _>("Inbox".to_string());
//!
//! assert_eq!(container.resolve_interface::<dyn Greeter>().unwrap().greet(), "hello");
//! assert_eq!(*container.resolve_interface::<Title>().unwrap(), "Inbox");
//! ```
//!
//! ## Lifetimes
//!
//! - [`Lifetime::Instance`] - a new instance on every request (the default)
//! - [`Lifetime::Cycle`] - one instance per top-level call, shared by everything that call resolves
//! - [`Lifetime::Static`] - created once, on first request, and kept by the container
//!
//! Stored instances ignore lifetimes: the same value is returned every time.

// Generated code names `::minjection`; make that path resolve inside this crate too.
extern crate self as minjection;

mod container;
mod context;
mod error;
mod factory;
mod inject;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registration;
mod storage;

pub use container::*;
pub use context::*;
pub use error::*;
pub use factory::{Dependencies, Instance};
pub use inject::*;
pub use provider::*;
pub use registration::Registration;

#[cfg(feature = "derive")]
pub use minjection_derive::Inject;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Container, Dependencies, DiError, Inject, Injected, Injector, Interface, Lifetime, Provides,
        Registration, ResolutionContext, Result, ServiceId,
    };
    pub use crate::{interface, provides};
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Greeter;
    interface!(Greeter => String);

    struct Logger {
        lines: std::sync::Mutex<Vec<String>>,
    }

    #[derive(Default)]
    struct ViewController {
        title: Injected<String>,
        logger: Injected<Logger>,
        greeting: Injected<String>,
    }

    struct Title;
    interface!(Title => String);

    impl Inject for ViewController {
        fn inject(&self, injector: &mut Injector<'_>) -> Result<()> {
            injector.interface::<Title>("title", &self.title)?;
            injector.field("logger", &self.logger)?;
            injector.interface::<Greeter>("greeting", &self.greeting)
        }
    }

    #[test]
    fn test_greeter_instance_lifetime_counts_up() {
        let counter = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        let seen = Arc::clone(&counter);
        container
            .register(
                Registration::for_interface::<Greeter>()
                    .factory(move |_, _| Ok(format!("hi-{}", seen.fetch_add(1, Ordering::SeqCst))))
                    .lifetime(Lifetime::Instance),
            )
            .unwrap();

        let greetings: Vec<String> = (0..3)
            .map(|_| String::clone(&container.resolve_interface::<Greeter>().unwrap()))
            .collect();
        assert_eq!(greetings, ["hi-0", "hi-1", "hi-2"]);
    }

    #[test]
    fn test_greeter_static_lifetime_constant() {
        let counter = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        let seen = Arc::clone(&counter);
        container
            .register(
                Registration::for_interface::<Greeter>()
                    .factory(move |_, _| Ok(format!("hi-{}", seen.fetch_add(1, Ordering::SeqCst))))
                    .lifetime(Lifetime::Static),
            )
            .unwrap();

        for _ in 0..3 {
            assert_eq!(*container.resolve_interface::<Greeter>().unwrap(), "hi-0");
        }
    }

    #[test]
    fn test_view_controller_injection() {
        let container = Container::new();
        container.register_interface_instance::<Title, _>("Inbox".to_string());
        container.register_constructor(|| Logger {
            lines: std::sync::Mutex::new(Vec::new()),
        });

        let controller = ViewController::default();
        container.inject_properties(&controller).unwrap();

        assert_eq!(controller.title.get().unwrap().as_str(), "Inbox");
        assert!(controller.logger.get().unwrap().lines.lock().unwrap().is_empty());
        // Greeter is unregistered, so the field stays empty
        assert!(!controller.greeting.is_set());
    }

    #[test]
    fn test_inject_properties_never_overwrites() {
        let container = Container::new();
        container.register_interface_instance::<Title, _>("Inbox".to_string());

        let controller = ViewController {
            title: Injected::with(Arc::new("Drafts".to_string())),
            ..ViewController::default()
        };
        container.inject_properties(&controller).unwrap();

        assert_eq!(controller.title.get().unwrap().as_str(), "Drafts");
    }

    #[test]
    fn test_prelude_exports() {
        use crate::prelude::*;

        let container = Container::new();
        assert!(container.is_empty());
        assert!(!container.can_resolve(&ServiceId::of_interface::<Title>()));
    }
}
