//! Tests for #[derive(Inject)]

use minjection::{Container, Inject, Injected, Lifetime, Registration, interface, provides};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Database {
    url: String,
}

struct Title;
interface!(Title => String);

struct Subtitle;
interface!(Subtitle => String);

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct FixedClock;
impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

interface!(dyn Clock);
provides!(FixedClock => dyn Clock);

#[derive(Default, Inject)]
struct ViewController {
    db: Injected<Database>,
    #[inject(interface = Title)]
    title: Injected<String>,
    #[inject(interface = Subtitle)]
    subtitle: Injected<String>,
    #[inject(skip)]
    skipped: Injected<Database>,
    #[inject(interface = dyn Clock)]
    clock: Injected<dyn Clock>,
    taps: u64,
}

#[derive(Inject)]
struct Empty {
    #[allow(dead_code)]
    count: u32,
}

#[derive(Default, Inject)]
struct Node {
    peer: Injected<Peer>,
}

#[derive(Default, Inject)]
struct Peer {
    node: Injected<Node>,
}

#[test]
fn test_derive_fills_registered_fields() {
    let container = Container::new();
    container.register_instance(Database { url: "db".into() });
    container.register_interface_instance::<Title, _>("Inbox".to_string());
    container.register_interface_constructor::<dyn Clock, _, _>(|| FixedClock);

    let controller = ViewController::default();
    container.inject_properties(&controller).unwrap();

    assert_eq!(controller.db.get().unwrap().url, "db");
    assert_eq!(controller.title.get().unwrap().as_str(), "Inbox");
    assert_eq!(controller.clock.get().unwrap().now(), 42);
    // Unregistered interface is left unset
    assert!(!controller.subtitle.is_set());
    // Skipped even though Database is registered
    assert!(!controller.skipped.is_set());
    assert_eq!(controller.taps, 0);
}

#[test]
fn test_derive_keeps_preset_fields() {
    let container = Container::new();
    container.register_interface_instance::<Title, _>("Inbox".to_string());
    container.register_interface_instance::<Subtitle, _>("3 unread".to_string());

    let controller = ViewController {
        title: Injected::with(Arc::new("Drafts".to_string())),
        ..ViewController::default()
    };
    container.inject_properties(&controller).unwrap();

    assert_eq!(controller.title.get().unwrap().as_str(), "Drafts");
    assert_eq!(controller.subtitle.get().unwrap().as_str(), "3 unread");
}

#[test]
fn test_derive_without_injected_fields() {
    let container = Container::new();
    container.inject_properties(&Empty { count: 1 }).unwrap();
}

#[test]
fn test_derive_registration_with_cycle_lifetime() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = Container::new();

    let seen = Arc::clone(&created);
    container
        .register(
            Registration::for_type::<Node>()
                .constructor(move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Node::default()
                })
                .lifetime(Lifetime::Cycle)
                .inject_properties(),
        )
        .unwrap();
    container
        .register(
            Registration::for_type::<Peer>()
                .constructor(Peer::default)
                .lifetime(Lifetime::Cycle)
                .inject_properties(),
        )
        .unwrap();

    let node = container.resolve_type::<Node>().unwrap();
    let peer = node.peer.get().unwrap();

    assert!(Arc::ptr_eq(&node, peer.node.get().unwrap()));
    assert_eq!(created.load(Ordering::SeqCst), 1);
}
