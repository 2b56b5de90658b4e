//! A view controller wired by auto-injection
//!
//! Run with:
//!   cargo run --example view_controller --features derive

use minjection::{Container, Inject, Injected, Lifetime, Registration, Result, interface, provides};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// Interface tags naming string values
struct Title;
interface!(Title => String);

struct Subtitle;
interface!(Subtitle => String);

// A trait-object interface
trait Analytics: Send + Sync {
    fn track(&self, event: &str);
}

struct ConsoleAnalytics {
    sent: AtomicU32,
}

impl Analytics for ConsoleAnalytics {
    fn track(&self, event: &str) {
        let n = self.sent.fetch_add(1, Ordering::SeqCst);
        println!("  [analytics #{n}] {event}");
    }
}

interface!(dyn Analytics);
provides!(ConsoleAnalytics => dyn Analytics);

#[derive(Default, Inject)]
struct ViewController {
    #[inject(interface = Title)]
    title: Injected<String>,
    #[inject(interface = Subtitle)]
    subtitle: Injected<String>,
    #[inject(interface = dyn Analytics)]
    analytics: Injected<dyn Analytics>,
}

impl ViewController {
    fn view_did_load(&self) {
        let title = self.title.get().map(|t| t.as_str()).unwrap_or("(untitled)");
        let subtitle = self.subtitle.get().map(|s| s.as_str()).unwrap_or("(none)");
        println!("  Loaded \"{title}\" / \"{subtitle}\"");

        if let Some(analytics) = self.analytics.get() {
            analytics.track("view_did_load");
        }
    }
}

fn main() -> Result<()> {
    let container = Container::new();

    container.register_interface_instance::<Title, _>("Inbox".to_string());

    let unread = Arc::new(AtomicU32::new(3));
    let counter = Arc::clone(&unread);
    container.register(
        Registration::for_interface::<Subtitle>()
            .factory(move |_, _| Ok(format!("{} unread", counter.load(Ordering::SeqCst)))),
    )?;

    container.register(
        Registration::for_interface::<dyn Analytics>()
            .constructor(|| ConsoleAnalytics {
                sent: AtomicU32::new(0),
            })
            .lifetime(Lifetime::Static),
    )?;

    container.register(
        Registration::for_type::<ViewController>()
            .constructor(ViewController::default)
            .inject_properties()
            .after_inject_method(ViewController::view_did_load),
    )?;

    println!("=== Resolved through the container ===");
    let first = container.resolve_type::<ViewController>()?;

    unread.store(5, Ordering::SeqCst);
    let second = container.resolve_type::<ViewController>()?;
    assert!(!Arc::ptr_eq(&first, &second));

    println!("\n=== Built by hand, then injected ===");
    let manual = ViewController {
        title: Injected::with(Arc::new("Drafts".to_string())),
        ..ViewController::default()
    };
    container.inject_properties(&manual)?;
    manual.view_did_load();

    Ok(())
}
