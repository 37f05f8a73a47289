//! Notification center demo.
//!
//! A "component" scope owns an event hub with three channels: toasts kept on
//! a bounded stack, document saves and a logout signal. A status line effect
//! re-renders from the hub's store whenever a toast arrives.
//!
//! Run with `RUST_LOG=hubbub_core=trace` to watch the hub forward emissions.

use hubbub::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
enum Level {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
struct Toast {
    level: Level,
    text: String,
}

impl Toast {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }
}

#[derive(ChannelSet)]
struct Notifications {
    toasts: EventStack<Toast>,
    saved: EventBus<u64>,
    logout: EventBus,
}

fn main() -> hubbub::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let component = Scope::new();

    let hub = component.run(|| {
        let hub = EventHub::from_factory(|cx| Notifications {
            toasts: cx.stack_with(StackOptions { length: Some(3) }),
            saved: cx.bus(),
            logout: cx.bus(),
        });

        hub.listen(|event| info!(channel = event.name, "event"));

        let toasts = hub.toasts.clone();
        Effect::new(move || {
            let stack = toasts.value();
            let warnings = stack.iter().filter(|t| t.level == Level::Warning).count();
            info!(shown = stack.len(), warnings, "status line");
        });

        let toasts = hub.toasts.clone();
        hub.saved
            .listen(move |id| toasts.emit(Toast::info(format!("document {id} saved"))));

        hub
    });

    hub.emit("saved", 41u64)?;
    hub.saved.emit(42);
    hub.toasts.emit(Toast::warning("disk almost full"));
    hub.emit("toasts", Toast::info("synced"))?;

    if let Some(stack) = hub.store().get::<Vec<Toast>>("toasts") {
        for toast in &stack {
            info!(level = ?toast.level, text = %toast.text, "visible toast");
        }
    }

    if let Err(err) = hub.emit("toast", Toast::info("typo")) {
        info!(%err, "rejected");
    }

    hub.logout.emit(());
    component.dispose();
    info!(disposed = hub.is_disposed(), "component unmounted");

    Ok(())
}
