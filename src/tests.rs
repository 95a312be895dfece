//! Helpers shared by the unit tests.

use {
    crate::Entity,
    parking_lot::Mutex,
    std::{
        fmt::Debug,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
    },
    tracing::{
        Dispatch, Event, Level, Subscriber,
        field::{Field, Visit},
    },
    tracing_subscriber::{
        layer::{Context, Layer, SubscriberExt},
        registry,
    },
};

/// An entity with a counter that loses updates unless increments are serialized.
#[derive(Debug)]
pub(crate) struct Counter<I> {
    id: I,
    value: AtomicU32,
}

impl<I> Counter<I> {
    pub(crate) fn new(id: I) -> Self {
        Self {
            id,
            value: AtomicU32::new(0),
        }
    }

    pub(crate) fn inc(&self) {
        // Deliberately not a fetch_add.
        let v = self.value.load(Relaxed);
        std::thread::yield_now();
        self.value.store(v + 1, Relaxed);
    }

    pub(crate) fn get(&self) -> u32 {
        self.value.load(Relaxed)
    }
}

impl<I> Entity for Counter<I> {
    type Id = I;

    fn id(&self) -> &I {
        &self.id
    }
}

/// Records the message of every error event.
#[derive(Clone, Default)]
pub(crate) struct ErrorLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    /// Returns a dispatcher that feeds this log. It must be installed in every thread
    /// whose events should be captured.
    pub(crate) fn dispatch(&self) -> Dispatch {
        Dispatch::new(registry().with(self.clone()))
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl<S> Layer<S> for ErrorLog
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.messages.lock().push(visitor.0);
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
