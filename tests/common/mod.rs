//! Shared helpers for integration tests

#![allow(dead_code)]

use seqd::{DialogPolicy, Interpreter, InterpreterConfig, SimStation};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Tracing layer that keeps every event for later assertions.
///
/// Installed per thread, so tests using it must run on the current-thread
/// runtime (the `#[tokio::test]` default).
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let guard = tracing::subscriber::set_default(Registry::default().with(capture.clone()));
        (capture, guard)
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

/// Instant simulated station whose YES_NO dialogs get `answer`
pub fn station(answer: DialogPolicy) -> SimStation {
    let mut config = seqd::SimulationConfig {
        dialog: answer,
        slide_travel_ms: 0,
        laser_settle_ms: 0,
        ..Default::default()
    };
    for motion in &mut config.motion {
        motion.travel_ms = 0;
    }
    SimStation::new(&config)
}

pub fn interpreter(station: &SimStation) -> Interpreter {
    Interpreter::new(station.collaborators(), &InterpreterConfig { settle_delay_ms: 0 })
}
