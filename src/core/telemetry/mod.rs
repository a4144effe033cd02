//! Ready-made visitors for watching units at work.
//!
//! - [`LogVisitor`] writes every lifecycle event to the `log` facade.
//! - [`TraceVisitor`] (feature `telemetry`) records structured
//!   [`TraceEntry`] values into a [`Telemetry`] sink such as [`MemoryTelemetry`].
//!
//! Neither ever skips a delegate or vetoes a filter.

#[cfg(feature = "telemetry")]
pub mod trace;

#[cfg(feature = "telemetry")]
pub use trace::{MemoryTelemetry, Stage, Telemetry, TraceEntry, TraceVisitor};

use crate::core::carrier::Carrier;
use crate::core::unit::Unit;
use crate::core::visitor::{ProcessEvent, Visitor};

/// Logs unit lifecycle events at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LogVisitor {
    level: log::Level,
}

impl Default for LogVisitor {
    fn default() -> Self {
        LogVisitor {
            level: log::Level::Debug,
        }
    }
}

impl LogVisitor {
    pub fn new(level: log::Level) -> Self {
        LogVisitor { level }
    }

    pub fn level(&self) -> log::Level {
        self.level
    }
}

impl Visitor for LogVisitor {
    fn did_init(&self, unit: &Unit) {
        log::log!(
            self.level,
            "unit {} [{}] initialised: model={} mode={}",
            unit.name(),
            unit.id(),
            unit.model(),
            unit.mode()
        );
    }

    fn will_process(&self, unit: &Unit, carrier: &Carrier) -> bool {
        log::log!(
            self.level,
            "unit {} [{}] processing carrier with {} field(s)",
            unit.name(),
            unit.id(),
            carrier.len()
        );
        false
    }

    fn did_process(&self, unit: &Unit, event: &ProcessEvent<'_>) -> Option<bool> {
        let (name, id) = (unit.name(), unit.id());
        match (event.error, event.skipped) {
            (Some(e), _) => log::log!(self.level, "unit {} [{}] failed: {}", name, id, e),
            (None, true) => log::log!(self.level, "unit {} [{}] skipped", name, id),
            (None, false) => match event.pass {
                Some(pass) => {
                    log::log!(self.level, "unit {} [{}] filtered: pass={}", name, id, pass)
                }
                None => log::log!(self.level, "unit {} [{}] processed", name, id),
            },
        }
        None
    }
}
