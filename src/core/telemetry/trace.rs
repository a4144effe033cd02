use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::carrier::Carrier;
use crate::core::unit::{Mode, Unit};
use crate::core::visitor::{ProcessEvent, Visitor};

/// Which lifecycle transition a trace entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Process,
}

/// A single entry in the execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub unit_id: String,
    pub unit_name: String,
    pub model: String,
    pub mode: Mode,
    pub stage: Stage,
    pub skipped: bool,
    pub error: Option<String>,
    pub pass: Option<bool>,
    /// Snapshot of the carrier, when the visitor was asked to keep one.
    pub carrier: Option<Carrier>,
}

impl TraceEntry {
    fn for_unit(unit: &Unit, stage: Stage) -> Self {
        TraceEntry {
            timestamp: Utc::now(),
            unit_id: unit.id().to_string(),
            unit_name: unit.name().to_string(),
            model: unit.model().to_string(),
            mode: unit.mode(),
            stage,
            skipped: false,
            error: None,
            pass: None,
            carrier: None,
        }
    }
}

/// Trait for recording execution traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<TraceEntry> {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

/// Feeds a [`TraceEntry`] for every init and dispatch into a telemetry sink.
pub struct TraceVisitor<T: Telemetry> {
    sink: Arc<T>,
    capture_carrier: bool,
}

impl<T: Telemetry> TraceVisitor<T> {
    pub fn new(sink: Arc<T>) -> Self {
        TraceVisitor {
            sink,
            capture_carrier: false,
        }
    }

    /// Also store a copy of the carrier in every process entry.
    pub fn capturing_carriers(mut self) -> Self {
        self.capture_carrier = true;
        self
    }

    pub fn sink(&self) -> &Arc<T> {
        &self.sink
    }
}

impl<T: Telemetry> Visitor for TraceVisitor<T> {
    fn did_init(&self, unit: &Unit) {
        self.sink.record(TraceEntry::for_unit(unit, Stage::Init));
    }

    fn did_process(&self, unit: &Unit, event: &ProcessEvent<'_>) -> Option<bool> {
        let mut entry = TraceEntry::for_unit(unit, Stage::Process);
        entry.skipped = event.skipped;
        entry.error = event.error.map(|e| e.to_string());
        entry.pass = event.pass;
        if self.capture_carrier {
            entry.carrier = Some(event.carrier.clone());
        }
        self.sink.record(entry);
        None
    }
}
