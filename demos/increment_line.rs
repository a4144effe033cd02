//! A small production line built from forgeline units.
//!
//! This example demonstrates:
//! - Writing a delegate and building several units from it
//! - Reading per-unit options from JSON
//! - Building units straight from closures
//! - Instrumenting every unit through a visitor registry
//! - Recording a structured trace of the whole run

use forgeline::prelude::*;
use forgeline::{MemoryTelemetry, SequentialNames, TraceVisitor};
use std::sync::Arc;

// ============================================================================
// Step 1: The Incrementing Station
// ============================================================================

/// Adds the unit's `step` option (default 1) to the carrier's `v` field.
struct Increment;

impl Delegate for Increment {
    fn model(&self) -> String {
        "Increment".to_string()
    }

    fn is_sync(&self) -> bool {
        true
    }

    fn init_unit(&self, unit: &Unit) -> Result<(), BoxError> {
        println!("[{}] ready, step = {}", unit.name(), step_of(unit));
        Ok(())
    }

    fn process_sync(&self, unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
        let v = carrier.get("v").and_then(FieldValue::as_i64).unwrap_or(0);
        Ok(carrier.set("v", v + step_of(unit)))
    }
}

fn step_of(unit: &Unit) -> i64 {
    unit.param("step").and_then(FieldValue::as_i64).unwrap_or(1)
}

// ============================================================================
// Step 2: A Visitor Pausing Frozen Carriers
// ============================================================================

/// Carriers marked `frozen` pass every station untouched.
struct Freezer;

impl Visitor for Freezer {
    fn will_process(&self, _unit: &Unit, carrier: &Carrier) -> bool {
        carrier.contains("frozen")
    }
}

// ============================================================================
// Step 3: Running The Line
// ============================================================================

async fn run_line(line: &[Unit], gate: &Unit, carrier: Carrier) -> Result<(), TaggedError> {
    let mut carrier = carrier;
    for unit in line {
        carrier = unit.process(carrier).await?.into_carrier();
        let v = carrier.get("v").cloned().unwrap_or_default();
        println!("  after {:<8} v = {}", unit.name(), v);
    }

    let outcome = gate.process(carrier).await?;
    println!("  gate says: {}", if outcome.passed() { "ship it" } else { "send back" });
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Forgeline Increment Line Example ===\n");

    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut registry = VisitorRegistry::builder();
    registry
        .register(Freezer)
        .register(TraceVisitor::new(telemetry.clone()));
    let factory = UnitFactory::new(registry.build(), Arc::new(SequentialNames::new("station")));

    let increment = factory.create_unit(Increment);
    let mut line = Vec::new();
    for (i, step) in [1, 1, 2, 3, 5].into_iter().enumerate() {
        let options = UnitOptions::from_json(serde_json::json!({
            "name": format!("inc-{}", i),
            "step": step,
        }))?;
        line.push(increment.instantiate(options));
    }

    let gate = factory.from_predicate(
        |unit: &Unit, carrier: &Carrier| {
            let min = unit.param("min").and_then(FieldValue::as_i64).unwrap_or(0);
            Ok(carrier.get("v").and_then(FieldValue::as_i64).unwrap_or(0) >= min)
        },
        FnConfig::default()
            .with_model("Gate")
            .with_options(UnitOptions::default().with_name("gate").with_param("min", 10)),
    );

    println!("\n--- Run 1: an empty carrier ---");
    run_line(&line, &gate, Carrier::new()).await?;

    println!("\n--- Run 2: a frozen carrier ---");
    run_line(&line, &gate, Carrier::new().set("frozen", true)).await?;

    println!("\nTrace:");
    for entry in telemetry.traces() {
        println!(
            "  {:?} {:<8} skipped={} pass={:?}",
            entry.stage, entry.unit_name, entry.skipped, entry.pass
        );
    }

    println!("\n=== Line finished! ===");
    Ok(())
}
