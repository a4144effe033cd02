//! # Forgeline
//!
//! Pluggable processing units for dataflow pipelines.
//!
//! A unit wraps caller-supplied logic (a [`Delegate`]) behind one uniform
//! object: an id, a model name, a fixed execution mode and a single dispatch
//! entry point. Every lifecycle event is reported to the [`Visitor`]s of the
//! registry the unit was built from, which can observe it, skip the delegate,
//! or veto a filter pass, all without touching delegate code.
//!
//! ## Features
//!
//! - **Three modes, one contract**: async process, sync process and sync filter units
//!   all dispatch through [`Unit::process`]
//! - **Uniform failures**: delegate errors and panics surface as a [`TaggedError`]
//!   carrying the carrier that was in flight
//! - **Instrumentation without edits**: visitors see every init and dispatch, in
//!   registration order
//! - **Telemetry** (feature `telemetry`, on by default): structured trace recording
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forgeline::prelude::*;
//!
//! struct Weighted;
//!
//! #[async_trait::async_trait]
//! impl Delegate for Weighted {
//!     async fn process(&self, unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
//!         let a = carrier.get("a").and_then(FieldValue::as_i64).unwrap_or(0);
//!         let b = carrier.get("b").and_then(FieldValue::as_i64).unwrap_or(0);
//!         let k = unit.param("k").and_then(FieldValue::as_i64).unwrap_or(1);
//!         Ok(carrier.set("c", a + b * k))
//!     }
//! }
//!
//! # async fn run() -> Result<(), TaggedError> {
//! let unit = UnitFactory::default()
//!     .create_unit(Weighted)
//!     .instantiate(UnitOptions::default().with_param("k", 10));
//!
//! let outcome = unit.process(Carrier::new().set("a", 1).set("b", 2)).await?;
//! assert_eq!(outcome.carrier().get("c"), Some(&FieldValue::from(21)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`delegate`]: the contract for unit logic
//! - [`factory`]: unit types, options and identity
//! - [`unit`]: the unit instance and its dispatch flows
//! - [`visitor`]: visitors, extensions and the registry
//! - [`builders`]: units straight from closures
//! - [`telemetry`]: ready-made visitors
//! - [`prelude`]: Commonly used types and traits (import with `use forgeline::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub use core::{builders, carrier, delegate, error, factory, telemetry, unit, visitor};

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use core::builders::FnConfig;
pub use core::carrier::{Carrier, FieldValue};
pub use core::delegate::{AsAny, DEFAULT_MODEL, Delegate, Descriptor, Example, PassThrough};
pub use core::error::{
    BoxError, CarrierError, DelegatePanic, PROCESSING_FAILURE, TaggedError, UnitError,
};
pub use core::factory::{
    NameGenerator, SequentialNames, UnitFactory, UnitOptions, UnitType, UuidNames,
};
pub use core::telemetry::LogVisitor;
#[cfg(feature = "telemetry")]
pub use core::telemetry::{MemoryTelemetry, Stage, Telemetry, TraceEntry, TraceVisitor};
pub use core::unit::{Mode, Outcome, Unit};
pub use core::visitor::{Extension, ProcessEvent, RegistryBuilder, Visitor, VisitorRegistry};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything needed to write delegates and visitors.
///
/// # Example
/// ```rust
/// use forgeline::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Errors
        BoxError,
        // Data
        Carrier,
        // Delegates
        Delegate,
        Extension,
        FieldValue,
        FnConfig,
        Mode,
        Outcome,
        ProcessEvent,
        TaggedError,
        // Units
        Unit,
        UnitError,
        UnitFactory,
        UnitOptions,
        UnitType,
        // Visitors
        Visitor,
        VisitorRegistry,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
