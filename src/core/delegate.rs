//! The contract for caller-supplied unit logic.
//!
//! A [`Delegate`] holds what a unit actually does. Every method has a default,
//! so an empty `impl Delegate for MyType {}` is a valid asynchronous
//! pass-through. The unit owns everything else (identity, mode, dispatch and
//! descriptors), so a delegate can never shadow core behaviour.

use std::any::Any;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::carrier::{Carrier, FieldValue};
use crate::core::error::BoxError;
use crate::core::unit::Unit;

/// Model name reported by delegates that do not name themselves.
pub const DEFAULT_MODEL: &str = "Unnamed Model";

/// Caller-defined input/output description, opaque to the unit.
pub type Descriptor = FieldValue;

/// A helper trait that just provides the `as_any` method.
/// Needed to reach a delegate's own helper methods through a unit.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A sample invocation published by a delegate for documentation tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub title: String,
    pub input: Carrier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Carrier>,
}

/// Defines the behaviour of a processing unit.
///
/// Every method receives the [`Unit`] it is bound to, which is how delegate
/// code reads the unit's options, id or name.
///
/// Which processing method is called depends on the unit's mode, fixed at
/// construction from [`is_sync`](Delegate::is_sync) and
/// [`is_filter`](Delegate::is_filter):
/// - filter units call [`filter`](Delegate::filter)
/// - sync units call [`process_sync`](Delegate::process_sync)
/// - async units call [`process`](Delegate::process)
#[async_trait]
pub trait Delegate: AsAny + Send + Sync + 'static {
    /// The model name shared by every unit built from this delegate.
    fn model(&self) -> String {
        DEFAULT_MODEL.to_string()
    }

    /// Whether units run synchronously. Ignored when [`is_filter`](Delegate::is_filter) is true.
    fn is_sync(&self) -> bool {
        false
    }

    /// Whether units act as boolean filters. Filters always run synchronously.
    fn is_filter(&self) -> bool {
        false
    }

    /// Called once per unit during construction. Errors are logged and swallowed.
    fn init_unit(&self, _unit: &Unit) -> Result<(), BoxError> {
        Ok(())
    }

    /// Decide whether the carrier passes. Lets everything through by default.
    fn filter(&self, _unit: &Unit, _carrier: &Carrier) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// Process the carrier and hand it back directly.
    fn process_sync(&self, _unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
        Ok(carrier)
    }

    /// Process the carrier asynchronously. Falls back to [`process_sync`](Delegate::process_sync).
    async fn process(&self, unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
        self.process_sync(unit, carrier)
    }

    fn input(&self) -> Option<Descriptor> {
        None
    }

    fn output(&self) -> Option<Descriptor> {
        None
    }

    fn examples(&self) -> Vec<Example> {
        Vec::new()
    }
}

/// The delegate used when a unit type is created without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Delegate for PassThrough {
    fn model(&self) -> String {
        "PassThroughUnit".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::factory::{UnitFactory, UnitOptions};
    use serde_json::json;

    struct Bare;
    impl Delegate for Bare {}

    struct Documented;
    impl Delegate for Documented {
        fn input(&self) -> Option<Descriptor> {
            Some(json!({ "a": "number", "b": "number" }))
        }

        fn examples(&self) -> Vec<Example> {
            vec![Example {
                title: "adds".to_string(),
                input: Carrier::new().set("a", 1).set("b", 2),
                output: None,
            }]
        }
    }

    #[test]
    fn test_bare_delegate_defaults() {
        let d = Bare;
        assert_eq!(d.model(), DEFAULT_MODEL);
        assert!(!d.is_sync());
        assert!(!d.is_filter());
        assert!(d.input().is_none());
        assert!(d.output().is_none());
        assert!(d.examples().is_empty());
    }

    #[test]
    fn test_default_processing_is_identity() {
        let unit = UnitFactory::default()
            .create_unit(Bare)
            .instantiate(UnitOptions::default());
        let carrier = Carrier::new().set("x", 7);

        assert!(Bare.filter(&unit, &carrier).unwrap());
        assert_eq!(Bare.process_sync(&unit, carrier.clone()).unwrap(), carrier);
    }

    #[tokio::test]
    async fn test_default_async_process_falls_back_to_sync() {
        struct Doubler;
        impl Delegate for Doubler {
            fn process_sync(&self, _unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
                let v = carrier.get("v").and_then(FieldValue::as_i64).unwrap_or(0);
                Ok(carrier.set("v", v * 2))
            }
        }

        let unit = UnitFactory::default()
            .create_unit(Doubler)
            .instantiate(UnitOptions::default());
        let out = Doubler.process(&unit, Carrier::new().set("v", 4)).await.unwrap();
        assert_eq!(out.get("v"), Some(&json!(8)));
    }

    #[test]
    fn test_descriptors_and_examples() {
        let d = Documented;
        assert_eq!(d.input(), Some(json!({ "a": "number", "b": "number" })));
        assert_eq!(d.examples().len(), 1);
        assert_eq!(d.examples()[0].input.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_pass_through_names_itself() {
        assert_eq!(PassThrough.model(), "PassThroughUnit");
        assert!(!PassThrough.is_sync());
    }
}
