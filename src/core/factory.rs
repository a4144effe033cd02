use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::carrier::FieldValue;
use crate::core::delegate::{Delegate, Descriptor, Example, PassThrough};
use crate::core::unit::{Mode, Unit};
use crate::core::visitor::VisitorRegistry;

/// Configuration handed to a unit at construction and kept verbatim.
///
/// `name` and `comment` are read by the unit itself; everything else lands in
/// `params` for the delegate to read through [`Unit::param`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub params: HashMap<String, FieldValue>,
}

impl UnitOptions {
    /// Reads options from a JSON object such as `{"name": "adder", "k": 10}`.
    pub fn from_json(value: FieldValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let key = key.into();
        if self.params.contains_key(&key) {
            log::warn!("Option {} was already set, overwriting it.", &key);
        }
        self.params.insert(key, value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&FieldValue> {
        self.params.get(key)
    }
}

/// Hands out unit ids. Ids must never repeat within a process.
pub trait NameGenerator: Send + Sync {
    fn next_name(&self) -> String;
}

/// Random v4 uuids; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidNames;

impl NameGenerator for UuidNames {
    fn next_name(&self) -> String {
        format!("unit-{}", uuid::Uuid::new_v4().simple())
    }
}

/// `prefix-0`, `prefix-1`, ... Handy when ids need to be predictable.
#[derive(Debug)]
pub struct SequentialNames {
    prefix: String,
    next: AtomicU64,
}

impl SequentialNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialNames {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl NameGenerator for SequentialNames {
    fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Turns delegates into unit types.
///
/// Every unit type created here shares the factory's visitor registry and
/// name generator.
#[derive(Clone)]
pub struct UnitFactory {
    registry: Arc<VisitorRegistry>,
    names: Arc<dyn NameGenerator>,
}

impl Default for UnitFactory {
    /// No visitors, uuid names.
    fn default() -> Self {
        UnitFactory::new(VisitorRegistry::empty(), Arc::new(UuidNames))
    }
}

impl UnitFactory {
    pub fn new(registry: Arc<VisitorRegistry>, names: Arc<dyn NameGenerator>) -> Self {
        UnitFactory { registry, names }
    }

    /// A factory with uuid names and the given visitors.
    pub fn with_registry(registry: Arc<VisitorRegistry>) -> Self {
        UnitFactory::new(registry, Arc::new(UuidNames))
    }

    pub fn registry(&self) -> &Arc<VisitorRegistry> {
        &self.registry
    }

    pub fn create_unit<D: Delegate>(&self, delegate: D) -> UnitType {
        self.create_shared_unit(Arc::new(delegate))
    }

    /// Like [`create_unit`](Self::create_unit), for a delegate shared with other unit types.
    pub fn create_shared_unit(&self, delegate: Arc<dyn Delegate>) -> UnitType {
        UnitType {
            delegate,
            registry: self.registry.clone(),
            names: self.names.clone(),
        }
    }

    /// A unit type whose units hand every carrier straight back.
    pub fn create_default_unit(&self) -> UnitType {
        self.create_unit(PassThrough)
    }
}

/// A constructible kind of unit: one delegate plus the registry it reports to.
#[derive(Clone)]
pub struct UnitType {
    delegate: Arc<dyn Delegate>,
    registry: Arc<VisitorRegistry>,
    names: Arc<dyn NameGenerator>,
}

impl fmt::Debug for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitType")
            .field("model", &self.model())
            .field("mode", &self.mode())
            .field("visitors", &self.registry.len())
            .finish()
    }
}

impl UnitType {
    /// Builds a unit: assigns its id, binds the delegate, then runs the init sequence.
    pub fn instantiate(&self, options: UnitOptions) -> Unit {
        let id = self.names.next_name();
        let unit = Unit::bind(self.clone(), id, options);
        unit.run_init();
        log::debug!(
            "Created unit '{}' (model {}, {})",
            unit.name(),
            unit.model(),
            unit.mode()
        );
        unit
    }

    pub fn model(&self) -> String {
        self.delegate.model()
    }

    /// The mode every unit of this type will run in.
    pub fn mode(&self) -> Mode {
        Mode::resolve(self.delegate())
    }

    pub fn input(&self) -> Option<Descriptor> {
        self.delegate.input()
    }

    pub fn output(&self) -> Option<Descriptor> {
        self.delegate.output()
    }

    pub fn examples(&self) -> Vec<Example> {
        self.delegate.examples()
    }

    pub(crate) fn delegate(&self) -> &dyn Delegate {
        &*self.delegate
    }

    pub(crate) fn registry(&self) -> &VisitorRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::carrier::Carrier;
    use crate::core::delegate::DEFAULT_MODEL;
    use serde_json::json;
    use std::collections::HashSet;

    struct Sampled;

    impl Delegate for Sampled {
        fn model(&self) -> String {
            "Sampled".to_string()
        }

        fn is_sync(&self) -> bool {
            true
        }

        fn output(&self) -> Option<Descriptor> {
            Some(json!({ "c": "a + b * k" }))
        }

        fn examples(&self) -> Vec<Example> {
            vec![Example {
                title: "identity".to_string(),
                input: Carrier::new().set("a", 1),
                output: Some(Carrier::new().set("a", 1)),
            }]
        }
    }

    struct Anonymous;
    impl Delegate for Anonymous {}

    #[test]
    fn test_options_from_json_keeps_unknown_keys_as_params() {
        let options = UnitOptions::from_json(json!({
            "name": "adder",
            "comment": "adds things",
            "k": 10,
            "labels": ["x"]
        }))
        .unwrap();

        assert_eq!(options.name.as_deref(), Some("adder"));
        assert_eq!(options.comment.as_deref(), Some("adds things"));
        assert_eq!(options.param("k"), Some(&json!(10)));
        assert_eq!(options.param("labels"), Some(&json!(["x"])));
        assert!(options.param("name").is_none());
    }

    #[test]
    fn test_options_from_json_rejects_non_string_name() {
        assert!(UnitOptions::from_json(json!({ "name": 3 })).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = UnitOptions::default()
            .with_name("n")
            .with_param("k", 1)
            .with_param("k", 2);
        assert_eq!(options.param("k"), Some(&json!(2)));
        assert_eq!(options.name.as_deref(), Some("n"));
        assert!(options.comment.is_none());
    }

    #[test]
    fn test_sequential_names_never_repeat() {
        let names = SequentialNames::new("station");
        assert_eq!(names.next_name(), "station-0");
        assert_eq!(names.next_name(), "station-1");
    }

    #[test]
    fn test_uuid_names_are_unique() {
        let names = UuidNames;
        let ids: HashSet<String> = (0..100).map(|_| names.next_name()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("unit-")));
    }

    #[test]
    fn test_unit_type_describes_its_units_without_instantiating() {
        let unit_type = UnitFactory::default().create_unit(Sampled);
        assert_eq!(unit_type.model(), "Sampled");
        assert_eq!(unit_type.mode(), Mode::SyncProcess);
        assert!(unit_type.input().is_none());
        assert_eq!(unit_type.output(), Some(json!({ "c": "a + b * k" })));
        assert_eq!(unit_type.examples().len(), 1);

        let unit = unit_type.instantiate(UnitOptions::default());
        assert_eq!(unit.output(), unit_type.output());
        assert_eq!(unit.unit_type().model(), "Sampled");
    }

    #[test]
    fn test_units_of_one_type_share_model_and_mode() {
        let factory =
            UnitFactory::new(VisitorRegistry::empty(), Arc::new(SequentialNames::new("u")));
        let unit_type = factory.create_unit(Anonymous);
        let a = unit_type.instantiate(UnitOptions::default());
        let b = a.unit_type().instantiate(UnitOptions::default());

        assert_eq!(a.id(), "u-0");
        assert_eq!(b.id(), "u-1");
        assert_eq!(a.model(), DEFAULT_MODEL);
        assert_eq!(a.model(), b.model());
        assert_eq!(a.mode(), Mode::AsyncProcess);
        assert_eq!(a.mode(), b.mode());
    }

    #[test]
    fn test_shared_delegate_backs_several_unit_types() {
        let factory = UnitFactory::default();
        let delegate: Arc<dyn Delegate> = Arc::new(Sampled);
        let first = factory.create_shared_unit(delegate.clone());
        let second = factory.create_shared_unit(delegate.clone());

        assert_eq!(Arc::strong_count(&delegate), 3);
        assert_eq!(first.model(), second.model());
    }

    #[tokio::test]
    async fn test_default_unit_passes_carriers_through() {
        let unit = UnitFactory::default()
            .create_default_unit()
            .instantiate(UnitOptions::default());
        assert_eq!(unit.model(), "PassThroughUnit");
        assert_eq!(unit.mode(), Mode::AsyncProcess);

        let carrier = Carrier::new().set("x", 1);
        let outcome = unit.process(carrier.clone()).await.unwrap();
        assert_eq!(outcome.into_carrier(), carrier);
    }
}
