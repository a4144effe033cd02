//! Instrumentation and interception of unit lifecycles.
//!
//! A [`Visitor`] observes every unit built from the registry it belongs to and
//! may intercept two decisions: skipping a delegate (`will_init`,
//! `will_process`) and vetoing a filter pass (`did_process`).
//!
//! Registration happens on a [`RegistryBuilder`]. Once
//! [`build`](RegistryBuilder::build) freezes it, the [`VisitorRegistry`] is
//! read-only and shared by every unit, so nothing can change membership or
//! order while dispatch is running. Visitors run in registration order.

use std::sync::Arc;

use crate::core::carrier::Carrier;
use crate::core::unit::Unit;

/// What a visitor sees once a unit finished (or skipped) processing a carrier.
#[derive(Debug, Clone, Copy)]
pub struct ProcessEvent<'a> {
    /// The carrier produced by the delegate, or the input carrier on skip or failure.
    pub carrier: &'a Carrier,
    /// The delegate failure, before it is wrapped into a tagged error.
    pub error: Option<&'a (dyn std::error::Error + Send + Sync + 'static)>,
    /// The pass value, for filter units only.
    pub pass: Option<bool>,
    /// True when a visitor asked for the delegate to be skipped.
    pub skipped: bool,
}

/// Observes and optionally intercepts unit lifecycle events.
///
/// All methods are optional.
pub trait Visitor: Send + Sync {
    /// Whether this visitor wants to hear about `unit` (and `carrier`, during dispatch).
    fn accept(&self, _unit: &Unit, _carrier: Option<&Carrier>) -> bool {
        true
    }

    /// Return true to skip the delegate's `init_unit`.
    fn will_init(&self, _unit: &Unit) -> bool {
        false
    }

    /// Called after the init sequence, whether init ran, was skipped, or failed.
    fn did_init(&self, _unit: &Unit) {}

    /// Return true to skip the delegate for this carrier.
    fn will_process(&self, _unit: &Unit, _carrier: &Carrier) -> bool {
        false
    }

    /// Called exactly once per dispatch. Returning `Some(false)` on a filter
    /// unit forces the carrier to fail; any other answer leaves the result alone.
    fn did_process(&self, _unit: &Unit, _event: &ProcessEvent<'_>) -> Option<bool> {
        None
    }
}

/// Anything that can contribute visitors to a registry.
pub trait Extension {
    fn visitors(&self) -> Vec<Arc<dyn Visitor>>;
}

/// Collects visitors during setup. Append-only.
#[derive(Default)]
pub struct RegistryBuilder {
    visitors: Vec<Arc<dyn Visitor>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<V: Visitor + 'static>(&mut self, visitor: V) -> &mut Self {
        self.visitors.push(Arc::new(visitor));
        self
    }

    /// Registers a visitor the caller keeps a handle to.
    pub fn register_shared(&mut self, visitor: Arc<dyn Visitor>) -> &mut Self {
        self.visitors.push(visitor);
        self
    }

    /// Appends every visitor supplied by `source`, in the order it lists them.
    pub fn extend(&mut self, source: &dyn Extension) -> &mut Self {
        self.visitors.extend(source.visitors());
        self
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }

    /// Freezes the registration phase.
    pub fn build(self) -> Arc<VisitorRegistry> {
        log::debug!("Visitor registry frozen with {} visitor(s)", self.visitors.len());
        Arc::new(VisitorRegistry {
            visitors: self.visitors,
        })
    }
}

/// The frozen, ordered list of visitors consulted at every lifecycle transition.
#[derive(Default)]
pub struct VisitorRegistry {
    visitors: Vec<Arc<dyn Visitor>>,
}

impl VisitorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry with no visitors. Every hook loop becomes a no-op.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }

    fn accepting<'a>(
        &'a self,
        unit: &'a Unit,
        carrier: Option<&'a Carrier>,
    ) -> impl Iterator<Item = &'a (dyn Visitor + 'static)> + 'a {
        self.visitors
            .iter()
            .map(|v| &**v)
            .filter(move |v| v.accept(unit, carrier))
    }

    /// Asks every accepting visitor; true if any of them wants init skipped.
    pub(crate) fn will_init(&self, unit: &Unit) -> bool {
        self.accepting(unit, None)
            .fold(false, |skip, v| v.will_init(unit) || skip)
    }

    pub(crate) fn did_init(&self, unit: &Unit) {
        for v in self.accepting(unit, None) {
            v.did_init(unit);
        }
    }

    /// Settles which visitors watch one dispatch of `carrier`.
    ///
    /// `accept` is asked once, against the input carrier, and both process
    /// hooks go to the same visitors even if the delegate rewrites the fields
    /// `accept` looked at.
    pub(crate) fn dispatch<'a>(&'a self, unit: &Unit, carrier: &Carrier) -> Dispatch<'a> {
        let visitors = self
            .visitors
            .iter()
            .map(|v| &**v)
            .filter(|v| v.accept(unit, Some(carrier)))
            .collect();
        Dispatch { visitors }
    }
}

/// The visitors accepting a single dispatch.
pub(crate) struct Dispatch<'a> {
    visitors: Vec<&'a (dyn Visitor + 'static)>,
}

impl Dispatch<'_> {
    /// Asks every visitor; true if any of them wants the delegate skipped.
    pub(crate) fn will_process(&self, unit: &Unit, carrier: &Carrier) -> bool {
        self.visitors
            .iter()
            .fold(false, |skip, v| v.will_process(unit, carrier) || skip)
    }

    /// Notifies every visitor; true if any of them vetoed.
    pub(crate) fn did_process(&self, unit: &Unit, event: &ProcessEvent<'_>) -> bool {
        self.visitors
            .iter()
            .fold(false, |veto, v| v.did_process(unit, event) == Some(false) || veto)
    }
}
