use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::core::carrier::{Carrier, FieldValue};
use crate::core::delegate::{Delegate, Descriptor, Example};
use crate::core::error::{BoxError, DelegatePanic, TaggedError, UnitError};
use crate::core::factory::{UnitOptions, UnitType};
use crate::core::visitor::{Dispatch, ProcessEvent};

/// How a unit runs, fixed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    AsyncProcess,
    SyncProcess,
    SyncFilter,
}

impl Mode {
    /// Reads the mode flags of a delegate. A filter is always synchronous.
    pub fn resolve(delegate: &dyn Delegate) -> Mode {
        if delegate.is_filter() {
            Mode::SyncFilter
        } else if delegate.is_sync() {
            Mode::SyncProcess
        } else {
            Mode::AsyncProcess
        }
    }

    pub fn is_sync(self) -> bool {
        !matches!(self, Mode::AsyncProcess)
    }

    pub fn is_filter(self) -> bool {
        matches!(self, Mode::SyncFilter)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::AsyncProcess => "async-process",
            Mode::SyncProcess => "sync-process",
            Mode::SyncFilter => "sync-filter",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A process unit handed back this carrier.
    Processed(Carrier),
    /// A filter unit judged the carrier, which is handed back untouched.
    Filtered { pass: bool, carrier: Carrier },
}

impl Outcome {
    pub fn carrier(&self) -> &Carrier {
        match self {
            Outcome::Processed(carrier) => carrier,
            Outcome::Filtered { carrier, .. } => carrier,
        }
    }

    pub fn into_carrier(self) -> Carrier {
        match self {
            Outcome::Processed(carrier) => carrier,
            Outcome::Filtered { carrier, .. } => carrier,
        }
    }

    /// False only when a filter rejected the carrier.
    pub fn passed(&self) -> bool {
        match self {
            Outcome::Processed(_) => true,
            Outcome::Filtered { pass, .. } => *pass,
        }
    }
}

/// A processing unit: a delegate bound to an identity, a mode and options,
/// with every dispatch instrumented by the visitor registry of its factory.
pub struct Unit {
    unit_type: UnitType,
    id: String,
    name: String,
    model: String,
    comment: String,
    mode: Mode,
    options: UnitOptions,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("mode", &self.mode)
            .field("comment", &self.comment)
            .field("options", &self.options)
            .finish()
    }
}

impl Unit {
    /// Binds the delegate of `unit_type`, resolving model, mode, name and comment.
    pub(crate) fn bind(unit_type: UnitType, id: String, options: UnitOptions) -> Unit {
        let delegate = unit_type.delegate();
        let model = delegate.model();
        let mode = Mode::resolve(delegate);
        let name = options.name.clone().unwrap_or_else(|| id.clone());
        let comment = options.comment.clone().unwrap_or_default();

        Unit {
            unit_type,
            id,
            name,
            model,
            comment,
            mode,
            options,
        }
    }

    /// Runs the init sequence. Delegate init failures never escape.
    pub(crate) fn run_init(&self) {
        let registry = self.unit_type.registry();

        if registry.will_init(self) {
            log::debug!("Init of unit '{}' skipped by a visitor", self.name);
        } else if let Err(e) = guard(|| self.delegate().init_unit(self)) {
            log::warn!(
                "Unit '{}' ({}) failed to initialise, continuing: {}",
                self.name,
                self.model,
                e
            );
        }

        registry.did_init(self);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_sync(&self) -> bool {
        self.mode.is_sync()
    }

    pub fn is_filter(&self) -> bool {
        self.mode.is_filter()
    }

    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    /// Shorthand for `self.options().param(key)`.
    pub fn param(&self, key: &str) -> Option<&FieldValue> {
        self.options.param(key)
    }

    /// The type this unit was instantiated from; use it to build siblings.
    pub fn unit_type(&self) -> &UnitType {
        &self.unit_type
    }

    /// The bound delegate as its concrete type, to reach its helper methods.
    pub fn delegate_as<T: Delegate>(&self) -> Option<&T> {
        self.delegate().as_any().downcast_ref::<T>()
    }

    pub fn input(&self) -> Option<Descriptor> {
        self.unit_type.input()
    }

    pub fn output(&self) -> Option<Descriptor> {
        self.unit_type.output()
    }

    pub fn examples(&self) -> Vec<Example> {
        self.unit_type.examples()
    }

    fn delegate(&self) -> &dyn Delegate {
        self.unit_type.delegate()
    }

    /// Dispatches one carrier through the unit.
    ///
    /// Synchronous units finish without ever suspending. The returned future
    /// resolves exactly once, whether the delegate succeeds, fails or panics.
    pub async fn process(&self, carrier: Carrier) -> Result<Outcome, TaggedError> {
        match self.mode {
            Mode::SyncFilter => {
                let pass = self.filter_flow(&carrier)?;
                Ok(Outcome::Filtered { pass, carrier })
            }
            Mode::SyncProcess => self.sync_flow(carrier).map(Outcome::Processed),
            Mode::AsyncProcess => self.async_flow(carrier).await.map(Outcome::Processed),
        }
    }

    /// Dispatches a synchronous unit without an executor.
    pub fn process_now(&self, carrier: Carrier) -> Result<Outcome, UnitError> {
        match self.mode {
            Mode::SyncFilter => {
                let pass = self.filter_flow(&carrier)?;
                Ok(Outcome::Filtered { pass, carrier })
            }
            Mode::SyncProcess => Ok(Outcome::Processed(self.sync_flow(carrier)?)),
            Mode::AsyncProcess => Err(self.mode_mismatch("process")),
        }
    }

    /// Uses a filter unit as a plain predicate.
    pub fn filter(&self, carrier: &Carrier) -> Result<bool, UnitError> {
        match self.mode {
            Mode::SyncFilter => Ok(self.filter_flow(carrier)?),
            Mode::SyncProcess | Mode::AsyncProcess => Err(self.mode_mismatch("filter")),
        }
    }

    fn filter_flow(&self, carrier: &Carrier) -> Result<bool, TaggedError> {
        let dispatch = self.unit_type.registry().dispatch(self, carrier);

        let skipped = dispatch.will_process(self, carrier);
        let verdict = if skipped {
            log::debug!("Filter unit '{}' skipped by a visitor", self.name);
            Ok(true)
        } else {
            guard(|| self.delegate().filter(self, carrier))
        };

        let (pass, error) = match verdict {
            Ok(pass) => (pass, None),
            Err(e) => (false, Some(e)),
        };

        // Visitors can turn a pass into a fail, never the other way round.
        let vetoed = dispatch.did_process(
            self,
            &ProcessEvent {
                carrier,
                error: error.as_deref(),
                pass: error.is_none().then_some(pass),
                skipped,
            },
        );

        if let Some(cause) = error {
            return Err(self.fail(cause, carrier.clone()));
        }
        if vetoed && pass {
            log::debug!("Filter unit '{}' pass vetoed by a visitor", self.name);
        }
        Ok(pass && !vetoed)
    }

    fn sync_flow(&self, carrier: Carrier) -> Result<Carrier, TaggedError> {
        let dispatch = self.unit_type.registry().dispatch(self, &carrier);
        if dispatch.will_process(self, &carrier) {
            return Ok(self.skip(&dispatch, carrier));
        }

        let payload = carrier.clone();
        let result = guard(|| self.delegate().process_sync(self, carrier));
        self.settle(&dispatch, result, payload)
    }

    async fn async_flow(&self, carrier: Carrier) -> Result<Carrier, TaggedError> {
        let dispatch = self.unit_type.registry().dispatch(self, &carrier);
        if dispatch.will_process(self, &carrier) {
            return Ok(self.skip(&dispatch, carrier));
        }

        let payload = carrier.clone();
        let delegate = self.delegate();
        // The call sits inside the guarded future so a panic raised before the
        // delegate's first await is caught too.
        let result = AssertUnwindSafe(async move { delegate.process(self, carrier).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|p| Err(Box::new(DelegatePanic::from_payload(p)) as BoxError));
        self.settle(&dispatch, result, payload)
    }

    fn skip(&self, dispatch: &Dispatch<'_>, carrier: Carrier) -> Carrier {
        log::debug!("Unit '{}' skipped by a visitor", self.name);
        dispatch.did_process(
            self,
            &ProcessEvent {
                carrier: &carrier,
                error: None,
                pass: None,
                skipped: true,
            },
        );
        carrier
    }

    /// Reports the delegate result to the visitors of `dispatch`, then tags a failure.
    fn settle(
        &self,
        dispatch: &Dispatch<'_>,
        result: Result<Carrier, BoxError>,
        payload: Carrier,
    ) -> Result<Carrier, TaggedError> {
        match result {
            Ok(carrier) => {
                dispatch.did_process(
                    self,
                    &ProcessEvent {
                        carrier: &carrier,
                        error: None,
                        pass: None,
                        skipped: false,
                    },
                );
                Ok(carrier)
            }
            Err(cause) => {
                dispatch.did_process(
                    self,
                    &ProcessEvent {
                        carrier: &payload,
                        error: Some(&*cause),
                        pass: None,
                        skipped: false,
                    },
                );
                Err(self.fail(cause, payload))
            }
        }
    }

    fn fail(&self, cause: BoxError, payload: Carrier) -> TaggedError {
        log::debug!("Unit '{}' ({}) failed: {}", self.name, self.model, cause);
        TaggedError::processing_failure(cause, payload)
    }

    fn mode_mismatch(&self, operation: &'static str) -> UnitError {
        UnitError::ModeMismatch {
            unit: self.name.clone(),
            mode: self.mode,
            operation,
        }
    }
}

/// Runs delegate code, turning a panic into an ordinary error.
fn guard<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|p| Err(Box::new(DelegatePanic::from_payload(p)) as BoxError))
}
