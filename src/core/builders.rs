//! Shortcuts that build a unit straight from a closure.
//!
//! Each shortcut wraps the closure in a small private delegate and runs it
//! through [`UnitFactory::create_unit`]; dispatch is exactly that of a
//! hand-written delegate.

use std::future::Future;

use async_trait::async_trait;

use crate::core::carrier::Carrier;
use crate::core::delegate::{DEFAULT_MODEL, Delegate};
use crate::core::error::BoxError;
use crate::core::factory::{UnitFactory, UnitOptions};
use crate::core::unit::Unit;

/// Settings for units built from closures.
#[derive(Debug, Clone, Default)]
pub struct FnConfig {
    /// Run the closure as a sync-process unit instead of an async one.
    pub sync: bool,
    /// Model name; defaults to [`DEFAULT_MODEL`].
    pub model: Option<String>,
    pub options: UnitOptions,
}

impl FnConfig {
    pub fn sync() -> Self {
        FnConfig {
            sync: true,
            ..FnConfig::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_options(mut self, options: UnitOptions) -> Self {
        self.options = options;
        self
    }

    fn model_name(&self) -> String {
        self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

struct FnDelegate<F> {
    f: F,
    sync: bool,
    model: String,
}

// Async units fall back to `process_sync` through the default `process`.
impl<F> Delegate for FnDelegate<F>
where
    F: Fn(&Unit, Carrier) -> Result<Carrier, BoxError> + Send + Sync + 'static,
{
    fn model(&self) -> String {
        self.model.clone()
    }

    fn is_sync(&self) -> bool {
        self.sync
    }

    fn process_sync(&self, unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
        (self.f)(unit, carrier)
    }
}

struct AsyncFnDelegate<F> {
    f: F,
    model: String,
}

#[async_trait]
impl<F, Fut> Delegate for AsyncFnDelegate<F>
where
    F: Fn(Carrier) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Carrier, BoxError>> + Send + 'static,
{
    fn model(&self) -> String {
        self.model.clone()
    }

    async fn process(&self, _unit: &Unit, carrier: Carrier) -> Result<Carrier, BoxError> {
        (self.f)(carrier).await
    }
}

struct PredicateDelegate<F> {
    f: F,
    model: String,
}

impl<F> Delegate for PredicateDelegate<F>
where
    F: Fn(&Unit, &Carrier) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    fn model(&self) -> String {
        self.model.clone()
    }

    fn is_sync(&self) -> bool {
        true
    }

    fn is_filter(&self) -> bool {
        true
    }

    fn filter(&self, unit: &Unit, carrier: &Carrier) -> Result<bool, BoxError> {
        (self.f)(unit, carrier)
    }
}

impl UnitFactory {
    /// Builds a process unit around `f`. `config.sync` picks the mode.
    pub fn from_fn<F>(&self, f: F, config: FnConfig) -> Unit
    where
        F: Fn(&Unit, Carrier) -> Result<Carrier, BoxError> + Send + Sync + 'static,
    {
        let delegate = FnDelegate {
            f,
            sync: config.sync,
            model: config.model_name(),
        };
        self.create_unit(delegate).instantiate(config.options)
    }

    /// Builds an async process unit around a future-returning `f`.
    /// `config.sync` is ignored.
    pub fn from_async_fn<F, Fut>(&self, f: F, config: FnConfig) -> Unit
    where
        F: Fn(Carrier) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Carrier, BoxError>> + Send + 'static,
    {
        let delegate = AsyncFnDelegate {
            f,
            model: config.model_name(),
        };
        self.create_unit(delegate).instantiate(config.options)
    }

    /// Builds a filter unit around the predicate `f`.
    pub fn from_predicate<F>(&self, f: F, config: FnConfig) -> Unit
    where
        F: Fn(&Unit, &Carrier) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        let delegate = PredicateDelegate {
            f,
            model: config.model_name(),
        };
        self.create_unit(delegate).instantiate(config.options)
    }
}
